// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Extraction source: render the public listing page and read it through
//! selector-fallback chains.
//!
//! One browser is launched lazily and reused across entities and cycles.
//! Each entity gets its own tab, which is closed whether or not the visit
//! succeeds. If the browser cannot be launched, or a running browser stops
//! opening tabs, the session is marked failed and every call returns
//! "no data" until [`ReviewSource::reinitialize`] allows a fresh launch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use reviewtrack::{Entity, Snapshot, SourceKind};

use super::selectors::{extract_snapshot, DismissControl, SelectorConfig};
use super::ReviewSource;
use crate::config::ScrapeConfig;
use crate::renderer::{BrowserLauncher, RenderContext, Renderer};

const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place/";

/// Pause after a load-more click or scroll.
const LOAD_MORE_SETTLE_MS: u64 = 1500;

enum Session {
    Uninit,
    Ready(Box<dyn Renderer>),
    Failed,
}

pub struct ScrapeSource {
    launcher: Arc<dyn BrowserLauncher>,
    selectors: SelectorConfig,
    config: ScrapeConfig,
    session: Mutex<Session>,
}

impl ScrapeSource {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        selectors: SelectorConfig,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            launcher,
            selectors,
            config,
            session: Mutex::new(Session::Uninit),
        }
    }

    /// Visit one page in an already-open tab.
    async fn visit(
        &self,
        ctx: &mut Box<dyn RenderContext>,
        url: &str,
        entity: &Entity,
    ) -> Result<Snapshot> {
        let nav = ctx.navigate(url, self.config.nav_timeout_ms).await?;
        tracing::debug!(
            entity = %entity.id,
            final_url = %nav.final_url,
            load_ms = nav.load_time_ms,
            "page loaded"
        );

        self.dismiss_consent(&**ctx, entity).await;
        sleep_ms(self.config.settle_ms).await;
        self.load_more(&**ctx).await;

        let html = ctx.get_html().await?;
        Ok(extract_snapshot(&html, entity, &self.selectors, Utc::now()))
    }

    async fn dismiss_consent(&self, ctx: &dyn RenderContext, entity: &Entity) {
        let title = match ctx.execute_js("document.title").await {
            Ok(v) => v.as_str().unwrap_or_default().to_string(),
            Err(e) => {
                tracing::debug!(entity = %entity.id, "could not read page title: {e:#}");
                return;
            }
        };
        if !self.selectors.consent.is_consent_title(&title) {
            return;
        }

        tracing::info!(entity = %entity.id, "consent interstitial detected");
        for control in &self.selectors.consent.dismiss {
            if click(ctx, &dismiss_script(control)).await {
                tracing::debug!(entity = %entity.id, ?control, "consent dismissed");
                sleep_ms(self.config.settle_ms).await;
                return;
            }
        }
        tracing::warn!(entity = %entity.id, "no consent control matched, continuing");
    }

    /// Best effort: click a load-more control, else scroll the feed.
    async fn load_more(&self, ctx: &dyn RenderContext) {
        for selector in &self.selectors.load_more {
            if click(ctx, &css_click_script(selector)).await {
                sleep_ms(LOAD_MORE_SETTLE_MS).await;
                return;
            }
        }
        let _ = ctx
            .execute_js(&scroll_script(&self.selectors.scroll_containers))
            .await;
        sleep_ms(LOAD_MORE_SETTLE_MS).await;
    }
}

#[async_trait]
impl ReviewSource for ScrapeSource {
    async fn acquire(&self, entity: &Entity) -> Result<Option<Snapshot>> {
        let Some(url) = target_url(entity) else {
            tracing::warn!(entity = %entity.id, "no page_url or place_id configured, skipping");
            return Ok(None);
        };

        let mut session = self.session.lock().await;
        if matches!(*session, Session::Uninit) {
            *session = match self.launcher.launch().await {
                Ok(renderer) => {
                    tracing::info!("browser session started");
                    Session::Ready(renderer)
                }
                Err(e) => {
                    tracing::error!("browser launch failed: {e:#}");
                    Session::Failed
                }
            };
        }
        let Session::Ready(renderer) = &*session else {
            tracing::warn!(entity = %entity.id, "browser session unavailable, skipping");
            return Ok(None);
        };

        let mut ctx = match renderer.new_context().await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(entity = %entity.id, "browser stopped opening tabs: {e:#}");
                if let Session::Ready(dead) = std::mem::replace(&mut *session, Session::Failed) {
                    if let Err(e) = dead.shutdown().await {
                        tracing::debug!("shutting down dead browser failed: {e:#}");
                    }
                }
                return Ok(None);
            }
        };

        let outcome = self.visit(&mut ctx, &url, entity).await;
        if let Err(e) = ctx.close().await {
            tracing::debug!(entity = %entity.id, "closing tab failed: {e:#}");
        }
        tracing::debug!(
            entity = %entity.id,
            open_tabs = renderer.active_contexts(),
            "tab closed"
        );

        match outcome {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(entity = %entity.id, url = %url, "page extraction failed: {e:#}");
                Ok(None)
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Extraction
    }

    async fn reinitialize(&self) {
        let mut session = self.session.lock().await;
        if matches!(*session, Session::Failed) {
            tracing::info!("resetting failed browser session");
            *session = Session::Uninit;
        }
    }

    async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if let Session::Ready(renderer) = std::mem::replace(&mut *session, Session::Uninit) {
            if let Err(e) = renderer.shutdown().await {
                tracing::warn!("browser shutdown failed: {e:#}");
            }
        }
    }
}

/// Page to render for an entity: explicit URL first, then one derived from
/// the place id.
pub fn target_url(entity: &Entity) -> Option<String> {
    if let Some(page) = entity.page_locator() {
        return Some(page.to_string());
    }
    let place_id = entity.place_locator()?;
    let encoded: String = url::form_urlencoded::byte_serialize(place_id.as_bytes()).collect();
    Some(format!("{MAPS_PLACE_URL}?q=place_id:{encoded}"))
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Run a click script; true only when it reports a click.
async fn click(ctx: &dyn RenderContext, script: &str) -> bool {
    matches!(ctx.execute_js(script).await, Ok(serde_json::Value::Bool(true)))
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn css_click_script(selector: &str) -> String {
    format!(
        "(() => {{ let el = null; try {{ el = document.querySelector({}); }} catch (e) {{ return false; }} \
         if (!el) return false; el.click(); return true; }})()",
        js_string(selector)
    )
}

fn dismiss_script(control: &DismissControl) -> String {
    match control {
        DismissControl::Css { selector } => css_click_script(selector),
        DismissControl::ButtonText { text } => format!(
            "(() => {{ const want = {}.toLowerCase(); \
             for (const b of document.querySelectorAll('button, [role=\"button\"], input[type=\"submit\"]')) {{ \
             const t = (b.innerText || b.value || '').trim().toLowerCase(); \
             if (t.includes(want)) {{ b.click(); return true; }} }} return false; }})()",
            js_string(text)
        ),
    }
}

fn scroll_script(containers: &[String]) -> String {
    let list = serde_json::Value::from(containers.to_vec()).to_string();
    format!(
        "(() => {{ for (const s of {list}) {{ let el = null; try {{ el = document.querySelector(s); }} catch (e) {{}} \
         if (el) {{ el.scrollTop = el.scrollHeight; }} }} \
         window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return true; }})()"
    )
}
