// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for reviewtrack.
//!
//! A thin surface over the [`Monitor`]: trigger a check, read status,
//! manage the entity registry and inspect stored baselines.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use reviewtrack::{Entity, Snapshot, TrackError};

use crate::config::SourceMode;
use crate::monitor::{CycleError, Monitor};

/// State shared by every handler.
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub mode: SourceMode,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, mode: SourceMode) -> Self {
        Self {
            monitor,
            mode,
            started_at: Instant::now(),
        }
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/check", post(handle_check))
        .route("/api/v1/entities", get(handle_list_entities).post(handle_upsert_entity))
        .route("/api/v1/baselines", get(handle_list_baselines))
        .route("/api/v1/baselines/:id", get(handle_get_baseline))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on localhost until the listener fails.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn error(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({ "success": false, "message": message.to_string() })),
    )
        .into_response()
}

fn storage_error(e: TrackError) -> Response {
    match e {
        TrackError::NotFound(_) => error(StatusCode::NOT_FOUND, e),
        TrackError::InvalidEntity(_) => error(StatusCode::BAD_REQUEST, e),
        _ => {
            tracing::warn!("storage error in REST handler: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.monitor.status();
    let (entities, active) = state
        .monitor
        .registry()
        .list_entities()
        .map(|list| {
            let active = list.iter().filter(|e| e.active).count();
            (list.len(), active)
        })
        .unwrap_or((0, 0));

    Json(json!({
        "running": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "mode": state.mode.as_str(),
        "entities": entities,
        "active_entities": active,
        "scheduler": status,
    }))
}

async fn handle_check(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.run_now().await {
        Ok(report) => Json(json!({
            "success": true,
            "message": report.message,
            "changes": report.changes,
        }))
        .into_response(),
        Err(e @ CycleError::AlreadyRunning) => error(StatusCode::CONFLICT, e),
        Err(e @ CycleError::Failed(_)) => error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn handle_list_entities(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.registry().list_entities() {
        Ok(entities) => Json(json!({ "entities": entities })).into_response(),
        Err(e) => storage_error(e),
    }
}

async fn handle_upsert_entity(
    State(state): State<Arc<AppState>>,
    Json(entity): Json<Entity>,
) -> Response {
    let id = entity.id.clone();
    match state.monitor.registry().upsert(entity) {
        Ok(()) => {
            tracing::info!(entity = %id, "entity saved via REST");
            Json(json!({ "success": true, "id": id })).into_response()
        }
        Err(e) => storage_error(e),
    }
}

async fn handle_list_baselines(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.detector().store().list_all() {
        Ok(baselines) => {
            let baselines: Vec<Snapshot> =
                baselines.into_iter().map(Snapshot::into_newest_first).collect();
            Json(json!({ "baselines": baselines })).into_response()
        }
        Err(e) => storage_error(e),
    }
}

async fn handle_get_baseline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.monitor.detector().store().get(&id) {
        Ok(Some(snapshot)) => Json(snapshot.into_newest_first()).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("no baseline for {id}")),
        Err(e) => storage_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::tests::{monitor_with, CollectingSink, SteppingSource};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use reviewtrack::Review;
    use tower::ServiceExt;

    fn review(id: &str, secs: i64) -> Review {
        Review {
            id: id.to_string(),
            author: id.to_string(),
            rating: 4,
            text: None,
            published_at: chrono::Utc.timestamp_opt(secs, 0).unwrap(),
            author_url: None,
            photo_url: None,
        }
    }

    fn app() -> (Router, Arc<Monitor>) {
        let monitor = monitor_with(
            Arc::new(SteppingSource::new()),
            Arc::new(CollectingSink::default()),
        );
        let state = Arc::new(AppState::new(monitor.clone(), SourceMode::Api));
        (router(state), monitor)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_check_then_status_and_baselines() {
        let (app, monitor) = app();

        let (status, body) = call(&app, "POST", "/api/v1/check", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["changes"].as_array().unwrap().len(), 0);

        let (_, body) = call(&app, "POST", "/api/v1/check", None).await;
        assert_eq!(body["changes"].as_array().unwrap().len(), 2);
        assert_eq!(body["changes"][0]["kind"], "rating_only");

        let (_, status_body) = call(&app, "GET", "/api/v1/status", None).await;
        assert_eq!(status_body["mode"], "api");
        assert_eq!(status_body["entities"], 2);
        assert_eq!(status_body["scheduler"]["state"], "idle");
        assert_eq!(status_body["scheduler"]["cycles_completed"], 2);

        // Stored in page order, served newest first.
        let mut stored = monitor.detector().store().get("a").unwrap().unwrap();
        stored.reviews = vec![review("older", 1_700_000_000), review("newer", 1_700_500_000)];
        monitor.detector().store().put(&stored).unwrap();

        let (_, list) = call(&app, "GET", "/api/v1/baselines", None).await;
        assert_eq!(list["baselines"].as_array().unwrap().len(), 2);
        assert_eq!(list["baselines"][0]["reviews"][0]["id"], "newer");

        let (status, one) = call(&app, "GET", "/api/v1/baselines/a", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["entity_id"], "a");
        assert_eq!(one["reviews"][0]["id"], "newer");
        assert_eq!(one["reviews"][1]["id"], "older");

        let (status, _) = call(&app, "GET", "/api/v1/baselines/zzz", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_entity_upsert_and_validation() {
        let (app, _) = app();
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/entities",
            Some(json!({"id": "c", "name": "C", "place_id": "ChIJc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/api/v1/entities", None).await;
        let ids: Vec<_> = body["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect();
        assert!(ids.contains(&"c".to_string()));

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/entities",
            Some(json!({"id": "../etc", "name": "bad"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
