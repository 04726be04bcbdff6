// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI handlers for the entity registry.

use anyhow::Result;

use reviewtrack::{Entity, EntityRegistry};

use crate::cli::output;

pub fn run_list() -> Result<()> {
    let config = super::load_local_config()?;
    let entities = super::open_registry(&config).list_entities()?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "entities": entities }));
        return Ok(());
    }
    if entities.is_empty() {
        println!("  No entities configured. Add one with 'reviewtrack entities add'.");
        return Ok(());
    }
    for e in &entities {
        let state = if e.active { "active" } else { "paused" };
        let locator = e
            .place_locator()
            .map(|p| format!("place_id={p}"))
            .or_else(|| e.page_locator().map(|u| format!("url={u}")))
            .unwrap_or_else(|| "no locator".to_string());
        println!("  {:<20} {:<7} {:<30} {}", e.id, state, e.name, locator);
    }
    Ok(())
}

pub fn run_add(
    id: &str,
    name: &str,
    place_id: Option<&str>,
    page_url: Option<&str>,
) -> Result<()> {
    let config = super::load_local_config()?;
    let mut entity = Entity::new(id, name);
    entity.place_id = place_id.map(str::to_string);
    entity.page_url = page_url.map(str::to_string);
    if entity.place_locator().is_none() && entity.page_locator().is_none() {
        tracing::warn!(entity = %id, "entity has no locator and will be skipped by checks");
    }

    super::open_registry(&config).upsert(entity)?;
    if !output::is_quiet() {
        println!("  Saved entity '{id}'.");
    }
    Ok(())
}

pub fn run_set_active(id: &str, active: bool) -> Result<()> {
    let config = super::load_local_config()?;
    super::open_registry(&config).set_active(id, active)?;
    if !output::is_quiet() {
        let verb = if active { "Enabled" } else { "Disabled" };
        println!("  {verb} entity '{id}'.");
    }
    Ok(())
}
