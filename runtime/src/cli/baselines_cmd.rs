// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI handlers for stored baselines and snapshot history.

use anyhow::Result;

use reviewtrack::{BaselineStore, Snapshot};

use crate::cli::output;

pub fn run_show(id: Option<&str>) -> Result<()> {
    let config = super::load_local_config()?;
    let store = super::open_store(&config)?;

    let Some(id) = id else {
        let all: Vec<Snapshot> = store
            .list_all()?
            .into_iter()
            .map(Snapshot::into_newest_first)
            .collect();
        if output::is_json() {
            output::print_json(&serde_json::json!({ "baselines": all }));
        } else if all.is_empty() {
            println!("  No baselines yet. Run 'reviewtrack check' first.");
        } else {
            for snap in &all {
                print_summary(snap);
            }
        }
        return Ok(());
    };

    let Some(snap) = store.get(id)? else {
        anyhow::bail!("no baseline for '{id}'");
    };
    let snap = snap.into_newest_first();
    if output::is_json() {
        output::print_json(&serde_json::to_value(&snap)?);
        return Ok(());
    }
    print_summary(&snap);
    for review in &snap.reviews {
        println!(
            "      {}  {}/5  {}",
            review.published_at.format("%Y-%m-%d"),
            review.rating,
            if review.author.is_empty() {
                "Anonymous"
            } else {
                review.author.as_str()
            }
        );
    }
    Ok(())
}

pub fn run_history(id: &str, limit: usize) -> Result<()> {
    let config = super::load_local_config()?;
    let history: Vec<Snapshot> = super::open_store(&config)?
        .history(id, limit)?
        .into_iter()
        .map(Snapshot::into_newest_first)
        .collect();

    if output::is_json() {
        output::print_json(&serde_json::json!({ "entity_id": id, "history": history }));
    } else if history.is_empty() {
        println!("  No history for '{id}'.");
    } else {
        println!("  History for {id} (newest first):\n");
        for snap in &history {
            println!(
                "    {}  {:.1} {}  {} reviews  via {}",
                snap.observed_at.format("%Y-%m-%d %H:%M"),
                snap.rating,
                output::rating_bar(snap.rating),
                snap.review_count,
                snap.source
            );
        }
    }
    Ok(())
}

fn print_summary(snap: &Snapshot) {
    println!(
        "  {:<20} {:.1} {}  {:>6} reviews  {}  ({})",
        snap.entity_id,
        snap.rating,
        output::rating_bar(snap.rating),
        snap.review_count,
        snap.name,
        snap.observed_at.format("%Y-%m-%d %H:%M")
    );
}
