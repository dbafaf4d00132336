//! JSON file inputs: exported event lists and pre-compressed chat sessions,
//! plus ingesting an export into the event store.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db::helpers::retention_cutoff;
use crate::db::EventStore;
use crate::models::{sort_chronologically, ChatSession, RawEvent};

/// Store meta key holding the RFC 3339 time of the last ingest.
pub const LAST_COLLECT_KEY: &str = "last_collect";

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Accepts a bare array or an object holding the array under `key`.
fn lenient_list<T: DeserializeOwned>(value: Value, key: &str, path: &Path) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => bail!("{} has no `{key}` array", path.display()),
        },
        _ => bail!("{} must hold a JSON array", path.display()),
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("skipping {key}[{idx}] in {}: {err}", path.display());
                None
            }
        })
        .collect();
    if parsed.len() < total {
        warn!(
            "loaded {} of {total} {key} from {}",
            parsed.len(),
            path.display()
        );
    }
    Ok(parsed)
}

/// Load events from a JSON export, sorted chronologically.
pub fn load_events_file(path: &Path) -> Result<Vec<RawEvent>> {
    let mut events: Vec<RawEvent> = lenient_list(read_json(path)?, "events", path)?;
    sort_chronologically(&mut events);
    Ok(events)
}

pub fn load_chat_sessions_file(path: &Path) -> Result<Vec<ChatSession>> {
    lenient_list(read_json(path)?, "chat_sessions", path)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub purged: usize,
    /// Events in the export that fall inside the retention window
    pub loaded: usize,
    pub inserted: usize,
}

/// Purge rows older than `retention_days`, insert the export's events from
/// inside that window and stamp `last_collect`.
pub fn ingest_events_file(
    store: &EventStore,
    path: &Path,
    retention_days: i64,
) -> Result<IngestSummary> {
    let purged = store.purge_older_than(retention_days)?;
    if purged > 0 {
        info!("Purged {purged} events older than {retention_days} days");
    }

    let cutoff = retention_cutoff(retention_days);
    let events: Vec<RawEvent> = load_events_file(path)?
        .into_iter()
        .filter(|event| event.timestamp >= cutoff)
        .collect();
    let inserted = store.insert_events(&events)?;
    store.set_meta(LAST_COLLECT_KEY, &Utc::now().to_rfc3339())?;
    info!(
        "Ingested {inserted} new of {} events from {}",
        events.len(),
        path.display()
    );

    Ok(IngestSummary {
        purged,
        loaded: events.len(),
        inserted,
    })
}
