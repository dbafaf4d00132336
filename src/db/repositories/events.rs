use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{from_unix_seconds, parse_event_type, retention_cutoff, to_u64},
    EventStore,
};
use crate::models::RawEvent;

fn row_to_event(row: &Row) -> Result<RawEvent> {
    let event_type: String = row.get("event_type")?;
    let ts_start: i64 = row.get("ts_start")?;

    Ok(RawEvent {
        event_type: parse_event_type(&event_type)?,
        url: row.get("url")?,
        title: row.get("title")?,
        app: row.get("app")?,
        status: row.get("status")?,
        duration_secs: row.get("duration")?,
        timestamp: from_unix_seconds(ts_start, "ts_start")?,
    })
}

impl EventStore {
    /// Insert events, skipping ones already stored with the same type, url,
    /// title, app and start second. Returns how many rows were new.
    pub fn insert_events(&self, events: &[RawEvent]) -> Result<usize> {
        let records = events.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0usize;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO events
                     (event_type, url, title, app, status, duration, ts_start, ts_end)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for event in &records {
                    let ts_start = event.timestamp.timestamp();
                    let ts_end = event.end().timestamp();
                    inserted += stmt.execute(params![
                        event.event_type.as_str(),
                        event.url,
                        event.title,
                        event.app,
                        event.status,
                        event.duration_secs,
                        ts_start,
                        ts_end,
                    ])?;
                }
            }
            tx.commit().context("failed to commit event insert")?;
            Ok(inserted)
        })
    }

    /// Events starting at or after `since`, chronological.
    pub fn read_events(&self, since: DateTime<Utc>) -> Result<Vec<RawEvent>> {
        let cutoff = since.timestamp();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT event_type, url, title, app, status, duration, ts_start
                 FROM events
                 WHERE ts_start >= ?1
                 ORDER BY ts_start ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![cutoff])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }
            Ok(events)
        })
    }

    pub fn read_recent(&self, days: i64) -> Result<Vec<RawEvent>> {
        self.read_events(retention_cutoff(days))
    }

    pub fn purge_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = retention_cutoff(days).timestamp();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM events WHERE ts_start < ?1", params![cutoff])
                .context("failed to purge old events")?;
            Ok(removed)
        })
    }

    pub fn count_events(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            to_u64(count, "count")
        })
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }
}
