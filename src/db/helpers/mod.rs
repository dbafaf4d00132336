use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};

use crate::models::EventType;

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn from_unix_seconds(value: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value, 0)
        .ok_or_else(|| anyhow!("{field} holds out-of-range timestamp {value}"))
}

/// Start of the last `days` days; saturates at the earliest timestamp.
pub fn retention_cutoff(days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn parse_event_type(value: &str) -> Result<EventType> {
    EventType::parse(value).ok_or_else(|| anyhow!("unknown event type {value}"))
}
