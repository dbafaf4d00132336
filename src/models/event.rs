//! Raw activity event model.
//!
//! Events are produced by collectors (browser history, window/audio samplers,
//! AFK watcher) and are never mutated afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Web,
    Window,
    Audio,
    Afk,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Web => "web",
            EventType::Window => "window",
            EventType::Audio => "audio",
            EventType::Afk => "afk",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Some(EventType::Web),
            "window" => Some(EventType::Window),
            "audio" => Some(EventType::Audio),
            "afk" => Some(EventType::Afk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    pub event_type: EventType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "duration")]
    pub duration_secs: i64,
    pub timestamp: DateTime<Utc>,
}

impl RawEvent {
    pub fn new(event_type: EventType, timestamp: DateTime<Utc>, duration_secs: i64) -> Self {
        Self {
            event_type,
            url: String::new(),
            title: String::new(),
            app: String::new(),
            status: String::new(),
            duration_secs,
            timestamp,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Negative durations are treated as zero-length. Ends beyond the
    /// representable range clamp to `DateTime::<Utc>::MAX_UTC`.
    pub fn end(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.duration_secs.max(0))
            .and_then(|span| self.timestamp.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_afk(&self) -> bool {
        self.event_type == EventType::Afk && self.status.trim().eq_ignore_ascii_case("afk")
    }
}

/// Stable chronological sort; ties keep their original order.
pub fn sort_chronologically(events: &mut [RawEvent]) {
    events.sort_by_key(|event| event.timestamp);
}
