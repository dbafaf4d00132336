//! Compressed activity snapshot: the evidence corpus every candidate keyword
//! is checked against. Built fresh per analysis run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::chat::ChatSession;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnapshotMeta {
    pub total_seconds: i64,
    pub afk_seconds: i64,
    pub afk_ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DomainStats {
    pub event_count: u64,
    /// Additive per domain; overlapping events on one domain are counted twice.
    pub active_seconds: i64,
    /// Up to three unique cleaned titles, first-seen order.
    #[serde(default)]
    pub title_samples: Vec<String>,
    #[serde(default)]
    pub title_freq: BTreeMap<String, u64>,
}

impl DomainStats {
    pub fn total_title_count(&self) -> u64 {
        self.title_freq.values().sum()
    }
}

/// App-grouped window activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WindowSample {
    pub app: String,
    pub duration: i64,
    #[serde(default)]
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AudioSample {
    pub app: String,
    pub title: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NonWebSamples {
    #[serde(default)]
    pub window: Vec<WindowSample>,
    #[serde(default)]
    pub audio: Vec<AudioSample>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompressedSnapshot {
    #[serde(default)]
    pub meta: SnapshotMeta,
    #[serde(default)]
    pub web: BTreeMap<String, DomainStats>,
    #[serde(default)]
    pub non_web_samples: NonWebSamples,
    /// Chat excerpts attached by ingestion adapters; weighted separately by
    /// the baseline extractor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat_sessions: Vec<ChatSession>,
}

impl CompressedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.web.is_empty()
            && self.non_web_samples.window.is_empty()
            && self.non_web_samples.audio.is_empty()
            && self.chat_sessions.is_empty()
    }

    pub fn with_chat_sessions(mut self, sessions: Vec<ChatSession>) -> Self {
        self.chat_sessions = sessions;
        self
    }
}
