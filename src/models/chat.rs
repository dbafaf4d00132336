use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversational session, already compressed by the ingestion adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub domain: String,
    #[serde(default, alias = "session_id")]
    pub source_id: String,
    #[serde(default)]
    pub compressed_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}
