//! Chat-text utilities shared by ingestion adapters and the analysis pipeline.

pub mod compress;
pub mod merge;
pub mod sanitize;

pub use compress::{compress_chat_text, ChatCompression};
pub use merge::{merge_keyword_payloads, normalize_keyword_name};
pub use sanitize::redact_sensitive;

use crate::models::ChatSession;

/// Redact, then compress, one raw conversation into a session record.
pub fn build_session(
    domain: &str,
    source_id: &str,
    raw_text: &str,
    options: &ChatCompression,
) -> ChatSession {
    let redacted = redact_sensitive(raw_text);
    ChatSession {
        domain: domain.trim().to_string(),
        source_id: source_id.to_string(),
        compressed_text: compress_chat_text(&redacted, options),
        start: None,
        end: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_text_is_redacted_before_compression() {
        let raw = "my key is sk-abcdefghijklmnopqrstuvwxyz and pip install failed";
        let session = build_session(" chatgpt.com ", "export.json", raw, &ChatCompression::default());
        assert_eq!(session.domain, "chatgpt.com");
        assert!(session.compressed_text.starts_with("KEY LINES:"));
        assert!(session.compressed_text.contains("sk-[REDACTED]"));
        assert!(!session.compressed_text.contains("abcdefghij"));
    }
}
