//! Keyword oracle boundary. The audit core never calls an oracle itself;
//! the pipeline asks one for candidates and hands the result over.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::baseline::{ranked_tokens, DEFAULT_CHAT_TOKEN_WEIGHT};
use crate::models::{CompressedSnapshot, Keyword, KeywordPayload};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// How a keyword payload was produced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleRun {
    pub used_llm: bool,
    pub fallback_used: bool,
}

impl OracleRun {
    pub fn llm() -> Self {
        Self {
            used_llm: true,
            fallback_used: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            used_llm: false,
            fallback_used: true,
        }
    }
}

pub trait KeywordOracle {
    /// Propose between `min_k` and `max_k` candidates for `snapshot`.
    fn extract_keywords(
        &self,
        snapshot: &CompressedSnapshot,
        min_k: usize,
        max_k: usize,
    ) -> Result<KeywordPayload>;

    /// Metadata recorded for a successful call.
    fn run_meta(&self) -> OracleRun {
        OracleRun::llm()
    }
}

/// Replays a recorded oracle response from disk.
#[derive(Debug, Clone)]
pub struct FileOracle {
    path: PathBuf,
}

impl FileOracle {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl KeywordOracle for FileOracle {
    fn extract_keywords(
        &self,
        _snapshot: &CompressedSnapshot,
        min_k: usize,
        max_k: usize,
    ) -> Result<KeywordPayload> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read oracle response {}", self.path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse oracle response {}", self.path.display()))?;
        let payload = clamp_payload(KeywordPayload::from_value(value)?, max_k);

        let count = payload.keyword_count();
        if count < min_k {
            bail!("oracle returned {count} keywords, fewer than the {min_k} requested");
        }
        log_info!(
            "Oracle response {} supplied {count} keywords",
            self.path.display()
        );
        Ok(payload)
    }
}

/// Flat lists are ranked by weight and cut to `max_k`; structured payloads
/// are left as the oracle grouped them.
fn clamp_payload(payload: KeywordPayload, max_k: usize) -> KeywordPayload {
    match payload {
        KeywordPayload::Flat(mut items) => {
            items.sort_by(|a, b| b.weight_or_zero().total_cmp(&a.weight_or_zero()));
            items.truncate(max_k);
            KeywordPayload::Flat(items)
        }
        structured => structured,
    }
}

/// Deterministic rule-based stand-in used when the oracle fails.
#[derive(Debug, Clone, Copy)]
pub struct BaselineOracle {
    chat_weight: f64,
}

impl Default for BaselineOracle {
    fn default() -> Self {
        Self {
            chat_weight: DEFAULT_CHAT_TOKEN_WEIGHT,
        }
    }
}

impl BaselineOracle {
    pub fn new(chat_weight: f64) -> Self {
        Self { chat_weight }
    }

    /// Top `max_k` tokens, weighted relative to the strongest one.
    pub fn keywords(&self, snapshot: &CompressedSnapshot, max_k: usize) -> Vec<Keyword> {
        let ranked = ranked_tokens(snapshot, max_k, self.chat_weight);
        let top = ranked.first().map(|(_, w)| *w).unwrap_or(0.0);
        ranked
            .into_iter()
            .map(|(name, weight)| {
                let relative = if top > 0.0 { weight / top } else { 0.5 };
                Keyword::named(name).with_weight(relative)
            })
            .collect()
    }
}

impl KeywordOracle for BaselineOracle {
    fn extract_keywords(
        &self,
        snapshot: &CompressedSnapshot,
        min_k: usize,
        max_k: usize,
    ) -> Result<KeywordPayload> {
        let keywords = self.keywords(snapshot, max_k);
        if keywords.len() < min_k {
            log_warn!(
                "Baseline produced {} keywords, below the requested minimum of {min_k}",
                keywords.len()
            );
        }
        Ok(KeywordPayload::Flat(keywords))
    }

    fn run_meta(&self) -> OracleRun {
        OracleRun::fallback()
    }
}
