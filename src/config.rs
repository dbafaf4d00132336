use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::analysis::baseline::{DEFAULT_BASELINE_LIMIT, DEFAULT_CHAT_TOKEN_WEIGHT};
use crate::analysis::AuditOptions;
use crate::chat::ChatCompression;
use crate::cleaner::AiDomainRule;
use crate::report::ReportLimits;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorSettings {
    /// Look-back window when reading from the event store
    pub days: i64,
    pub db_path: PathBuf,
    /// Offline JSON export; used instead of the store when set
    pub events_file: Option<PathBuf>,
    pub chat_sessions_file: Option<PathBuf>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            days: 7,
            db_path: PathBuf::from("data/events.db"),
            events_file: None,
            chat_sessions_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokenWeights {
    pub chat_sessions: f64,
}

impl Default for TokenWeights {
    fn default() -> Self {
        Self {
            chat_sessions: DEFAULT_CHAT_TOKEN_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub baseline_limit: usize,
    pub token_weights: TokenWeights,
    /// Oracle runs per analysis; more than one enables consistency scoring
    pub self_consistency_runs: usize,
    pub min_keywords: usize,
    pub max_keywords: usize,
    /// Recorded oracle response replayed by the file oracle
    pub oracle_file: Option<PathBuf>,
    /// Chat-derived keyword payload merged into the result
    pub chat_keywords_file: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            baseline_limit: DEFAULT_BASELINE_LIMIT,
            token_weights: TokenWeights::default(),
            self_consistency_runs: 1,
            min_keywords: 5,
            max_keywords: 20,
            oracle_file: None,
            chat_keywords_file: None,
        }
    }
}

impl AnalysisSettings {
    pub fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            baseline_limit: self.baseline_limit,
            chat_token_weight: self.token_weights.chat_sessions,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeSettings {
    pub chatbot_pool_seconds: i64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            chatbot_pool_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub report_file: PathBuf,
    pub review_dir: PathBuf,
    pub skills_limit: usize,
    pub tools_limit: usize,
    pub min_report_weight: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            report_file: PathBuf::from("output/report.json"),
            review_dir: PathBuf::from("output/review"),
            skills_limit: 10,
            tools_limit: 10,
            min_report_weight: 0.05,
        }
    }
}

impl OutputSettings {
    pub fn report_limits(&self) -> ReportLimits {
        ReportLimits {
            skills: self.skills_limit,
            tools: self.tools_limit,
            min_weight: self.min_report_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PushSettings {
    pub push_on_llm_fallback: bool,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            push_on_llm_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub collector: CollectorSettings,
    pub cleaner: AiDomainRule,
    pub analysis: AnalysisSettings,
    pub chat: ChatCompression,
    pub segmentation: SegmentationConfig,
    pub merge: MergeSettings,
    pub output: OutputSettings,
    pub push: PushSettings,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl AppConfig {
    /// Missing file gives defaults; an unreadable or invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<AppConfig>(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            AppConfig::default()
        };
        config.base_dir = base_dir;
        Ok(config)
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.chat, ChatCompression::default());
        assert_eq!(config.resolve_path(Path::new("x.db")), dir.path().join("x.db"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"chat": {"max_chars": 1200}, "analysis": {"token_weights": {"chat_sessions": 1.5}}}"#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.chat.max_chars, 1200);
        assert_eq!(config.chat.max_lines, 220);
        assert_eq!(config.analysis.audit_options().chat_token_weight, 1.5);
        assert_eq!(config.segmentation.min_slice_lines, 20);
        assert!(!config.push.push_on_llm_fallback);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn persisted_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.merge.chatbot_pool_seconds = 600;
        config.persist(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().merge.chatbot_pool_seconds, 600);
    }
}
