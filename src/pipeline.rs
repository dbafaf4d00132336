//! Run-once analysis: events in, audited keyword report out.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::Auditor;
use crate::chat::merge_keyword_payloads;
use crate::cleaner::EventCompressor;
use crate::config::AppConfig;
use crate::db::import::load_chat_sessions_file;
use crate::db::{load_events_file, EventStore};
use crate::models::{ChatSession, CompressedSnapshot, KeywordPayload, RawEvent};
use crate::oracle::{BaselineOracle, KeywordOracle, OracleRun};
use crate::report::{push_decision, render_text_report_at, PushDecision};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const SHORT_WINDOW_MAX_KEYWORDS: usize = 5;
const LONG_WINDOW_MAX_KEYWORDS: usize = 10;
const CHAT_META_KEY: &str = "llm_meta";

/// Everything one analysis run produced; written to `output.report_file`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub days: i64,
    pub event_count: usize,
    pub keywords: KeywordPayload,
    pub llm_meta: OracleRun,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_meta: Option<OracleRun>,
    pub snapshot: CompressedSnapshot,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub push: PushDecision,
    pub text_report: String,
    pub report_path: PathBuf,
}

/// Inputs gathered from the configured sources.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    pub events: Vec<RawEvent>,
    pub chat_sessions: Vec<ChatSession>,
    /// Chat-derived keywords to merge into the oracle result
    pub chat_keywords: Option<KeywordPayload>,
    /// How the chat keywords were produced, when their file records it
    pub chat_meta: Option<OracleRun>,
}

/// One-day windows ask for fewer keywords than longer ones.
pub fn keyword_budget(days: i64, config: &AppConfig) -> (usize, usize) {
    let window_max = if days <= 1 {
        SHORT_WINDOW_MAX_KEYWORDS
    } else {
        LONG_WINDOW_MAX_KEYWORDS
    };
    let max_k = window_max.min(config.analysis.max_keywords).max(1);
    (config.analysis.min_keywords.min(max_k), max_k)
}

/// JSON export if configured, else the last `days` days from the store.
pub fn load_events(config: &AppConfig, days: i64) -> Result<Vec<RawEvent>> {
    match &config.collector.events_file {
        Some(path) => {
            let path = config.resolve_path(path);
            log_info!("Loading events from {}", path.display());
            load_events_file(&path)
        }
        None => {
            let db_path = config.resolve_path(&config.collector.db_path);
            log_info!("Loading last {days} days of events from {}", db_path.display());
            EventStore::open(db_path)?.read_recent(days)
        }
    }
}

/// Events plus the optional chat sessions and chat keyword payload.
pub fn load_inputs(config: &AppConfig, days: i64) -> Result<AnalysisInputs> {
    let events = load_events(config, days)?;

    let chat_sessions = match &config.collector.chat_sessions_file {
        Some(path) => load_chat_sessions_file(&config.resolve_path(path))?,
        None => Vec::new(),
    };

    let (chat_keywords, chat_meta) = match &config.analysis.chat_keywords_file {
        Some(path) => {
            let (payload, meta) = read_chat_keywords(&config.resolve_path(path))?;
            (Some(payload), meta)
        }
        None => (None, None),
    };

    Ok(AnalysisInputs {
        events,
        chat_sessions,
        chat_keywords,
        chat_meta,
    })
}

/// A chat keyword payload plus its optional `llm_meta` object.
pub fn read_chat_keywords(path: &Path) -> Result<(KeywordPayload, Option<OracleRun>)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read keyword payload {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse keyword payload {}", path.display()))?;
    let meta = match value.get(CHAT_META_KEY) {
        Some(meta) => Some(
            serde_json::from_value::<OracleRun>(meta.clone())
                .with_context(|| format!("invalid {CHAT_META_KEY} in {}", path.display()))?,
        ),
        None => None,
    };
    Ok((KeywordPayload::from_value(value)?, meta))
}

/// Ask the oracle `runs` times. The last run is the primary payload; every
/// run's names feed consistency scoring.
fn collect_candidates(
    oracle: &dyn KeywordOracle,
    snapshot: &CompressedSnapshot,
    runs: usize,
    min_k: usize,
    max_k: usize,
) -> Result<(KeywordPayload, Vec<Vec<String>>)> {
    let mut names = Vec::with_capacity(runs);
    let mut primary = KeywordPayload::default();
    for run in 0..runs.max(1) {
        let payload = oracle
            .extract_keywords(snapshot, min_k, max_k)
            .with_context(|| format!("oracle run {} failed", run + 1))?;
        names.push(payload.names());
        primary = payload;
    }
    Ok((primary, names))
}

/// Compress, query, audit and merge. Performs no I/O apart from the oracle.
pub fn analyze(
    inputs: AnalysisInputs,
    config: &AppConfig,
    oracle: &dyn KeywordOracle,
    days: i64,
) -> AnalysisReport {
    let (min_k, max_k) = keyword_budget(days, config);
    let compressor = EventCompressor::new(config.cleaner.clone());
    let snapshot = compressor
        .compress(&inputs.events)
        .with_chat_sessions(inputs.chat_sessions);
    log_info!(
        "Compressed {} events into {} web domains",
        inputs.events.len(),
        snapshot.web.len()
    );

    let runs = config.analysis.self_consistency_runs.max(1);
    let (candidates, run_names, llm_meta) =
        match collect_candidates(oracle, &snapshot, runs, min_k, max_k) {
            Ok((payload, names)) => (payload, names, oracle.run_meta()),
            Err(err) => {
                log_warn!("Keyword oracle failed, using baseline fallback: {err:#}");
                let fallback = BaselineOracle::new(config.analysis.token_weights.chat_sessions);
                let keywords = fallback.keywords(&snapshot, max_k);
                (KeywordPayload::Flat(keywords), Vec::new(), fallback.run_meta())
            }
        };

    let auditor = Auditor::new(config.analysis.audit_options());
    let consistency_runs = (run_names.len() > 1).then_some(run_names.as_slice());
    let mut keywords = auditor.annotate(&candidates, &snapshot, consistency_runs);

    let mut chat_meta = None;
    if let Some(chat_keywords) = inputs.chat_keywords.filter(|p| !p.is_empty()) {
        let merged = merge_keyword_payloads(
            &keywords,
            &chat_keywords,
            snapshot.meta.total_seconds,
            config.merge.chatbot_pool_seconds,
        );
        keywords = KeywordPayload::Structured(merged);
        chat_meta = inputs.chat_meta;
    }
    log_info!("Analysis produced {} keywords", keywords.keyword_count());

    AnalysisReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        days,
        event_count: inputs.events.len(),
        keywords,
        llm_meta,
        chat_meta,
        snapshot,
    }
}

pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let serialized = serde_json::to_string_pretty(report)?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

/// Full run: load, analyze, write the JSON report, decide on pushing.
pub fn run_analysis(
    config: &AppConfig,
    oracle: &dyn KeywordOracle,
    days: i64,
) -> Result<AnalysisOutcome> {
    let inputs = load_inputs(config, days)?;
    if inputs.events.is_empty() {
        log_warn!("No events found; the report will carry no evidence");
    }
    let report = analyze(inputs, config, oracle, days);

    let report_path = config.resolve_path(&config.output.report_file);
    write_report(&report, &report_path)?;
    log_info!("Report written to {}", report_path.display());

    let push = push_decision(
        report.keywords.keyword_count(),
        Some(report.llm_meta),
        report.chat_meta,
        config.push.push_on_llm_fallback,
    );
    let suffix = format!(" (Past {days} Days){}", push.title_suffix);
    let text_report = render_text_report_at(
        &report.keywords,
        &suffix,
        &config.output.report_limits(),
        Local::now(),
    );
    if !push.should_push {
        log_warn!("Push skipped: {}", push.reason);
    }

    Ok(AnalysisOutcome {
        report,
        push,
        text_report,
        report_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::TimeZone;

    use crate::models::{EventType, Keyword, Level, StructuredKeywords};

    struct FailingOracle;

    impl KeywordOracle for FailingOracle {
        fn extract_keywords(
            &self,
            _snapshot: &CompressedSnapshot,
            _min_k: usize,
            _max_k: usize,
        ) -> Result<KeywordPayload> {
            bail!("connection refused")
        }
    }

    struct FixedOracle(Vec<&'static str>);

    impl KeywordOracle for FixedOracle {
        fn extract_keywords(
            &self,
            _snapshot: &CompressedSnapshot,
            _min_k: usize,
            _max_k: usize,
        ) -> Result<KeywordPayload> {
            Ok(KeywordPayload::Flat(
                self.0.iter().map(|name| Keyword::named(*name).with_weight(0.8)).collect(),
            ))
        }
    }

    struct SkillsOracle(Vec<&'static str>);

    impl KeywordOracle for SkillsOracle {
        fn extract_keywords(
            &self,
            _snapshot: &CompressedSnapshot,
            _min_k: usize,
            _max_k: usize,
        ) -> Result<KeywordPayload> {
            Ok(KeywordPayload::Structured(StructuredKeywords::new(
                self.0.iter().map(|name| Keyword::named(*name).with_weight(0.8)).collect(),
                Vec::new(),
            )))
        }
    }

    fn events() -> Vec<RawEvent> {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        (0..4)
            .map(|i| {
                RawEvent::new(EventType::Web, start + chrono::Duration::minutes(i * 5), 300)
                    .with_url("https://docs.python.org/3/library/asyncio.html")
                    .with_title("asyncio Python docs")
            })
            .collect()
    }

    #[test]
    fn oracle_failure_falls_back_to_baseline() {
        let inputs = AnalysisInputs {
            events: events(),
            ..AnalysisInputs::default()
        };
        let report = analyze(inputs, &AppConfig::default(), &FailingOracle, 7);
        assert_eq!(report.llm_meta, OracleRun::fallback());
        assert!(report.keywords.names().contains(&"python".to_string()));
        let items = report.keywords.flatten();
        assert!(items.iter().all(|k| k.level.is_some()));
    }

    #[test]
    fn oracle_candidates_are_audited() {
        let inputs = AnalysisInputs {
            events: events(),
            ..AnalysisInputs::default()
        };
        let report = analyze(inputs, &AppConfig::default(), &FixedOracle(vec!["Python", "Kubernetes"]), 7);
        assert_eq!(report.llm_meta, OracleRun::llm());
        let items = report.keywords.flatten();
        let kube = items.iter().find(|k| k.name == "Kubernetes").unwrap();
        assert_eq!(kube.level, Some(Level::Reject));
        let python = items.iter().find(|k| k.name == "Python").unwrap();
        assert_ne!(python.level, Some(Level::Reject));
    }

    #[test]
    fn chat_keywords_are_merged() {
        let inputs = AnalysisInputs {
            events: events(),
            chat_keywords: Some(KeywordPayload::Flat(vec![
                Keyword::named("FastAPI").with_weight(1.0),
            ])),
            ..AnalysisInputs::default()
        };
        let report = analyze(inputs, &AppConfig::default(), &FixedOracle(vec!["Python"]), 7);
        assert_eq!(report.chat_meta, None);
        let KeywordPayload::Structured(merged) = &report.keywords else {
            panic!("merge yields a structured payload");
        };
        let names: Vec<&str> = merged.skills().iter().map(|k| k.name.as_str()).collect();
        assert!(names.contains(&"Python"));
        assert!(names.contains(&"FastAPI"));
    }

    #[test]
    fn recorded_chat_meta_reaches_the_push_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_keywords.json");
        fs::write(
            &path,
            r#"{"skills_interests":[{"name":"FastAPI","weight":1.0}],
                "tools_platforms":[],
                "llm_meta":{"used_llm":true,"fallback_used":true}}"#,
        )
        .unwrap();
        let (payload, meta) = read_chat_keywords(&path).unwrap();
        assert_eq!(payload.keyword_count(), 1);
        assert_eq!(
            meta,
            Some(OracleRun {
                used_llm: true,
                fallback_used: true,
            })
        );

        let inputs = AnalysisInputs {
            events: events(),
            chat_keywords: Some(payload),
            chat_meta: meta,
            ..AnalysisInputs::default()
        };
        let report = analyze(inputs, &AppConfig::default(), &FixedOracle(vec!["Python"]), 7);
        assert_eq!(report.chat_meta, meta);
        let push = push_decision(
            report.keywords.keyword_count(),
            Some(report.llm_meta),
            report.chat_meta,
            false,
        );
        assert!(!push.should_push);
        assert_eq!(push.reason, "fallback used");
    }

    #[test]
    fn chat_keywords_without_meta_have_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_keywords.json");
        fs::write(&path, r#"[{"name":"FastAPI","weight":1.0}]"#).unwrap();
        let (payload, meta) = read_chat_keywords(&path).unwrap();
        assert_eq!(payload.keyword_count(), 1);
        assert_eq!(meta, None);
    }

    #[test]
    fn report_weight_floor_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("events.json"),
            serde_json::to_string(&events()).unwrap(),
        )
        .unwrap();
        let mut config = AppConfig::load(&dir.path().join("config.json")).unwrap();
        config.collector.events_file = Some(PathBuf::from("events.json"));
        let oracle = SkillsOracle(vec!["Python", "Kubernetes"]);

        let outcome = run_analysis(&config, &oracle, 7).unwrap();
        assert!(outcome.report_path.starts_with(dir.path()));
        assert!(outcome.text_report.contains("1. Python (Weight: 0.80)"));
        assert!(!outcome.text_report.contains("Kubernetes"));

        config.output.min_report_weight = 0.9;
        let outcome = run_analysis(&config, &oracle, 7).unwrap();
        assert!(!outcome.text_report.contains("Python"));
        assert!(outcome.text_report.contains("No significant skills detected."));
    }

    #[test]
    fn budget_depends_on_window() {
        let config = AppConfig::default();
        assert_eq!(keyword_budget(1, &config), (5, 5));
        assert_eq!(keyword_budget(7, &config), (5, 10));
    }
}
