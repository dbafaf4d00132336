use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::chat::{build_session, compress_chat_text, redact_sensitive, ChatCompression};
use crate::config::AppConfig;
use crate::db::{ingest_events_file, EventStore};
use crate::oracle::{BaselineOracle, FileOracle, KeywordOracle};
use crate::pipeline::run_analysis;
use crate::review::run_review;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

#[derive(Parser, Debug)]
#[command(
    name = "jobinsight",
    version,
    about = "Evidence-audited skill keywords from activity telemetry"
)]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compress events, audit oracle keywords and write the report
    Analyze {
        /// Days of events to analyze (defaults to collector.days)
        #[arg(short, long)]
        days: Option<i64>,

        /// Recorded oracle response to replay
        #[arg(long)]
        oracle_file: Option<PathBuf>,

        /// Print the text report even when the push gate says no
        #[arg(long)]
        print: bool,
    },
    /// Load an exported events file into the event store
    Ingest {
        /// JSON array of events (or an object with an `events` array)
        input: PathBuf,

        /// Drop stored events older than this many days (defaults to collector.days)
        #[arg(long)]
        retention_days: Option<i64>,
    },
    /// Write the segmentation review artifact
    Review {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        oracle_file: Option<PathBuf>,
    },
    /// Redact and compress a chat export ("-" reads stdin)
    CompressChat {
        input: PathBuf,

        #[arg(long)]
        max_chars: Option<usize>,

        #[arg(long)]
        max_lines: Option<usize>,

        /// Skip secret/PII redaction
        #[arg(long)]
        no_redact: bool,

        /// Emit a chat session record for this domain instead of plain text
        #[arg(long)]
        domain: Option<String>,
    },
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

/// CLI flag first, then `analysis.oracle_file`, else the baseline.
fn select_oracle(config: &AppConfig, flag: Option<PathBuf>) -> Box<dyn KeywordOracle> {
    match flag.or_else(|| config.analysis.oracle_file.clone()) {
        Some(path) => Box::new(FileOracle::new(config.resolve_path(&path))),
        None => {
            log_info!("No oracle response configured; using the baseline extractor");
            Box::new(BaselineOracle::new(config.analysis.token_weights.chat_sessions))
        }
    }
}

fn compress_options(
    config: &AppConfig,
    max_chars: Option<usize>,
    max_lines: Option<usize>,
) -> ChatCompression {
    let mut options = config.chat;
    if let Some(max_chars) = max_chars {
        options.max_chars = max_chars;
    }
    if let Some(max_lines) = max_lines {
        options.max_lines = max_lines;
    }
    options
}

pub fn execute(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Analyze {
            days,
            oracle_file,
            print,
        } => {
            let days = days.unwrap_or(config.collector.days);
            let oracle = select_oracle(&config, oracle_file);
            let outcome = run_analysis(&config, oracle.as_ref(), days)?;
            println!("Report: {}", outcome.report_path.display());
            if outcome.push.should_push || print {
                println!("{}", outcome.text_report);
            } else {
                println!("Push skipped: {}", outcome.push.reason);
            }
        }
        Command::Ingest {
            input,
            retention_days,
        } => {
            let retention_days = retention_days.unwrap_or(config.collector.days);
            let store = EventStore::open(config.resolve_path(&config.collector.db_path))?;
            let summary = ingest_events_file(&store, &input, retention_days)?;
            println!(
                "Inserted {} of {} events, purged {}",
                summary.inserted, summary.loaded, summary.purged
            );
        }
        Command::Review { days, oracle_file } => {
            let days = days.unwrap_or(config.collector.days);
            let oracle = oracle_file
                .or_else(|| config.analysis.oracle_file.clone())
                .map(|path| FileOracle::new(config.resolve_path(&path)));
            let path = run_review(
                &config,
                days,
                oracle.as_ref().map(|o| o as &dyn KeywordOracle),
            )?;
            println!("Review: {}", path.display());
        }
        Command::CompressChat {
            input,
            max_chars,
            max_lines,
            no_redact,
            domain,
        } => {
            let text = read_input(&input)?;
            let options = compress_options(&config, max_chars, max_lines);
            match domain {
                Some(domain) => {
                    let source = input.display().to_string();
                    let session = build_session(&domain, &source, &text, &options);
                    println!("{}", serde_json::to_string_pretty(&session)?);
                }
                None => {
                    let text = if no_redact { text } else { redact_sensitive(&text) };
                    println!("{}", compress_chat_text(&text, &options));
                }
            }
        }
    }
    Ok(())
}

pub fn report_failure(err: &anyhow::Error) {
    log_error!("jobinsight failed: {err:#}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_overrides() {
        let cli = Cli::try_parse_from([
            "jobinsight",
            "--config",
            "cfg.json",
            "analyze",
            "--days",
            "1",
            "--oracle-file",
            "oracle.json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("cfg.json"));
        match cli.command {
            Command::Analyze {
                days, oracle_file, print,
            } => {
                assert_eq!(days, Some(1));
                assert_eq!(oracle_file, Some(PathBuf::from("oracle.json")));
                assert!(!print);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ingest_fills_the_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"collector": {"db_path": "store/events.db"}}"#).unwrap();
        let export = dir.path().join("events.json");
        let event = crate::models::RawEvent::new(
            crate::models::EventType::Web,
            chrono::Utc::now() - chrono::Duration::hours(1),
            90,
        )
        .with_url("https://docs.rs/clap");
        fs::write(&export, serde_json::to_string(&[event]).unwrap()).unwrap();

        let cli = Cli::try_parse_from([
            "jobinsight",
            "--config",
            config_path.to_str().unwrap(),
            "ingest",
            export.to_str().unwrap(),
            "--retention-days",
            "14",
        ])
        .unwrap();
        execute(cli).unwrap();

        let store = EventStore::open(dir.path().join("store").join("events.db")).unwrap();
        assert_eq!(store.count_events().unwrap(), 1);
        assert!(store
            .get_meta(crate::db::import::LAST_COLLECT_KEY)
            .unwrap()
            .is_some());
    }

    #[test]
    fn compress_chat_flags_override_config() {
        let cli = Cli::try_parse_from(["jobinsight", "compress-chat", "-", "--max-chars", "300"])
            .unwrap();
        let Command::CompressChat {
            max_chars,
            max_lines,
            ..
        } = cli.command
        else {
            panic!("expected compress-chat");
        };
        let options = compress_options(&AppConfig::default(), max_chars, max_lines);
        assert_eq!(options.max_chars, 300);
        assert_eq!(options.max_lines, ChatCompression::default().max_lines);
    }
}
