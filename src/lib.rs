pub mod analysis;
pub mod chat;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod review;
pub mod segmentation;
mod utils;

use clap::Parser;

pub use analysis::{annotate_keywords, AuditOptions, Auditor};
pub use chat::{compress_chat_text, merge_keyword_payloads, ChatCompression};
pub use cleaner::{compress_events, EventCompressor};
pub use config::AppConfig;
pub use db::EventStore;
pub use oracle::{BaselineOracle, FileOracle, KeywordOracle, OracleRun};
pub use pipeline::{run_analysis, AnalysisReport};
pub use report::{push_decision, render_text_report, select_for_report, PushDecision};
pub use review::{build_review, ReviewArtifact};
pub use segmentation::SegmentationConfig;

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = cli::Cli::parse();
    log::info!("JobInsight starting: {:?}", cli.command);

    let result = cli::execute(cli);
    if let Err(err) = &result {
        cli::report_failure(err);
    }
    result
}
