//! Segmentation review artifact: events grouped into segments and slices,
//! each with a summary and audited keywords, written as JSON for a human
//! reviewer to score offline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{build_baseline_with_weight, Auditor};
use crate::cleaner::EventCompressor;
use crate::config::AppConfig;
use crate::models::{sort_chronologically, CompressedSnapshot, Keyword, KeywordPayload, RawEvent};
use crate::oracle::KeywordOracle;
use crate::pipeline::load_events;
use crate::segmentation::{
    build_slices, format_event_line, segment_events, summarize_segment, SegmentSummary,
    SegmentationConfig, Slice,
};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const MIN_SEGMENT_BASELINE: usize = 10;
const BASELINE_HEADROOM: usize = 5;
const SEGMENT_BASELINE_KIND: &str = "NLP (Baseline)";
const SLICE_BASELINE_KIND: &str = "NLP (Slice)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SliceReview {
    pub slice_id: String,
    pub segment_id: String,
    pub source: String,
    pub channel: String,
    pub tag: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub line_count: usize,
    pub raw_lines: Vec<String>,
    #[serde(default)]
    pub llm_keywords: Vec<Keyword>,
    pub baseline_keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentReview {
    pub segment_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub event_pack_count: usize,
    pub line_count: usize,
    pub summary: SegmentSummary,
    pub events: Vec<RawEvent>,
    pub slices: Vec<SliceReview>,
    #[serde(default)]
    pub llm_keywords: Vec<Keyword>,
    pub baseline_keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewMeta {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub segment_config: SegmentationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewArtifact {
    pub meta: ReviewMeta,
    pub segments: Vec<SegmentReview>,
}

/// Evidence score when the item was audited, else its weight.
fn ranking_weight(keyword: &Keyword) -> f64 {
    match &keyword.scores {
        Some(scores) => scores.evidence,
        None => keyword.weight_or_zero(),
    }
}

fn trim_keywords(mut items: Vec<Keyword>, limit: usize) -> Vec<Keyword> {
    items.sort_by(|a, b| {
        ranking_weight(b)
            .total_cmp(&ranking_weight(a))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    items.truncate(limit);
    items
}

struct ReviewBuilder<'c> {
    config: &'c AppConfig,
    compressor: EventCompressor,
    auditor: Auditor,
}

impl<'c> ReviewBuilder<'c> {
    fn new(config: &'c AppConfig) -> Self {
        Self {
            config,
            compressor: EventCompressor::new(config.cleaner.clone()),
            auditor: Auditor::new(config.analysis.audit_options()),
        }
    }

    fn chat_weight(&self) -> f64 {
        self.config.analysis.token_weights.chat_sessions
    }

    fn baseline_keywords(
        &self,
        snapshot: &CompressedSnapshot,
        limit: usize,
        kind: &str,
        weight: Option<f64>,
    ) -> Vec<Keyword> {
        let items: Vec<Keyword> = build_baseline_with_weight(snapshot, limit, self.chat_weight())
            .into_iter()
            .map(|token| {
                let keyword = Keyword::named(token).with_kind(kind);
                match weight {
                    Some(w) => keyword.with_weight(w),
                    None => keyword,
                }
            })
            .collect();
        if items.is_empty() {
            return items;
        }
        self.auditor
            .annotate(&KeywordPayload::Flat(items), snapshot, None)
            .flatten()
    }

    /// Ask the oracle for candidates; `None` when there is no oracle or the
    /// call failed.
    fn oracle_candidates(
        &self,
        oracle: Option<&dyn KeywordOracle>,
        snapshot: &CompressedSnapshot,
        (min_k, max_k): (usize, usize),
        label: &str,
    ) -> Option<KeywordPayload> {
        match oracle?.extract_keywords(snapshot, min_k, max_k) {
            Ok(payload) => Some(payload),
            Err(err) => {
                log_warn!("Oracle failed for {label}: {err:#}");
                None
            }
        }
    }

    fn audited(&self, payload: &KeywordPayload, snapshot: &CompressedSnapshot) -> Vec<Keyword> {
        self.auditor
            .annotate(payload, snapshot, None)
            .flatten_tagged()
    }

    /// Slice keywords are audited against the slice's own snapshot. Oracle
    /// candidates come from a per-slice call, falling back to the segment's.
    fn slice(
        &self,
        segment_id: &str,
        slice: &Slice<'_>,
        oracle: Option<&dyn KeywordOracle>,
        segment_candidates: Option<&KeywordPayload>,
    ) -> SliceReview {
        let events: Vec<RawEvent> = slice.events.iter().map(|e| (*e).clone()).collect();
        let snapshot = self.compressor.compress(&events);
        let seg_config = &self.config.segmentation;
        let limit = seg_config.slice_keyword_limit;

        let label = format!("{segment_id}/{}", slice.id);
        let candidates = self
            .oracle_candidates(
                oracle,
                &snapshot,
                (seg_config.slice_min_k, seg_config.slice_max_k),
                &label,
            )
            .or_else(|| segment_candidates.cloned());
        let llm_keywords = match candidates {
            Some(payload) if !payload.is_empty() => {
                trim_keywords(self.audited(&payload, &snapshot), limit)
            }
            _ => Vec::new(),
        };
        let baseline_keywords = self.baseline_keywords(&snapshot, limit, SLICE_BASELINE_KIND, None);

        SliceReview {
            slice_id: slice.id.clone(),
            segment_id: segment_id.to_string(),
            source: slice.source.clone(),
            channel: slice.channel.clone(),
            tag: slice.tag.clone(),
            start: slice.start,
            end: slice.end,
            line_count: slice.line_count,
            raw_lines: events.iter().map(format_event_line).collect(),
            llm_keywords,
            baseline_keywords: trim_keywords(baseline_keywords, limit),
        }
    }
}

/// Build the review artifact. The oracle, when given, is asked once per
/// segment and once per slice; a failing call leaves that unit with
/// baseline keywords only (slices reuse the segment's candidates).
pub fn build_review(
    events: &[RawEvent],
    config: &AppConfig,
    oracle: Option<&dyn KeywordOracle>,
) -> ReviewArtifact {
    let mut sorted = events.to_vec();
    sort_chronologically(&mut sorted);

    let seg_config = config.segmentation;
    let builder = ReviewBuilder::new(config);
    let segments = segment_events(&sorted, &seg_config);
    log_info!(
        "Review covers {} events in {} segments",
        sorted.len(),
        segments.len()
    );

    let reviews = segments
        .iter()
        .map(|segment| {
            let seg_events: Vec<RawEvent> = segment.events.iter().map(|e| (*e).clone()).collect();
            let snapshot = builder.compressor.compress(&seg_events);
            let summary = summarize_segment(&snapshot);

            let candidates = builder.oracle_candidates(
                oracle,
                &snapshot,
                (seg_config.segment_min_k, seg_config.segment_max_k),
                &segment.id,
            );
            let llm_keywords = candidates
                .as_ref()
                .map(|payload| builder.audited(payload, &snapshot))
                .unwrap_or_default();

            let baseline_limit = MIN_SEGMENT_BASELINE.max(llm_keywords.len() + BASELINE_HEADROOM);
            let baseline_keywords = builder.baseline_keywords(
                &snapshot,
                baseline_limit,
                SEGMENT_BASELINE_KIND,
                Some(0.0),
            );

            let slices = build_slices(&segment.events, &seg_config)
                .iter()
                .map(|slice| builder.slice(&segment.id, slice, oracle, candidates.as_ref()))
                .collect();

            SegmentReview {
                segment_id: segment.id.clone(),
                start: segment.start,
                end: segment.end,
                event_pack_count: segment.pack_count(),
                line_count: segment.line_count,
                summary,
                events: seg_events,
                slices,
                llm_keywords,
                baseline_keywords,
            }
        })
        .collect();

    ReviewArtifact {
        meta: ReviewMeta {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            segment_config: seg_config,
        },
        segments: reviews,
    }
}

/// Write under `dir` as `segments_<run id>.json`; returns the file path.
pub fn write_review(artifact: &ReviewArtifact, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create review directory {}", dir.display()))?;
    let path = dir.join(format!("segments_{}.json", artifact.meta.run_id));
    let serialized = serde_json::to_string_pretty(artifact)?;
    fs::write(&path, serialized)
        .with_context(|| format!("failed to write review artifact {}", path.display()))?;
    log_info!("Review artifact written to {}", path.display());
    Ok(path)
}

/// Load events, build the artifact and write it under `output.review_dir`.
pub fn run_review(
    config: &AppConfig,
    days: i64,
    oracle: Option<&dyn KeywordOracle>,
) -> Result<PathBuf> {
    let events = load_events(config, days)?;
    if events.is_empty() {
        log_warn!("No events found; writing an empty review");
    }
    let artifact = build_review(&events, config, oracle);
    write_review(&artifact, &config.resolve_path(&config.output.review_dir))
}
