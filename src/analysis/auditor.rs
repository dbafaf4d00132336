//! Annotates oracle candidates with evidence, scores and a level, checked
//! against the same snapshot the oracle was shown.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

use super::baseline::{
    build_baseline_with_weight, compute_overlap, DEFAULT_BASELINE_LIMIT, DEFAULT_CHAT_TOKEN_WEIGHT,
};
use super::consistency::compute_consistency;
use super::evidence::{
    build_title_entries, compute_evidence_features, score_evidence, EvidenceMaxima, TitleEntry,
};
use super::thresholds::{assign_level, compute_thresholds};
use crate::cleaner::round4;
use crate::models::{
    CompressedSnapshot, EvidenceFeatures, Keyword, KeywordPayload, KeywordScores, Level,
    StructuredKeywords,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditOptions {
    pub baseline_limit: usize,
    pub chat_token_weight: f64,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            baseline_limit: DEFAULT_BASELINE_LIMIT,
            chat_token_weight: DEFAULT_CHAT_TOKEN_WEIGHT,
        }
    }
}

/// Consistency for a name no run mentions.
const MISSING_CONSISTENCY: f64 = 1.0;

struct ConsistencyTable {
    scores: HashMap<String, f64>,
}

impl ConsistencyTable {
    fn get(&self, name: &str) -> f64 {
        self.scores.get(name).copied().unwrap_or(MISSING_CONSISTENCY)
    }
}

/// Snapshot-derived state shared by every list in one audit call.
struct AuditContext {
    entries: Vec<TitleEntry>,
    baseline: BTreeSet<String>,
    consistency: ConsistencyTable,
}

#[derive(Debug, Clone, Default)]
pub struct Auditor {
    options: AuditOptions,
}

impl Auditor {
    pub fn new(options: AuditOptions) -> Self {
        Self { options }
    }

    /// Returns an annotated copy in the same shape as `payload`. Items with a
    /// blank name are dropped. `runs` are the candidate names from repeated
    /// oracle runs; `None` (or an empty slice) means self-consistency.
    pub fn annotate(
        &self,
        payload: &KeywordPayload,
        snapshot: &CompressedSnapshot,
        runs: Option<&[Vec<String>]>,
    ) -> KeywordPayload {
        if payload.is_empty() {
            return payload.clone();
        }

        let scores = match runs.filter(|r| !r.is_empty()) {
            Some(runs) => compute_consistency(runs),
            None => compute_consistency(&[payload.names()]),
        };
        let consistency = ConsistencyTable { scores };
        let ctx = AuditContext {
            entries: build_title_entries(snapshot),
            baseline: build_baseline_with_weight(
                snapshot,
                self.options.baseline_limit,
                self.options.chat_token_weight,
            ),
            consistency,
        };

        match payload {
            KeywordPayload::Flat(items) => KeywordPayload::Flat(annotate_list(items, &ctx)),
            KeywordPayload::Structured(s) => KeywordPayload::Structured(StructuredKeywords {
                skills_interests: s.skills_interests.as_ref().map(|l| annotate_list(l, &ctx)),
                tools_platforms: s.tools_platforms.as_ref().map(|l| annotate_list(l, &ctx)),
                extra: s.extra.clone(),
            }),
        }
    }
}

/// Annotate with default options.
pub fn annotate_keywords(
    payload: &KeywordPayload,
    snapshot: &CompressedSnapshot,
    runs: Option<&[Vec<String>]>,
) -> KeywordPayload {
    Auditor::default().annotate(payload, snapshot, runs)
}

fn annotate_list(items: &[Keyword], ctx: &AuditContext) -> Vec<Keyword> {
    let mut features: HashMap<&str, EvidenceFeatures> = HashMap::new();
    for item in items {
        let name = item.trimmed_name();
        if name.is_empty() || features.contains_key(name) {
            continue;
        }
        features.insert(name, compute_evidence_features(name, &ctx.entries));
    }

    let maxima = EvidenceMaxima::from_features(features.values());
    let evidence_scores: HashMap<&str, f64> = features
        .iter()
        .map(|(name, f)| (*name, score_evidence(f, &maxima)))
        .collect();
    let raw_scores: Vec<f64> = evidence_scores.values().copied().collect();
    let thresholds = compute_thresholds(&raw_scores);

    let annotated: Vec<Keyword> = items
        .iter()
        .filter(|item| !item.trimmed_name().is_empty())
        .map(|item| {
            let name = item.trimmed_name();
            let evidence = evidence_scores.get(name).copied().unwrap_or(0.0);
            let consistency = ctx.consistency.get(name);
            let overlap = compute_overlap(name, &ctx.baseline);
            let level = assign_level(evidence, consistency, overlap, &thresholds);

            let mut out = item.clone();
            out.evidence = Some(features.get(name).cloned().unwrap_or_default());
            out.scores = Some(KeywordScores {
                evidence: round4(evidence),
                consistency: round4(consistency),
                baseline_overlap: round4(overlap),
            });
            out.level = Some(level);
            out
        })
        .collect();

    debug!(
        "audited {} candidates: t0={:.4} t1={:.4}, {} pass, {} reject",
        annotated.len(),
        thresholds.t0,
        thresholds.t1,
        annotated.iter().filter(|k| k.level == Some(Level::Pass)).count(),
        annotated.iter().filter(|k| k.level == Some(Level::Reject)).count()
    );
    annotated
}
