//! Evidence features: how much of the snapshot textually supports a
//! candidate, and a batch-relative score built from them.

use std::collections::BTreeSet;

use crate::models::{CompressedSnapshot, EvidenceFeatures, EvidenceType};

const EXAMPLE_TITLE_CAP: usize = 3;

const SUPPORT_WEIGHT: f64 = 0.4;
const DURATION_WEIGHT: f64 = 0.4;
const TITLES_WEIGHT: f64 = 0.2;

/// One searchable line of evidence with its estimated time share.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleEntry {
    pub title: String,
    pub count: u64,
    pub duration: f64,
}

impl TitleEntry {
    fn new(title: impl Into<String>, count: u64, duration: f64) -> Self {
        Self {
            title: title.into(),
            count,
            duration,
        }
    }
}

/// Per domain: the domain itself with its totals, then each distinct title
/// with a pro-rata share of the domain's active time. Window titles fan out
/// one entry per title at the app's full duration; audio samples add one each.
pub fn build_title_entries(snapshot: &CompressedSnapshot) -> Vec<TitleEntry> {
    let mut entries = Vec::new();

    for (domain, stats) in &snapshot.web {
        let total_active = stats.active_seconds.max(0) as f64;
        let total_count = stats.total_title_count();
        if !domain.is_empty() {
            entries.push(TitleEntry::new(domain.clone(), total_count, total_active));
        }
        for (title, count) in &stats.title_freq {
            if title.is_empty() {
                continue;
            }
            let share = if total_count > 0 {
                total_active * (*count as f64 / total_count as f64)
            } else {
                0.0
            };
            entries.push(TitleEntry::new(title.clone(), *count, share));
        }
    }

    for sample in &snapshot.non_web_samples.window {
        for title in sample.titles.iter().filter(|t| !t.is_empty()) {
            entries.push(TitleEntry::new(title.clone(), 1, sample.duration.max(0) as f64));
        }
    }

    for sample in &snapshot.non_web_samples.audio {
        if !sample.title.is_empty() {
            entries.push(TitleEntry::new(sample.title.clone(), 1, sample.duration.max(0) as f64));
        }
    }

    entries
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive substring match of the candidate against every entry.
pub fn compute_evidence_features(candidate: &str, entries: &[TitleEntry]) -> EvidenceFeatures {
    let key = normalize(candidate);
    let mut support_count = 0u64;
    let mut duration_seconds = 0.0f64;
    let mut example_titles: Vec<String> = Vec::new();
    let mut distinct_titles: BTreeSet<&str> = BTreeSet::new();

    if !key.is_empty() {
        for entry in entries.iter().filter(|e| !e.title.is_empty()) {
            if !normalize(&entry.title).contains(&key) {
                continue;
            }
            support_count += entry.count;
            duration_seconds += entry.duration.max(0.0);
            distinct_titles.insert(entry.title.as_str());
            if example_titles.len() < EXAMPLE_TITLE_CAP {
                example_titles.push(entry.title.clone());
            }
        }
    }

    let mut evidence_types = Vec::new();
    if support_count > 0 {
        evidence_types.push(EvidenceType::Exact);
    }
    if duration_seconds > 0.0 {
        evidence_types.push(EvidenceType::Duration);
    }
    if !example_titles.is_empty() {
        evidence_types.push(EvidenceType::Title);
        evidence_types.push(EvidenceType::Context);
    }

    EvidenceFeatures {
        support_count,
        duration_seconds: duration_seconds.floor() as u64,
        distinct_title_count: distinct_titles.len() as u64,
        context_snippet: example_titles.first().cloned().unwrap_or_default(),
        example_titles,
        evidence_types,
    }
}

/// Batch maxima that every candidate in one audit call is normalised against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvidenceMaxima {
    pub support: u64,
    pub duration: u64,
    pub titles: u64,
}

impl EvidenceMaxima {
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a EvidenceFeatures>) -> Self {
        features
            .into_iter()
            .fold(Self::default(), |acc, f| Self {
                support: acc.support.max(f.support_count),
                duration: acc.duration.max(f.duration_seconds),
                titles: acc.titles.max(f.distinct_title_count),
            })
    }
}

fn ratio(value: u64, max: u64) -> f64 {
    if max > 0 {
        value as f64 / max as f64
    } else {
        0.0
    }
}

pub fn score_evidence(features: &EvidenceFeatures, maxima: &EvidenceMaxima) -> f64 {
    let score = SUPPORT_WEIGHT * ratio(features.support_count, maxima.support)
        + DURATION_WEIGHT * ratio(features.duration_seconds, maxima.duration)
        + TITLES_WEIGHT * ratio(features.distinct_title_count, maxima.titles);
    score.clamp(0.0, 1.0)
}
