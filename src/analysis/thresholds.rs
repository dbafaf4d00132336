//! Batch-relative thresholds and the pass/weak/reject decision.

use serde::{Deserialize, Serialize};

use crate::models::Level;

pub const LOW_QUANTILE: f64 = 0.5;
pub const HIGH_QUANTILE: f64 = 0.8;
pub const PASS_MIN_CONSISTENCY: f64 = 0.6;
pub const PASS_MIN_BASELINE_OVERLAP: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub t0: f64,
    pub t1: f64,
}

/// Linear-interpolated quantile; 0.0 for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    if lower == upper {
        return sorted[lower];
    }
    let frac = pos - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

/// P50/P80 over one batch of evidence scores.
pub fn compute_thresholds(scores: &[f64]) -> Thresholds {
    Thresholds {
        t0: quantile(scores, LOW_QUANTILE),
        t1: quantile(scores, HIGH_QUANTILE),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Low,
    Mid,
    High,
}

pub fn bucket_score(score: f64, thresholds: &Thresholds) -> Bucket {
    if score < thresholds.t0 {
        Bucket::Low
    } else if score < thresholds.t1 {
        Bucket::Mid
    } else {
        Bucket::High
    }
}

/// Reject below `t0`; pass only when evidence, consistency and baseline
/// overlap are all strong; weak otherwise.
pub fn assign_level(
    evidence: f64,
    consistency: f64,
    baseline_overlap: f64,
    thresholds: &Thresholds,
) -> Level {
    if evidence < thresholds.t0 {
        return Level::Reject;
    }
    if evidence >= thresholds.t1
        && consistency >= PASS_MIN_CONSISTENCY
        && baseline_overlap >= PASS_MIN_BASELINE_OVERLAP
    {
        return Level::Pass;
    }
    Level::Weak
}
