//! Report selection, text rendering and the push gate.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::{Keyword, KeywordPayload, Level};
use crate::oracle::OracleRun;

pub const DEFAULT_REPORT_LIMIT: usize = 10;
pub const MIN_REPORT_WEIGHT: f64 = 0.05;
pub const FALLBACK_SUFFIX: &str = " (Fallback)";

/// Drops rejected and near-zero items, then keeps the `limit` heaviest.
/// Items without a level count as passing.
pub fn select_for_report(items: &[Keyword], limit: usize, min_weight: f64) -> Vec<Keyword> {
    let mut kept: Vec<Keyword> = items
        .iter()
        .filter(|k| k.level != Some(Level::Reject))
        .filter(|k| k.weight_or_zero() >= min_weight)
        .cloned()
        .collect();
    kept.sort_by(|a, b| b.weight_or_zero().total_cmp(&a.weight_or_zero()));
    kept.truncate(limit);
    kept
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportLimits {
    pub skills: usize,
    pub tools: usize,
    pub min_weight: f64,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            skills: DEFAULT_REPORT_LIMIT,
            tools: DEFAULT_REPORT_LIMIT,
            min_weight: MIN_REPORT_WEIGHT,
        }
    }
}

fn signal_label(keyword: &Keyword) -> &'static str {
    match keyword.level {
        None | Some(Level::Pass) => "Strong",
        _ => "Weak",
    }
}

fn render_section(lines: &mut Vec<String>, heading: &str, items: &[Keyword], empty: &str) {
    lines.push(heading.to_string());
    if items.is_empty() {
        lines.push(empty.to_string());
        return;
    }
    for (idx, keyword) in items.iter().enumerate() {
        lines.push(format!(
            "{}. {} (Weight: {:.2})",
            idx + 1,
            keyword.trimmed_name(),
            keyword.weight_or_zero()
        ));
        lines.push(format!("   └─ Signal: {}", signal_label(keyword)));
    }
}

/// Plain-text report stamped with the current local time.
pub fn render_text_report(
    payload: &KeywordPayload,
    title_suffix: &str,
    skills_limit: usize,
    tools_limit: usize,
) -> String {
    let limits = ReportLimits {
        skills: skills_limit,
        tools: tools_limit,
        ..ReportLimits::default()
    };
    render_text_report_at(payload, title_suffix, &limits, Local::now())
}

pub fn render_text_report_at(
    payload: &KeywordPayload,
    title_suffix: &str,
    limits: &ReportLimits,
    now: DateTime<Local>,
) -> String {
    let mut lines = vec![
        format!("User Interest Analysis Report{title_suffix}"),
        format!("Time: {}", now.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];

    match payload {
        KeywordPayload::Structured(s) => {
            let skills = select_for_report(s.skills(), limits.skills, limits.min_weight);
            let tools = select_for_report(s.tools(), limits.tools, limits.min_weight);
            render_section(
                &mut lines,
                "Skills & Interests",
                &skills,
                "No significant skills detected.",
            );
            lines.push(String::new());
            render_section(
                &mut lines,
                "Tools & Platforms",
                &tools,
                "No significant tools detected.",
            );
        }
        KeywordPayload::Flat(items) => {
            lines.push("Top Keywords".to_string());
            let has_level = items.iter().any(|k| k.level.is_some());
            for (idx, keyword) in items.iter().enumerate() {
                let level = match (has_level, keyword.level) {
                    (true, Some(level)) => format!(", Level: {}", level.as_str()),
                    _ => String::new(),
                };
                lines.push(format!(
                    "{}. {} (Weight: {:.2}{level})",
                    idx + 1,
                    keyword.trimmed_name(),
                    keyword.weight_or_zero()
                ));
            }
        }
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushDecision {
    pub should_push: bool,
    pub title_suffix: String,
    /// Empty when pushing.
    pub reason: String,
}

/// Missing oracle metadata counts as "fallback, no LLM".
pub fn push_decision(
    keyword_count: usize,
    llm_meta: Option<OracleRun>,
    chat_meta: Option<OracleRun>,
    push_on_fallback: bool,
) -> PushDecision {
    let llm = llm_meta.unwrap_or_else(OracleRun::fallback);
    let chat = chat_meta.unwrap_or_default();
    let any_fallback = llm.fallback_used || chat.fallback_used;
    let any_used_llm = llm.used_llm || chat.used_llm;

    let should_push = keyword_count > 0 && any_used_llm && (push_on_fallback || !any_fallback);
    let title_suffix = if any_fallback && push_on_fallback {
        FALLBACK_SUFFIX.to_string()
    } else {
        String::new()
    };
    if should_push {
        return PushDecision {
            should_push,
            title_suffix,
            reason: String::new(),
        };
    }

    let mut reasons = Vec::new();
    if keyword_count == 0 {
        reasons.push("no keywords");
    }
    if !any_used_llm {
        reasons.push("LLM not used successfully");
    }
    if any_fallback && !push_on_fallback {
        reasons.push("fallback used");
    }
    let reason = if reasons.is_empty() {
        "unknown".to_string()
    } else {
        reasons.join(", ")
    };
    PushDecision {
        should_push,
        title_suffix,
        reason,
    }
}
