//! Combines an activity-derived keyword payload with a chat-derived one into
//! a single ranked list, using evidence seconds as the common currency.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::models::{Keyword, KeywordPayload, StructuredKeywords};

static BULLET_RE: OnceLock<Regex> = OnceLock::new();
static WS_RE: OnceLock<Regex> = OnceLock::new();

/// Case, whitespace and dot-bullet insensitive merge key.
pub fn normalize_keyword_name(name: &str) -> String {
    let bullet = BULLET_RE.get_or_init(|| Regex::new(r"[·•]+").unwrap());
    let ws = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let lower = name.trim().to_lowercase();
    let spaced = bullet.replace_all(&lower, " ");
    ws.replace_all(&spaced, " ").trim().to_string()
}

fn non_negative(seconds: i64) -> u64 {
    seconds.max(0) as u64
}

/// Primary-source items: evidence seconds when present, otherwise the clamped
/// weight's share of the total.
fn with_abs_from_evidence(items: &[Keyword], fallback_total_seconds: i64) -> Vec<Keyword> {
    let total = non_negative(fallback_total_seconds) as f64;
    items
        .iter()
        .cloned()
        .map(|mut item| {
            let abs = match item.evidence_seconds() {
                Some(seconds) => seconds,
                None => (item.weight_or_zero().clamp(0.0, 1.0) * total) as u64,
            };
            item.abs_weight_seconds = Some(abs);
            item
        })
        .collect()
}

/// Secondary-source items: evidence seconds when present, the rest split
/// `pool_seconds` by relative weight (equal split if the weights sum to 0).
fn with_abs_from_pool(items: &[Keyword], pool_seconds: i64) -> Vec<Keyword> {
    let pool = non_negative(pool_seconds) as f64;
    let pooled: Vec<f64> = items
        .iter()
        .filter(|item| item.evidence_seconds().is_none())
        .map(|item| item.weight_or_zero().max(0.0))
        .collect();
    let mut denom: f64 = pooled.iter().sum();
    let equal_split = denom <= 0.0;
    if equal_split {
        denom = pooled.len().max(1) as f64;
    }

    items
        .iter()
        .cloned()
        .map(|mut item| {
            let abs = match item.evidence_seconds() {
                Some(seconds) => seconds,
                None => {
                    let share = if equal_split {
                        1.0
                    } else {
                        item.weight_or_zero().max(0.0)
                    };
                    (pool * share / denom) as u64
                }
            };
            item.abs_weight_seconds = Some(abs);
            item
        })
        .collect()
}

/// First occurrence seeds the record. Later duplicates add their seconds,
/// raise the weight to the max seen, and only fill quote/domain when missing.
fn merge_by_name(items: Vec<Keyword>) -> Vec<Keyword> {
    let mut merged: Vec<Keyword> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = normalize_keyword_name(&item.name);
        if key.is_empty() {
            continue;
        }
        let abs = item.abs_weight_seconds.unwrap_or(0);

        let Some(&pos) = index.get(&key) else {
            let mut seed = item;
            seed.name = seed.name.trim().to_string();
            seed.abs_weight_seconds = Some(abs);
            index.insert(key, merged.len());
            merged.push(seed);
            continue;
        };

        let prev = &mut merged[pos];
        prev.abs_weight_seconds = Some(prev.abs_weight_seconds.unwrap_or(0) + abs);
        if item.weight_or_zero() > prev.weight_or_zero() {
            prev.weight = item.weight;
        }
        if prev.evidence_quote.as_deref().map_or(true, str::is_empty) {
            if let Some(quote) = item.evidence_quote.filter(|q| !q.is_empty()) {
                prev.evidence_quote = Some(quote);
            }
        }
        if prev.source_domain.as_deref().map_or(true, str::is_empty) {
            if let Some(domain) = item.source_domain.filter(|d| !d.is_empty()) {
                prev.source_domain = Some(domain);
            }
        }
    }
    merged
}

/// `weight = abs / max(abs)`; all zero when every item has zero seconds.
fn normalize_weights(items: &mut [Keyword]) {
    let max_abs = items
        .iter()
        .map(|item| item.abs_weight_seconds.unwrap_or(0))
        .max()
        .unwrap_or(0);
    for item in items.iter_mut() {
        let weight = if max_abs == 0 {
            0.0
        } else {
            (item.abs_weight_seconds.unwrap_or(0) as f64 / max_abs as f64).clamp(0.0, 1.0)
        };
        item.weight = Some(weight);
    }
}

fn merge_section(
    base: &[Keyword],
    secondary: &[Keyword],
    non_secondary_total_seconds: i64,
    pool_seconds: i64,
) -> Vec<Keyword> {
    let mut combined = with_abs_from_evidence(base, non_secondary_total_seconds);
    combined.extend(with_abs_from_pool(secondary, pool_seconds));
    let mut merged = merge_by_name(combined);
    normalize_weights(&mut merged);
    merged.sort_by(|a, b| b.abs_weight_seconds.cmp(&a.abs_weight_seconds));
    merged
}

/// Flat payloads are treated as a skills-only section.
fn sections(payload: &KeywordPayload) -> (&[Keyword], &[Keyword]) {
    match payload {
        KeywordPayload::Flat(items) => (items.as_slice(), &[][..]),
        KeywordPayload::Structured(s) => (s.skills(), s.tools()),
    }
}

/// Merge `secondary` (e.g. chat-derived) keywords into `base`. Inputs are not
/// modified; skills and tools are merged independently.
pub fn merge_keyword_payloads(
    base: &KeywordPayload,
    secondary: &KeywordPayload,
    non_secondary_total_seconds: i64,
    secondary_pool_seconds: i64,
) -> StructuredKeywords {
    let (base_skills, base_tools) = sections(base);
    let (sec_skills, sec_tools) = sections(secondary);

    let skills = merge_section(
        base_skills,
        sec_skills,
        non_secondary_total_seconds,
        secondary_pool_seconds,
    );
    let tools = merge_section(
        base_tools,
        sec_tools,
        non_secondary_total_seconds,
        secondary_pool_seconds,
    );
    debug!(
        "merged keyword payloads into {} skills and {} tools",
        skills.len(),
        tools.len()
    );
    StructuredKeywords::new(skills, tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(skills: Vec<Keyword>) -> KeywordPayload {
        KeywordPayload::Structured(StructuredKeywords::new(skills, Vec::new()))
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_keyword_name("  Node•JS  "), "node js");
        assert_eq!(normalize_keyword_name("Machine\tLearning"), "machine learning");
        assert_eq!(normalize_keyword_name("a · b"), "a b");
        assert_eq!(normalize_keyword_name("   "), "");
    }

    #[test]
    fn evidence_and_pool_seconds_merge_case_insensitively() {
        let base = structured(vec![Keyword::named("Python")
            .with_weight(0.5)
            .with_evidence_seconds(100)]);
        let chat = structured(vec![Keyword::named("python").with_weight(1.0)]);

        let out = merge_keyword_payloads(&base, &chat, 1000, 50);
        let skills = out.skills();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "Python");
        assert_eq!(skills[0].abs_weight_seconds, Some(150));
        assert_eq!(skills[0].weight, Some(1.0));
        assert!(out.tools().is_empty());
    }

    #[test]
    fn base_without_evidence_uses_weight_share_of_total() {
        let base = structured(vec![
            Keyword::named("Rust").with_weight(0.5),
            Keyword::named("Go").with_weight(2.0),
        ]);
        let out = merge_keyword_payloads(&base, &KeywordPayload::default(), 1000, 0);
        let skills = out.skills();
        assert_eq!(skills[0].name, "Go");
        assert_eq!(skills[0].abs_weight_seconds, Some(1000));
        assert_eq!(skills[1].abs_weight_seconds, Some(500));
        assert_eq!(skills[1].weight, Some(0.5));
    }

    #[test]
    fn pool_splits_equally_when_weights_are_zero() {
        let chat = structured(vec![Keyword::named("A"), Keyword::named("B")]);
        let out = merge_keyword_payloads(&KeywordPayload::default(), &chat, 0, 90);
        let secs: Vec<Option<u64>> = out.skills().iter().map(|k| k.abs_weight_seconds).collect();
        assert_eq!(secs, vec![Some(45), Some(45)]);
    }

    #[test]
    fn all_zero_seconds_yields_zero_weights() {
        let base = structured(vec![Keyword::named("A").with_weight(0.9)]);
        let out = merge_keyword_payloads(&base, &KeywordPayload::default(), 0, 0);
        assert_eq!(out.skills()[0].weight, Some(0.0));
    }

    #[test]
    fn quote_backfill_is_first_seen_while_weight_is_max() {
        let mut first = Keyword::named("Docker").with_weight(0.2);
        first.source_domain = Some("docs.docker.com".into());
        let mut second = Keyword::named("docker").with_weight(0.9);
        second.source_domain = Some("hub.docker.com".into());
        second.evidence_quote = Some("docker compose up".into());

        let out = merge_section(&[first], &[second], 100, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_domain.as_deref(), Some("docs.docker.com"));
        assert_eq!(out[0].evidence_quote.as_deref(), Some("docker compose up"));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let base = structured(vec![Keyword::named("Rust").with_weight(0.4)]);
        let before = base.clone();
        let _ = merge_keyword_payloads(&base, &KeywordPayload::default(), 100, 0);
        assert_eq!(base, before);
    }
}
