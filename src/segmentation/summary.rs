use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::tokenize;
use crate::analysis::baseline::STOPWORDS;
use crate::cleaner::{clean_title, clean_url};
use crate::models::{CompressedSnapshot, RawEvent};

const TOP_N: usize = 3;

/// Headline view of one segment for a human reviewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SegmentSummary {
    pub top_apps: Vec<String>,
    pub top_web: Vec<String>,
    pub tags: Vec<String>,
}

fn minutes_label(name: &str, seconds: i64) -> String {
    format!("{name} ({}m)", (seconds / 60).max(1))
}

/// Top apps by window time, top domains by active time, and the most
/// frequent title tokens (web titles weighted by their counts).
pub fn summarize_segment(snapshot: &CompressedSnapshot) -> SegmentSummary {
    let top_apps = snapshot
        .non_web_samples
        .window
        .iter()
        .take(TOP_N)
        .map(|sample| minutes_label(&sample.app, sample.duration))
        .collect();

    let mut domains: Vec<(&String, i64)> = snapshot
        .web
        .iter()
        .map(|(domain, stats)| (domain, stats.active_seconds))
        .collect();
    domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_web = domains
        .into_iter()
        .take(TOP_N)
        .map(|(domain, secs)| minutes_label(domain, secs))
        .collect();

    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut add = |title: &str, weight: u64| {
        for token in tokenize(title) {
            if token.chars().count() > 1 && !STOPWORDS.contains(&token.as_str()) {
                *counts.entry(token).or_insert(0) += weight;
            }
        }
    };
    for stats in snapshot.web.values() {
        for (title, count) in &stats.title_freq {
            add(title, (*count).max(1));
        }
    }
    for sample in &snapshot.non_web_samples.window {
        for title in &sample.titles {
            add(title, 1);
        }
    }
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let tags = ranked.into_iter().take(TOP_N).map(|(token, _)| token).collect();

    SegmentSummary {
        top_apps,
        top_web,
        tags,
    }
}

/// `ts | type=.. | dur=..s | app=.. | url=.. | title=.. | status=..`, empty
/// parts omitted.
pub fn format_event_line(event: &RawEvent) -> String {
    let mut parts = vec![
        event.timestamp.to_rfc3339(),
        format!("type={}", event.event_type.as_str()),
        format!("dur={}s", event.duration_secs),
    ];
    if !event.app.is_empty() {
        parts.push(format!("app={}", clean_title(&event.app)));
    }
    if !event.url.is_empty() {
        parts.push(format!("url={}", clean_url(&event.url)));
    }
    if !event.title.is_empty() {
        parts.push(format!("title={}", clean_title(&event.title)));
    }
    if !event.status.is_empty() {
        parts.push(format!("status={}", event.status));
    }
    parts.join(" | ")
}
