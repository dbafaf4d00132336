//! Frequency-based baseline: the tokens that dominate the snapshot's titles,
//! used as a plausibility reference and as the fallback candidate source.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::models::CompressedSnapshot;

pub const DEFAULT_BASELINE_LIMIT: usize = 50;
pub const DEFAULT_CHAT_TOKEN_WEIGHT: f64 = 0.4;
pub const MAX_CHAT_TOKEN_WEIGHT: f64 = 5.0;

const WEB_TITLE_WEIGHT: f64 = 1.0;
const WINDOW_TITLE_WEIGHT: f64 = 0.6;
const AUDIO_TITLE_WEIGHT: f64 = 0.4;

pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "you", "your", "are", "how", "what", "why",
    "when", "where", "use", "using", "into", "over", "new", "教程", "下载", "官网", "登录", "注册",
    "配置", "安装", "使用", "指南", "文档",
];

static SPLIT_RE: OnceLock<Regex> = OnceLock::new();

/// Lowercased runs of ASCII alphanumerics and CJK ideographs.
pub fn tokenize(text: &str) -> Vec<String> {
    let split = SPLIT_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9\x{4e00}-\x{9fa5}]+").unwrap());
    split
        .split(text)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_signal_token(token: &str) -> bool {
    token.chars().count() > 1 && !STOPWORDS.contains(&token)
}

/// Weighted token counts over every title source in the snapshot.
pub fn token_weights(snapshot: &CompressedSnapshot, chat_weight: f64) -> HashMap<String, f64> {
    let chat_weight = if chat_weight.is_finite() {
        chat_weight.clamp(0.0, MAX_CHAT_TOKEN_WEIGHT)
    } else {
        DEFAULT_CHAT_TOKEN_WEIGHT
    };
    let mut counter: HashMap<String, f64> = HashMap::new();
    let mut add = |text: &str, weight: f64| {
        for token in tokenize(text) {
            if is_signal_token(&token) {
                *counter.entry(token).or_insert(0.0) += weight;
            }
        }
    };

    for stats in snapshot.web.values() {
        for title in stats.title_freq.keys() {
            add(title, WEB_TITLE_WEIGHT);
        }
    }
    for sample in &snapshot.non_web_samples.window {
        for title in &sample.titles {
            add(title, WINDOW_TITLE_WEIGHT);
        }
    }
    for sample in &snapshot.non_web_samples.audio {
        add(&sample.title, AUDIO_TITLE_WEIGHT);
    }
    for session in &snapshot.chat_sessions {
        add(&session.compressed_text, chat_weight);
    }
    counter
}

/// Top `limit` tokens by descending weight, ties by token.
pub fn ranked_tokens(snapshot: &CompressedSnapshot, limit: usize, chat_weight: f64) -> Vec<(String, f64)> {
    let mut items: Vec<(String, f64)> = token_weights(snapshot, chat_weight).into_iter().collect();
    items.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    items.truncate(limit);
    items
}

pub fn build_baseline(snapshot: &CompressedSnapshot, limit: usize) -> BTreeSet<String> {
    build_baseline_with_weight(snapshot, limit, DEFAULT_CHAT_TOKEN_WEIGHT)
}

pub fn build_baseline_with_weight(
    snapshot: &CompressedSnapshot,
    limit: usize,
    chat_weight: f64,
) -> BTreeSet<String> {
    ranked_tokens(snapshot, limit, chat_weight)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

/// 1.0 when the normalized candidate is itself a baseline token.
pub fn compute_overlap(candidate: &str, baseline: &BTreeSet<String>) -> f64 {
    let key = candidate.trim().to_lowercase();
    if !key.is_empty() && baseline.contains(&key) {
        1.0
    } else {
        0.0
    }
}
