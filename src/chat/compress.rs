//! Turns a noisy conversation dump into a bounded excerpt: the highest-signal
//! lines in document order plus a few fenced code blocks.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const MAX_LINE_OCCURRENCES: usize = 2;

static CRLF_RE: OnceLock<Regex> = OnceLock::new();
static SPACES_RE: OnceLock<Regex> = OnceLock::new();
static BLANKS_RE: OnceLock<Regex> = OnceLock::new();
static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static CLI_RE: OnceLock<Regex> = OnceLock::new();
static EXT_RE: OnceLock<Regex> = OnceLock::new();
static CODE_RE: OnceLock<Regex> = OnceLock::new();
static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"(?s)```.*?```").unwrap())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChatCompression {
    pub max_chars: usize,
    pub max_code_blocks: usize,
    pub max_code_block_chars: usize,
    pub max_lines: usize,
}

impl Default for ChatCompression {
    fn default() -> Self {
        Self {
            max_chars: 6000,
            max_code_blocks: 6,
            max_code_block_chars: 800,
            max_lines: 220,
        }
    }
}

fn normalize(text: &str) -> String {
    let crlf = CRLF_RE.get_or_init(|| Regex::new(r"\r\n?").unwrap());
    let spaces = SPACES_RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap());
    let blanks = BLANKS_RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap());

    let text = crlf.replace_all(text, "\n");
    let text = spaces.replace_all(&text, " ");
    let text = blanks.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn take_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn extract_code_blocks(text: &str, max_blocks: usize, max_block_chars: usize) -> Vec<String> {
    fence_re()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|block| !block.is_empty())
        .take(max_blocks)
        .map(|block| take_chars(block, max_block_chars))
        .collect()
}

/// Keeps at most `max_occurrences` copies of each line.
fn dedupe_lines(lines: Vec<String>, max_occurrences: usize) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let count = seen.entry(line.clone()).or_insert(0);
        if *count >= max_occurrences {
            continue;
        }
        *count += 1;
        out.push(line);
    }
    out
}

pub fn score_line(line: &str) -> f64 {
    if line.is_empty() {
        return 0.0;
    }
    let cli = CLI_RE.get_or_init(|| {
        Regex::new(r"\b(pip|npm|pnpm|yarn|conda|docker|kubectl|git)\b").unwrap()
    });
    let ext = EXT_RE.get_or_init(|| {
        Regex::new(r"\b(py|ts|tsx|js|json|yaml|yml|toml|sql|md)\b").unwrap()
    });
    let code = CODE_RE.get_or_init(|| {
        Regex::new(r"\b(import|def|class|return|const|function|SELECT|UPDATE|INSERT)\b").unwrap()
    });
    let separator = SEPARATOR_RE.get_or_init(|| Regex::new(r"^[-=_]{6,}$").unwrap());

    let lower = line.to_lowercase();
    let mut score = 0.0;
    if ["traceback", "exception", "error", "failed"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        score += 3.0;
    }
    if lower.contains("http://") || lower.contains("https://") {
        score += 2.0;
    }
    if cli.is_match(&lower) {
        score += 2.0;
    }
    if ext.is_match(&lower) {
        score += 1.0;
    }
    if code.is_match(line) {
        score += 1.5;
    }
    let length = line.chars().count();
    if length >= 40 {
        score += 0.5;
    }
    if length >= 120 {
        score += 0.5;
    }
    if separator.is_match(line.trim()) {
        score -= 1.0;
    }
    score
}

/// Greedy pick under a character budget. Lines that would overflow are
/// skipped so shorter lines further down the ranking still fit.
fn pick_key_lines(lines: &[String], max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut scored: Vec<(usize, f64, &String)> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx, score_line(line), line))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.2.chars().count().cmp(&a.2.chars().count()))
            .then_with(|| a.2.to_lowercase().cmp(&b.2.to_lowercase()))
    });

    let mut picked: Vec<(usize, &String)> = Vec::new();
    let mut total = 0usize;
    for (idx, score, line) in scored {
        if score <= 0.0 || picked.len() >= max_lines {
            break;
        }
        let add_len = line.chars().count() + 1;
        if total + add_len > max_chars {
            continue;
        }
        picked.push((idx, line));
        total += add_len;
    }

    picked.sort_by_key(|(idx, _)| *idx);
    picked.into_iter().map(|(_, line)| line.clone()).collect()
}

fn fallback_lines(lines: &[String], max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut total = 0usize;
    for line in lines.iter().take(max_lines) {
        let add_len = line.chars().count() + 1;
        if total + add_len > max_chars {
            break;
        }
        out.push(line.clone());
        total += add_len;
    }
    out
}

pub fn compress_chat_text(text: &str, options: &ChatCompression) -> String {
    let text = normalize(text);
    if text.is_empty() {
        return String::new();
    }

    let code_blocks =
        extract_code_blocks(&text, options.max_code_blocks, options.max_code_block_chars);
    let without_code = fence_re().replace_all(&text, "\n");
    let lines: Vec<String> = without_code
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let lines = dedupe_lines(lines, MAX_LINE_OCCURRENCES);

    let picked = pick_key_lines(&lines, options.max_chars, options.max_lines);

    let mut parts: Vec<String> = Vec::new();
    if picked.is_empty() {
        let fallback = fallback_lines(&lines, options.max_chars, options.max_lines);
        if !fallback.is_empty() {
            parts.push("TEXT:".to_string());
            parts.extend(fallback);
        }
    } else {
        parts.push("KEY LINES:".to_string());
        parts.extend(picked);
    }

    if !code_blocks.is_empty() {
        parts.push(String::new());
        parts.push("CODE BLOCKS:".to_string());
        parts.extend(code_blocks);
    }

    let out = parts.join("\n");
    let out = out.trim();
    if out.chars().count() > options.max_chars {
        take_chars(out, options.max_chars).trim_end().to_string()
    } else {
        out.to_string()
    }
}
