//! Title and URL normalisation shared by the compressor and the segmentation
//! engine's signatures.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::rules::{MAX_TITLE_CHARS, TITLE_SUFFIXES, TRUNCATION_REPAIRS, URL_FILE_EXTENSIONS};

static NOTIFICATION_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();
static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static PASSWORD_RE: OnceLock<Regex> = OnceLock::new();

fn notification_re() -> &'static Regex {
    NOTIFICATION_RE.get_or_init(|| Regex::new(r"^\(\d+\+?\)\s*").unwrap())
}

/// Mask e-mails, mobile numbers, bearer/API tokens and inline passwords.
pub fn redact_title_pii(title: &str) -> String {
    let email = EMAIL_RE.get_or_init(|| Regex::new(r"\b[\w.-]+@[\w.-]+\.\w+\b").unwrap());
    let phone = PHONE_RE.get_or_init(|| Regex::new(r"\b1[3-9]\d{9}\b").unwrap());
    let token = TOKEN_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(Bearer|Token|API[_-]?Key)[:\s]+[\w-]{20,}\b").unwrap()
    });
    let password =
        PASSWORD_RE.get_or_init(|| Regex::new(r"(?i)\bpassword[:\s]+\S+").unwrap());

    let out = email.replace_all(title, "***@***.***");
    let out = phone.replace_all(&out, "***********");
    let out = token.replace_all(&out, "***");
    password.replace_all(&out, "***").into_owned()
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    if text.len() < suffix.len() {
        return false;
    }
    let start = text.len() - suffix.len();
    text.is_char_boundary(start) && text[start..].eq_ignore_ascii_case(suffix)
}

/// Restore suffixes a collector clipped mid-word.
pub fn repair_truncation(title: &str) -> String {
    for (clipped, full) in TRUNCATION_REPAIRS {
        if title.ends_with(clipped) {
            let stem = &title[..title.len() - clipped.len()];
            return format!("{stem}{full}");
        }
    }
    title.to_string()
}

pub fn strip_suffixes(title: &str) -> String {
    let mut out = title.to_string();
    for suffix in TITLE_SUFFIXES {
        if ends_with_ignore_case(&out, suffix) {
            out.truncate(out.len() - suffix.len());
        }
    }
    out
}

/// Character-based cap; overlong titles end in "...".
pub fn cap_length(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = title.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn clean_title(title: &str) -> String {
    clean_title_with_limit(title, MAX_TITLE_CHARS)
}

pub fn clean_title_with_limit(title: &str, max_chars: usize) -> String {
    if title.is_empty() {
        return String::new();
    }
    let out = notification_re().replace(title, "");
    let out = redact_title_pii(&out);
    let out = repair_truncation(&out);
    let out = strip_suffixes(&out);
    cap_length(&out, max_chars).trim().to_string()
}

/// Drop query and fragment and a trailing download extension. Unparseable
/// input comes back unchanged.
pub fn clean_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    let lower = path.to_lowercase();
    if let Some(ext) = URL_FILE_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext)) {
        let trimmed = &path[..path.len() - ext.len()];
        parsed.set_path(trimmed);
    }
    parsed.to_string()
}

/// Lowercased host (with port when present). Input without a parseable
/// host, including scheme-less paths, maps to an empty domain.
pub fn extract_domain(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            match parsed.port() {
                Some(port) if !host.is_empty() => format!("{host}:{port}"),
                _ => host,
            }
        }
        Err(_) => String::new(),
    }
}
