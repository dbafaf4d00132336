use std::sync::OnceLock;

use regex::Regex;

static REPLACEMENTS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

fn replacements() -> &'static [(Regex, &'static str)] {
    REPLACEMENTS.get_or_init(|| {
        [
            (
                r"(?is)-----BEGIN [A-Z ]+ PRIVATE KEY-----.+?-----END [A-Z ]+ PRIVATE KEY-----",
                "[PRIVATE_KEY_REDACTED]",
            ),
            (r"sk-[A-Za-z0-9]{20,}", "sk-[REDACTED]"),
            (r"(?i)bearer\s+[A-Za-z0-9\-._~+/]+=*", "Bearer [REDACTED]"),
            (
                r"eyJ[A-Za-z0-9_\-]{20,}\.[A-Za-z0-9_\-]{20,}\.[A-Za-z0-9_\-]{10,}",
                "[JWT_REDACTED]",
            ),
            (r"AKIA[0-9A-Z]{16}", "AKIA[REDACTED]"),
            (
                r#"(?i)(api[_-]?key\s*[:=]\s*)['"]?[A-Za-z0-9\-_=]{12,}['"]?"#,
                "${1}[REDACTED]",
            ),
            (
                r#"(?i)(secret\s*[:=]\s*)['"]?[A-Za-z0-9\-_=]{12,}['"]?"#,
                "${1}[REDACTED]",
            ),
            (
                r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
                "[EMAIL_REDACTED]",
            ),
            (r"\b1\d{10}\b", "[MOBILE_REDACTED]"),
            (r"\b\d{17}[0-9Xx]\b", "[ID_REDACTED]"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
        .collect()
    })
}

/// Mask credentials and personal identifiers in chat text before it is
/// compressed or handed to an oracle.
pub fn redact_sensitive(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in replacements() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}
