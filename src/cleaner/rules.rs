//! Static cleaning tables and the noise/low-value predicates built on them.

use serde::{Deserialize, Serialize};

/// Window and audio samples shorter than this are dropped.
pub const MIN_EVENT_SECONDS: i64 = 10;
pub const MAX_TITLE_CHARS: usize = 150;
pub const TITLE_SAMPLE_CAP: usize = 3;
pub const WINDOW_TITLE_CAP: usize = 20;
pub const AUDIO_TOP_N: usize = 5;

/// Download-style extensions stripped from URL paths before domain grouping.
pub const URL_FILE_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".tar", ".gz",
    ".jpg", ".png", ".gif", ".mp4", ".mp3",
];

pub const APP_BLACKLIST: &[&str] = &[
    "explorer.exe",
    "applicationframehost.exe",
    "systemsettings.exe",
    "lockapp.exe",
    "searchui.exe",
    "shellexperiencehost.exe",
    "textinputhost.exe",
    "zoom.exe",
    "teams.exe",
    "slack.exe",
    "wechat.exe",
    "cmd.exe",
    "powershell.exe",
    "conhost.exe",
    "taskmgr.exe",
    "svchost.exe",
    "runtimebroker.exe",
    "searchhost.exe",
    "startmenuexperiencehost.exe",
    "csrss.exe",
    "wmiprvse.exe",
    "sihost.exe",
    "ctfmon.exe",
    "smartscreen.exe",
];

pub const TITLE_BLACKLIST: &[&str] = &[
    "new tab",
    "untitled",
    "loading",
    "home",
    "settings",
    "downloads",
    "program manager",
    "start",
    "search",
    "task switching",
    "notification center",
    "volume control",
    "network flyout",
    "input indicator",
    "clock flyout",
    "action center",
    "battery flyout",
    "calendar flyout",
    "desktop",
];

/// Single-character titles that still carry meaning.
pub const SINGLE_CHAR_ALLOWED: &[&str] = &["c", "r", "v"];

/// Browser/app suffixes, matched case-insensitively and removed in order.
pub const TITLE_SUFFIXES: &[&str] = &[
    " - Google Chrome",
    " - Microsoft Edge",
    " - Mozilla Firefox",
    " - Visual Studio Code",
    " - Visual Studio",
    " - PyCharm",
    " - IntelliJ IDEA",
    " - Notepad++",
    " - 记事本",
    " - Word",
    " - Excel",
    " - PowerPoint",
    " - Outlook",
    " - OneNote",
    " - Teams",
    " - Slack",
    " - Zoom",
    " - Discord",
    " - Spotify",
    " - 网易云音乐",
    " - QQ音乐",
    " - 微信",
    " - 飞书",
    " - 钉钉",
    " - 知乎",
    " - 豆瓣",
    " - 简书",
    " - 掘金",
    " - GitHub",
    " - Stack Overflow",
    " - CSDN博客",
    " - 博客园",
    " - 哔哩哔哩_bilibili",
    " - YouTube",
    " - Wikipedia",
    " - 百度百科",
];

/// Phrases that collectors clip at a fixed width, mapped back to their full form
/// so the suffix table can still recognise them.
pub const TRUNCATION_REPAIRS: &[(&str, &str)] = &[
    (" - Google Chrom", " - Google Chrome"),
    (" - Microsoft Edg", " - Microsoft Edge"),
    (" - Mozilla Firefo", " - Mozilla Firefox"),
    (" - Visual Studio Cod", " - Visual Studio Code"),
    (" - Stack Overflo", " - Stack Overflow"),
    (" - 哔哩哔哩_bilibil", " - 哔哩哔哩_bilibili"),
];

/// Extensions of files whose window titles say nothing about the work itself.
pub const LOW_VALUE_EXTENSIONS: &[&str] = &[
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "config", "env", "properties", "plist",
    "xml", "log", "lock", "css", "scss", "sass", "less", "map",
];

pub const LOW_VALUE_KEYWORDS: &[&str] = &[
    "readme",
    "license",
    "changelog",
    "package-lock",
    "yarn.lock",
    "pnpm-lock",
    "cargo.lock",
    "poetry.lock",
    "dockerfile",
    "makefile",
    "gitignore",
    "settings",
    "preferences",
    "configuration",
];

pub const DEFAULT_AI_DOMAINS: &[&str] = &[
    "chatgpt.com",
    "chat.openai.com",
    "claude.ai",
    "gemini.google.com",
    "copilot.microsoft.com",
    "poe.com",
    "perplexity.ai",
    "chat.deepseek.com",
    "kimi.moonshot.cn",
    "yiyan.baidu.com",
    "tongyi.aliyun.com",
    "chatglm.cn",
    "doubao.com",
];

pub const DEFAULT_AI_DOMAIN_SUFFIXES: &[&str] = &["*.openai.com", "*.chatgpt.com", "*.claude.ai"];

/// Chat-assistant domains whose page titles are replaced by a synthetic marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiDomainRule {
    pub ai_domains: Vec<String>,
    /// `*.example.com` style patterns.
    pub ai_domain_suffixes: Vec<String>,
}

impl Default for AiDomainRule {
    fn default() -> Self {
        Self {
            ai_domains: DEFAULT_AI_DOMAINS.iter().map(|d| d.to_string()).collect(),
            ai_domain_suffixes: DEFAULT_AI_DOMAIN_SUFFIXES
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl AiDomainRule {
    pub fn matches(&self, domain: &str) -> bool {
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        if self
            .ai_domains
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(&domain))
        {
            return true;
        }
        self.ai_domain_suffixes.iter().any(|pattern| {
            let suffix = pattern.trim().trim_start_matches('*').to_ascii_lowercase();
            let suffix = if suffix.starts_with('.') {
                suffix
            } else {
                format!(".{suffix}")
            };
            suffix.len() > 1 && domain.ends_with(&suffix)
        })
    }

    pub fn masked_title(domain: &str) -> String {
        format!("AI Assistance Session ({domain})")
    }
}

pub fn is_noise_app(app: &str) -> bool {
    let name = app.trim().to_lowercase();
    !name.is_empty() && APP_BLACKLIST.contains(&name.as_str())
}

/// UI chrome, bare integers and stray single characters.
pub fn is_noise_title(title: &str) -> bool {
    let name = title.trim().to_lowercase();
    if name.is_empty() {
        return false;
    }
    if TITLE_BLACKLIST.contains(&name.as_str()) {
        return true;
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    name.chars().count() < 2 && !SINGLE_CHAR_ALLOWED.contains(&name.as_str())
}

/// Config files, logs, lockfiles and project boilerplate. Markdown only counts
/// when it is a README.
pub fn is_low_value_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    if lower.is_empty() {
        return true;
    }

    let file_part = lower.split(" - ").next().unwrap_or(&lower).trim();
    if let Some((stem, ext)) = file_part.rsplit_once('.') {
        let looks_like_ext =
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric());
        if looks_like_ext {
            if ext == "md" {
                return stem.contains("readme");
            }
            if LOW_VALUE_EXTENSIONS.contains(&ext) {
                return true;
            }
        }
    }

    LOW_VALUE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_titles() {
        assert!(is_noise_title("New Tab"));
        assert!(is_noise_title("12345"));
        assert!(is_noise_title("x"));
        assert!(!is_noise_title("c"));
        assert!(!is_noise_title("R"));
        assert!(!is_noise_title(""));
        assert!(!is_noise_title("main.rs"));
    }

    #[test]
    fn noise_apps_are_case_insensitive() {
        assert!(is_noise_app("Explorer.EXE"));
        assert!(!is_noise_app("Code.exe"));
        assert!(!is_noise_app(""));
    }

    #[test]
    fn low_value_markdown_only_for_readme() {
        assert!(is_low_value_title("README.md - project"));
        assert!(!is_low_value_title("TODO.md - project"));
        assert!(!is_low_value_title("design-notes.md"));
    }

    #[test]
    fn low_value_extensions_and_keywords() {
        assert!(is_low_value_title("tsconfig.json - web"));
        assert!(is_low_value_title("server.log"));
        assert!(is_low_value_title("Cargo.lock - jobinsight"));
        assert!(is_low_value_title("Dockerfile - MyProject"));
        assert!(is_low_value_title(".gitignore"));
        assert!(is_low_value_title("Editor Preferences"));
        assert!(!is_low_value_title("main.py - MyProject"));
        assert!(!is_low_value_title("lib.rs - jobinsight"));
    }

    #[test]
    fn ai_domain_rule_exact_and_suffix() {
        let rule = AiDomainRule::default();
        assert!(rule.matches("chatgpt.com"));
        assert!(rule.matches("Claude.AI"));
        assert!(rule.matches("platform.openai.com"));
        assert!(!rule.matches("openai.com.evil.net"));
        assert!(!rule.matches("docs.python.org"));
        assert!(!rule.matches(""));
    }

    #[test]
    fn suffix_pattern_without_star_still_matches_subdomains() {
        let rule = AiDomainRule {
            ai_domains: vec![],
            ai_domain_suffixes: vec!["example.ai".into()],
        };
        assert!(rule.matches("chat.example.ai"));
        assert!(!rule.matches("notexample.ai"));
    }
}
