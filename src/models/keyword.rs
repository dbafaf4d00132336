//! Keyword candidates and their audited form.
//!
//! Oracles hand back either a flat list or a `{skills_interests, tools_platforms}`
//! object. Both shapes are kept as [`KeywordPayload`] so the output mirrors the
//! input shape, and unknown fields ride along in `extra`.

use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const SKILLS_KEY: &str = "skills_interests";
pub const TOOLS_KEY: &str = "tools_platforms";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Pass,
    Weak,
    Reject,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Pass => "pass",
            Level::Weak => "weak",
            Level::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Exact,
    Duration,
    Title,
    Context,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvidenceFeatures {
    pub support_count: u64,
    #[serde(deserialize_with = "lenient_seconds")]
    pub duration_seconds: u64,
    pub distinct_title_count: u64,
    pub example_titles: Vec<String>,
    pub context_snippet: String,
    pub evidence_types: Vec<EvidenceType>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct KeywordScores {
    pub evidence: f64,
    pub consistency: f64,
    pub baseline_overlap: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Keyword {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_weight",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<KeywordScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_weight_seconds: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Keyword {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_evidence_seconds(mut self, seconds: u64) -> Self {
        self.evidence = Some(EvidenceFeatures {
            duration_seconds: seconds,
            ..EvidenceFeatures::default()
        });
        self
    }

    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }

    pub fn weight_or_zero(&self) -> f64 {
        self.weight.filter(|w| w.is_finite()).unwrap_or(0.0)
    }

    /// Positive evidence duration, if the item carries any.
    pub fn evidence_seconds(&self) -> Option<u64> {
        self.evidence
            .as_ref()
            .map(|e| e.duration_seconds)
            .filter(|secs| *secs > 0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredKeywords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_interests: Option<Vec<Keyword>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_platforms: Option<Vec<Keyword>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredKeywords {
    pub fn new(skills: Vec<Keyword>, tools: Vec<Keyword>) -> Self {
        Self {
            skills_interests: Some(skills),
            tools_platforms: Some(tools),
            extra: Map::new(),
        }
    }

    pub fn skills(&self) -> &[Keyword] {
        self.skills_interests.as_deref().unwrap_or_default()
    }

    pub fn tools(&self) -> &[Keyword] {
        self.tools_platforms.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KeywordPayload {
    Flat(Vec<Keyword>),
    Structured(StructuredKeywords),
}

impl Default for KeywordPayload {
    fn default() -> Self {
        KeywordPayload::Flat(Vec::new())
    }
}

impl KeywordPayload {
    /// Lenient parse: malformed items are skipped instead of failing the batch.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(KeywordPayload::Flat(parse_items(items))),
            Value::Object(mut map) => {
                let skills = map.remove(SKILLS_KEY).map(parse_list);
                let tools = map.remove(TOOLS_KEY).map(parse_list);
                Ok(KeywordPayload::Structured(StructuredKeywords {
                    skills_interests: skills,
                    tools_platforms: tools,
                    extra: map,
                }))
            }
            Value::Null => Ok(KeywordPayload::default()),
            other => bail!(
                "keyword payload must be a list or an object, got {}",
                json_kind(&other)
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keyword_count() == 0
    }

    pub fn keyword_count(&self) -> usize {
        match self {
            KeywordPayload::Flat(items) => items.len(),
            KeywordPayload::Structured(s) => s.skills().len() + s.tools().len(),
        }
    }

    /// All items, skills before tools.
    pub fn flatten(&self) -> Vec<Keyword> {
        match self {
            KeywordPayload::Flat(items) => items.clone(),
            KeywordPayload::Structured(s) => {
                s.skills().iter().chain(s.tools().iter()).cloned().collect()
            }
        }
    }

    /// Like [`flatten`](Self::flatten) but fills a missing `type` with the
    /// section the item came from.
    pub fn flatten_tagged(&self) -> Vec<Keyword> {
        match self {
            KeywordPayload::Flat(items) => items.clone(),
            KeywordPayload::Structured(s) => {
                let tag = |items: &[Keyword], kind: &str| -> Vec<Keyword> {
                    items
                        .iter()
                        .cloned()
                        .map(|mut k| {
                            if k.kind.as_deref().map_or(true, str::is_empty) {
                                k.kind = Some(kind.to_string());
                            }
                            k
                        })
                        .collect()
                };
                let mut out = tag(s.skills(), "Skill (LLM)");
                out.extend(tag(s.tools(), "Tool (LLM)"));
                out
            }
        }
    }

    /// Non-empty trimmed names in payload order.
    pub fn names(&self) -> Vec<String> {
        self.flatten()
            .iter()
            .map(|k| k.trimmed_name().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

fn parse_list(value: Value) -> Vec<Keyword> {
    match value {
        Value::Array(items) => parse_items(items),
        Value::Null => Vec::new(),
        other => {
            warn!("ignoring keyword section of type {}", json_kind(&other));
            Vec::new()
        }
    }
}

fn parse_items(items: Vec<Value>) -> Vec<Keyword> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Keyword>(item) {
            Ok(keyword) => Some(keyword),
            Err(err) => {
                warn!("skipping malformed keyword item: {err}");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_weight<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value))
}

fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value)
        .map(|v| v.max(0.0).trunc() as u64)
        .unwrap_or(0))
}
