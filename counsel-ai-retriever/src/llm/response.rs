//! Interpretation of raw model output.
//!
//! Analysis prompts ask the model for JSON, but models wrap it in prose or
//! code fences often enough that the raw text has to be searched for an
//! embedded object. That extraction lives here and nowhere else; callers see
//! either a parsed [`serde_json::Value`] or the raw text, never a parse
//! failure.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// A model reply, structured when a JSON object could be extracted.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmReply {
    /// A JSON object found in the reply
    Structured(Value),
    /// The reply as-is, when no parseable object was found
    Raw(String),
}

impl LlmReply {
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Greedy across newlines: first '{' to last '}'.
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Interpret raw model output, preferring an embedded JSON object.
pub fn parse_reply(raw: &str) -> LlmReply {
    if let Some(found) = json_object_pattern().find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
            if value.is_object() {
                return LlmReply::Structured(value);
            }
        }
    }
    LlmReply::Raw(raw.to_string())
}
