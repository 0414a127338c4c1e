//! Named extraction rules for pulling values out of backend responses.
//!
//! The backend's "succeeded" payload is not stable across API versions: the
//! video URL may live under `content.video_url`, `content.video`, or at the
//! top level. Rules are tried in order and the first non-empty string wins.

use serde_json::Value;

/// A JSON path (object keys only) with a name for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub path: &'static [&'static str],
}

impl ExtractionRule {
    pub fn apply<'a>(&self, value: &'a Value) -> Option<&'a str> {
        let mut cur = value;
        for key in self.path {
            cur = cur.get(key)?;
        }
        cur.as_str().filter(|s| !s.trim().is_empty())
    }
}

/// Precedence order for the artifact reference of a finished job.
pub const VIDEO_URL_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "content.video_url",
        path: &["content", "video_url"],
    },
    ExtractionRule {
        name: "content.video",
        path: &["content", "video"],
    },
    ExtractionRule {
        name: "video_url",
        path: &["video_url"],
    },
];

/// A value found by a rule, plus which rule found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub rule: &'static str,
    pub value: String,
}

/// First match wins.
pub fn first_match(rules: &[ExtractionRule], value: &Value) -> Option<Extracted> {
    rules.iter().find_map(|rule| {
        rule.apply(value).map(|found| Extracted {
            rule: rule.name,
            value: found.to_string(),
        })
    })
}

pub fn resolve_video_url(response: &Value) -> Option<Extracted> {
    first_match(VIDEO_URL_RULES, response)
}

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Error text of a failed job: a plain string, an object's `message`, or the
/// object itself as JSON. Defaults to "Unknown error".
pub fn remote_error_text(response: &Value) -> String {
    match response.get("error") {
        None | Some(Value::Null) => UNKNOWN_ERROR.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => UNKNOWN_ERROR.to_string(),
        Some(obj @ Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
            Some(msg) if !msg.trim().is_empty() => match map.get("code").and_then(Value::as_str) {
                Some(code) => format!("{code}: {msg}"),
                None => msg.to_string(),
            },
            _ => obj.to_string(),
        },
        Some(other) => other.to_string(),
    }
}
