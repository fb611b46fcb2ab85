//! Loosely-typed view over an inbound tracker payload.
//!
//! The tracker's schema is not trusted. Every accessor is a probe that walks
//! an optional path and yields `None` when any step is absent or has the
//! wrong type.

use serde_json::Value;

/// Candidate paths for the comment text carrying a join marker.
const COMMENT_BODY_PATHS: &[&[&str]] = &[&["data", "comment", "body"], &["data", "body"]];

/// Candidate paths for the assignee identity, in priority order.
const ASSIGNEE_PATHS: &[&[&str]] = &[
    &["data", "issue", "assignee", "email"],
    &["data", "assignee", "email"],
    &["data", "issue", "assigneeId"],
];

/// Top-level fields that may name the event type.
const EVENT_TYPE_FIELDS: &[&str] = &["type", "action", "event"];

/// A parsed webhook payload.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    raw: Value,
}

impl InboundEvent {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self::new)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Value at `path`, if every step exists.
    pub fn at(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.raw, |node, key| node.get(*key))
    }

    /// String at `path`, if present and a string.
    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.at(path).and_then(Value::as_str)
    }

    /// Comment text from the first candidate path holding a non-empty string.
    pub fn comment_body(&self) -> Option<&str> {
        COMMENT_BODY_PATHS
            .iter()
            .find_map(|p| self.str_at(p).filter(|s| !s.is_empty()))
    }

    /// Assignee identity candidates, in priority order. Non-string values are
    /// skipped.
    pub fn assignee_candidates(&self) -> impl Iterator<Item = &str> + '_ {
        ASSIGNEE_PATHS.iter().filter_map(|p| self.str_at(p))
    }

    /// The issue object: `data.issue` when present, else `data`.
    pub fn issue(&self) -> Option<&Value> {
        self.at(&["data", "issue"])
            .filter(|v| !v.is_null())
            .or_else(|| self.at(&["data"]))
    }

    /// Event type tag, or `"unknown"`.
    pub fn event_type(&self) -> &str {
        EVENT_TYPE_FIELDS
            .iter()
            .find_map(|f| {
                self.raw
                    .get(*f)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("unknown")
    }
}
