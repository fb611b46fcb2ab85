//! Event classification.
//!
//! Classification runs an ordered list of shape probes and takes the first
//! match. Join detection precedes assignment detection, so a payload that
//! satisfies both is treated as a join.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::payload::InboundEvent;

/// Marker that opens a worker registration comment.
pub const JOIN_MARKER: &str = "APEX_JOIN";

/// A worker registration parsed from a marker comment.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDeclaration {
    /// Email as written in the declaration (not yet normalized).
    pub email: String,
    pub name: Option<String>,
    pub domains: Vec<String>,
    pub endpoint: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    /// The declaration exactly as posted, announced to the coordinator.
    pub raw: Value,
}

/// Issue fields forwarded to a worker. Absent fields are omitted; fields
/// present as `null` are forwarded as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
}

impl IssueRef {
    fn from_value(issue: Option<&Value>) -> Self {
        let field = |name: &str| issue.and_then(|i| i.get(name)).cloned();
        Self {
            id: field("id"),
            identifier: field("identifier"),
            title: field("title"),
            url: field("url"),
        }
    }
}

/// An assignment event awaiting a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCandidate {
    pub assignee_email: String,
    pub issue: IssueRef,
    pub event_type: String,
}

/// Which shape an inbound event matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Join(JoinDeclaration),
    Assignment(AssignmentCandidate),
    Unhandled,
}

type Probe = fn(&InboundEvent) -> Option<Classification>;

/// Shape probes in precedence order.
const PROBES: &[(&str, Probe)] = &[("join", probe_join), ("assignment", probe_assignment)];

/// Classify an event by running the probes in order.
pub fn classify(event: &InboundEvent) -> Classification {
    PROBES
        .iter()
        .find_map(|(name, probe)| {
            let matched = probe(event);
            debug!(probe = *name, matched = matched.is_some(), "Shape probe");
            matched
        })
        .unwrap_or(Classification::Unhandled)
}

fn probe_join(event: &InboundEvent) -> Option<Classification> {
    event
        .comment_body()
        .and_then(parse_join_comment)
        .map(Classification::Join)
}

fn probe_assignment(event: &InboundEvent) -> Option<Classification> {
    let email = event.assignee_candidates().find(|c| c.contains('@'))?;
    Some(Classification::Assignment(AssignmentCandidate {
        assignee_email: email.to_string(),
        issue: IssueRef::from_value(event.issue()),
        event_type: event.event_type().to_string(),
    }))
}

/// Parse `APEX_JOIN {json}` comment text.
///
/// Returns `None` when the marker is missing, the trailing JSON is invalid,
/// or the declaration has no usable email.
pub fn parse_join_comment(text: &str) -> Option<JoinDeclaration> {
    let rest = text.trim().strip_prefix(JOIN_MARKER)?.trim();
    let raw: Value = serde_json::from_str(rest).ok()?;

    let email = raw
        .get("email")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())?
        .to_string();

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .map(String::from);

    let domains = raw
        .get("domains")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let endpoint = raw
        .get("endpoint")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .map(String::from);

    let headers = raw.get("headers").and_then(Value::as_object).map(|obj| {
        obj.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    });

    Some(JoinDeclaration {
        email,
        name,
        domains,
        endpoint,
        headers,
        raw,
    })
}
