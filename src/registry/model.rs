//! Worker registry data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role assigned to self-registered workers.
pub const ROLE_WORKER: &str = "worker";

/// Provenance tag for workers registered through a tracker comment.
pub const SOURCE_LINEAR_JOIN: &str = "linear:APEX_JOIN";

/// Normalize an email for storage and matching: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registered worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    /// Normalized email, the identity key.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Free-form capability tags.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Callback target for forwarded events.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Extra HTTP headers sent when forwarding.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Fields written by other tools; kept as-is across upserts.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerRecord {
    /// Whether this record belongs to `email` (case and whitespace insensitive).
    pub fn matches(&self, email: &str) -> bool {
        let target = normalize_email(email);
        !target.is_empty() && normalize_email(&self.email) == target
    }
}

/// The persisted registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub workers: Vec<WorkerRecord>,
}

/// Fields supplied by a registration. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct WorkerUpsert {
    pub email: String,
    pub name: Option<String>,
    pub domains: Option<Vec<String>>,
    /// `Some(None)` clears the endpoint.
    pub endpoint: Option<Option<String>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub role: Option<String>,
    pub source: Option<String>,
}

impl WorkerUpsert {
    /// Build a fresh record from this upsert.
    pub(crate) fn into_record(self, email: String, now: DateTime<Utc>) -> WorkerRecord {
        WorkerRecord {
            name: self.name.unwrap_or_else(|| email.clone()),
            email,
            domains: self.domains.unwrap_or_default(),
            endpoint: self.endpoint.flatten(),
            headers: self.headers.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Merge this upsert over an existing record, keeping `created_at`.
    pub(crate) fn apply_to(self, record: &mut WorkerRecord, email: String, now: DateTime<Utc>) {
        record.email = email;
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(domains) = self.domains {
            record.domains = domains;
        }
        if let Some(endpoint) = self.endpoint {
            record.endpoint = endpoint;
        }
        if let Some(headers) = self.headers {
            record.headers = headers;
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(source) = self.source {
            record.source = source;
        }
        record.updated_at = now;
    }
}
