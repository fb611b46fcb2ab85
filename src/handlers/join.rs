//! Worker registration from `APEX_JOIN` comments.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::RegistryError;
use crate::notify::Notifier;
use crate::registry::{ROLE_WORKER, SOURCE_LINEAR_JOIN, UpsertOutcome, WorkerRegistry, WorkerUpsert};
use crate::webhook::JoinDeclaration;

/// Kind tag announced to the coordinator.
pub const WORKER_JOINED: &str = "apex.worker.joined";

/// Announcement sent to the coordinator after a join.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJoined<'a> {
    pub kind: &'static str,
    /// The declaration exactly as posted.
    pub worker: &'a Value,
    pub workers_count: usize,
}

/// Registers workers and announces them to the coordinator.
pub struct JoinHandler {
    registry: Arc<WorkerRegistry>,
    notifier: Notifier,
    coordinator_endpoint: Option<String>,
}

impl JoinHandler {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        notifier: Notifier,
        coordinator_endpoint: Option<String>,
    ) -> Self {
        Self {
            registry,
            notifier,
            coordinator_endpoint,
        }
    }

    /// Upsert the declared worker, then announce it.
    ///
    /// The announcement is best-effort: its failure is logged and does not
    /// affect the returned outcome.
    pub async fn handle(&self, decl: JoinDeclaration) -> Result<UpsertOutcome, RegistryError> {
        let upsert = WorkerUpsert {
            name: Some(decl.name.clone().unwrap_or_else(|| decl.email.clone())),
            email: decl.email.clone(),
            domains: Some(decl.domains.clone()),
            endpoint: Some(decl.endpoint.clone()),
            headers: decl.headers.clone(),
            role: Some(ROLE_WORKER.to_string()),
            source: Some(SOURCE_LINEAR_JOIN.to_string()),
        };
        let outcome = self.registry.upsert(upsert).await?;

        info!(
            email = %outcome.record.email,
            endpoint = ?outcome.record.endpoint,
            created = outcome.created,
            "Worker joined"
        );

        if let Some(url) = &self.coordinator_endpoint {
            let announcement = WorkerJoined {
                kind: WORKER_JOINED,
                worker: &decl.raw,
                workers_count: outcome.total,
            };
            self.notifier.notify_best_effort(url, &announcement).await;
        }

        Ok(outcome)
    }
}
