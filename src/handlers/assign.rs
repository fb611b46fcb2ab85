//! Forwarding of issue-assignment events to registered workers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::notify::{DeliveryResult, Notifier};
use crate::registry::WorkerRegistry;
use crate::webhook::{AssignmentCandidate, IssueRef};

/// Kind tag of forwarded assignment events.
pub const ISSUE_ASSIGNED: &str = "apex.linear.issue.assigned";

/// Normalized event POSTed to a worker's endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAssigned {
    pub kind: &'static str,
    pub received_at: DateTime<Utc>,
    pub issue: IssueRef,
    /// Event type reported by the tracker.
    pub raw_type: String,
}

impl IssueAssigned {
    pub fn new(issue: IssueRef, raw_type: String) -> Self {
        Self {
            kind: ISSUE_ASSIGNED,
            received_at: Utc::now(),
            issue,
            raw_type,
        }
    }
}

/// A forwarded assignment: the worker's stored email and delivery outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Forwarded {
    pub email: String,
    pub result: DeliveryResult,
}

pub struct AssignmentHandler {
    registry: Arc<WorkerRegistry>,
    notifier: Notifier,
}

impl AssignmentHandler {
    pub fn new(registry: Arc<WorkerRegistry>, notifier: Notifier) -> Self {
        Self { registry, notifier }
    }

    /// Forward an assignment to the assignee's worker.
    ///
    /// Returns `Ok(None)` when no worker is registered for the assignee.
    /// A worker without an endpoint yields a failed [`DeliveryResult`], not
    /// an error. Transport failures are returned as errors.
    pub async fn handle(
        &self,
        candidate: AssignmentCandidate,
    ) -> Result<Option<Forwarded>, NotifyError> {
        let Some(worker) = self.registry.find_by_email(&candidate.assignee_email).await else {
            info!(
                assignee = %candidate.assignee_email,
                "No registered worker for assignee"
            );
            return Ok(None);
        };

        let event = IssueAssigned::new(candidate.issue, candidate.event_type);

        let result = match &worker.endpoint {
            Some(endpoint) => {
                self.notifier
                    .post_json(endpoint, &event, &worker.headers)
                    .await?
            }
            None => {
                warn!(email = %worker.email, "Worker has no endpoint, assignment not forwarded");
                DeliveryResult::missing_endpoint()
            }
        };

        info!(
            email = %worker.email,
            ok = result.ok,
            status = result.status,
            "Assignment forwarded"
        );

        Ok(Some(Forwarded {
            email: worker.email,
            result,
        }))
    }
}
