//! Webhook dispatch: verify, parse, classify, handle.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{ConfigError, DispatchError, Result};
use crate::handlers::{AssignmentHandler, Forwarded, JoinHandler};
use crate::notify::Notifier;
use crate::registry::{UpsertOutcome, WorkerRegistry};
use crate::storage::write_json_atomic;
use crate::webhook::{Classification, InboundEvent, JOIN_MARKER, classify, verify};

/// Successful processing outcomes. All map to HTTP 200.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A worker registration was stored.
    Joined(UpsertOutcome),
    /// An assignment was routed to a worker.
    Notified(Forwarded),
    /// Valid event that no handler applies to.
    Unhandled,
}

impl Outcome {
    /// JSON body returned to the tracker.
    pub fn body(&self) -> Value {
        match self {
            Outcome::Joined(_) => json!({ "ok": true, "handled": JOIN_MARKER }),
            Outcome::Notified(f) => json!({
                "ok": true,
                "notified": f.email,
                "result": f.result,
            }),
            Outcome::Unhandled => json!({
                "ok": true,
                "handled": false,
                "note": "no matching handler",
            }),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        Json(self.body()).into_response()
    }
}

/// Single entry point for inbound webhooks.
pub struct Dispatcher {
    secret: Option<SecretString>,
    join: JoinHandler,
    assign: AssignmentHandler,
    event_dump_file: Option<PathBuf>,
}

impl Dispatcher {
    /// Build a dispatcher and its collaborators from configuration.
    pub fn from_config(config: &RelayConfig) -> std::result::Result<Self, ConfigError> {
        let registry = Arc::new(WorkerRegistry::new(config.workers_file.clone()));
        let notifier = Notifier::new(config.forward_timeout)?;
        Ok(Self::new(config, registry, notifier))
    }

    pub fn new(config: &RelayConfig, registry: Arc<WorkerRegistry>, notifier: Notifier) -> Self {
        Self {
            secret: config.webhook_secret.clone(),
            join: JoinHandler::new(
                Arc::clone(&registry),
                notifier.clone(),
                config.coordinator_endpoint.clone(),
            ),
            assign: AssignmentHandler::new(registry, notifier),
            event_dump_file: config
                .log_events
                .then(|| config.event_dump_file.clone()),
        }
    }

    /// Process one webhook delivery.
    ///
    /// The signature is checked before the body is parsed. Bad join
    /// declarations and unknown assignees are not errors; they end in
    /// [`Outcome::Unhandled`].
    pub async fn dispatch(&self, signature: Option<&str>, body: &[u8]) -> Result<Outcome> {
        if !verify(self.secret.as_ref(), body, signature) {
            warn!(has_signature = signature.is_some(), "Rejected webhook with invalid signature");
            return Err(DispatchError::InvalidSignature);
        }

        let event = InboundEvent::parse(body).map_err(|e| {
            warn!(error = %e, "Rejected webhook with invalid JSON");
            DispatchError::InvalidJson(e)
        })?;

        if let Some(path) = &self.event_dump_file {
            if let Err(e) = write_json_atomic(path, event.raw()).await {
                warn!(path = %path.display(), error = %e, "Failed to dump webhook event");
            }
        }

        debug!(event_type = %event.event_type(), "Classifying webhook");

        match classify(&event) {
            Classification::Join(decl) => {
                let outcome = self.join.handle(decl).await?;
                Ok(Outcome::Joined(outcome))
            }
            Classification::Assignment(candidate) => {
                match self.assign.handle(candidate).await? {
                    Some(forwarded) => Ok(Outcome::Notified(forwarded)),
                    None => Ok(Outcome::Unhandled),
                }
            }
            Classification::Unhandled => {
                info!(event_type = %event.event_type(), "No matching handler");
                Ok(Outcome::Unhandled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::signature::compute_signature_hex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn dispatcher(dir: &TempDir, secret: Option<&str>, log_events: bool) -> Dispatcher {
        let mut config = RelayConfig::with_base_dir(dir.path());
        config.webhook_secret = secret.map(|s| SecretString::from(s.to_string()));
        config.log_events = log_events;
        config.forward_timeout = Duration::from_millis(500);
        Dispatcher::from_config(&config).unwrap()
    }

    const JOIN: &[u8] =
        br#"{"type":"Comment","data":{"body":"APEX_JOIN {\"email\":\"a@b.com\",\"endpoint\":\"http://x\"}"}}"#;

    #[tokio::test]
    async fn signature_checked_before_json() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, Some("shh"), false);

        let err = d.dispatch(Some("deadbeef"), b"not json").await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidSignature));

        let err = d.dispatch(None, b"{}").await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidSignature));

        let sig = compute_signature_hex(b"shh", b"not json");
        let err = d.dispatch(Some(&sig), b"not json").await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn join_comment_is_registered() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, false);

        let outcome = d.dispatch(None, JOIN).await.unwrap();
        assert_eq!(outcome.body()["handled"], "APEX_JOIN");

        let registry = WorkerRegistry::new(dir.path().join("workers.json"));
        let record = registry.find_by_email("A@B.com").await.unwrap();
        assert_eq!(record.endpoint.as_deref(), Some("http://x"));
    }

    #[tokio::test]
    async fn bad_join_json_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, false);

        let body = br#"{"data":{"body":"APEX_JOIN {\"email\": oops"}}"#;
        let outcome = d.dispatch(None, body).await.unwrap();
        assert!(matches!(outcome, Outcome::Unhandled));
        assert_eq!(outcome.body()["handled"], false);
        assert!(!dir.path().join("workers.json").exists());
    }

    #[tokio::test]
    async fn unknown_assignee_is_unhandled() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, false);

        let body = br#"{"data":{"issue":{"id":"1","assignee":{"email":"nobody@x.io"}}}}"#;
        let outcome = d.dispatch(None, body).await.unwrap();
        assert_eq!(
            outcome.body(),
            json!({ "ok": true, "handled": false, "note": "no matching handler" })
        );
    }

    #[tokio::test]
    async fn scalar_payload_is_unhandled() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, false);
        let outcome = d.dispatch(None, b"42").await.unwrap();
        assert!(matches!(outcome, Outcome::Unhandled));
    }

    #[tokio::test]
    async fn event_dump_written_when_enabled() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, true);
        d.dispatch(None, br#"{"type":"Issue"}"#).await.unwrap();

        let dumped = std::fs::read_to_string(dir.path().join("last-webhook-event.json")).unwrap();
        let value: Value = serde_json::from_str(&dumped).unwrap();
        assert_eq!(value["type"], "Issue");
    }

    #[tokio::test]
    async fn event_dump_skipped_by_default() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, None, false);
        d.dispatch(None, br#"{"type":"Issue"}"#).await.unwrap();
        assert!(!dir.path().join("last-webhook-event.json").exists());
    }
}
