//! HTTP surface: health probe and the tracker webhook receiver.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::config::{AgentIdentity, RelayConfig};
use crate::dispatch::{Dispatcher, Outcome};
use crate::error::{ConfigError, DispatchError};
use crate::webhook::signature_header;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub service_name: String,
    /// Local agent identity, reported by `/health` when known.
    pub agent: AgentIdentity,
}

/// Build the relay router from configuration.
pub fn build_app(config: &RelayConfig) -> Result<Router, ConfigError> {
    let state = AppState {
        dispatcher: Arc::new(Dispatcher::from_config(config)?),
        service_name: config.service_name.clone(),
        agent: AgentIdentity::load(&config.config_file),
    };
    Ok(relay_routes(state, config.body_limit))
}

/// Build the Axum router with the health and webhook routes.
pub fn relay_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/linear", post(linear_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = serde_json::json!({
        "ok": true,
        "service": state.service_name,
    });
    if let Some(email) = &state.agent.email {
        body["agent"] = serde_json::Value::from(email.as_str());
    }
    Json(body)
}

// ── Webhook ─────────────────────────────────────────────────────────────

/// POST /linear
///
/// - 200: event processed, handled or not
/// - 400: body is not JSON
/// - 401: signature missing or wrong while a secret is configured
/// - 413: body over the configured limit
/// - 500: registry or forwarding failure
async fn linear_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Outcome, DispatchError> {
    state
        .dispatcher
        .dispatch(signature_header(&headers), &body)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(dir: &TempDir, agent_email: Option<&str>) -> Router {
        let mut config = RelayConfig::with_base_dir(dir.path());
        config.body_limit = 64;
        if let Some(email) = agent_email {
            std::fs::write(
                &config.config_file,
                serde_json::json!({ "agent": { "email": email } }).to_string(),
            )
            .unwrap();
        }
        build_app(&config).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir, None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["service"], "apex-agents-webhook-server");
        assert!(body.get("agent").is_none());
    }

    #[tokio::test]
    async fn health_includes_agent_identity() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir, Some("me@apex.dev"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["agent"], "me@apex.dev");
    }

    #[tokio::test]
    async fn invalid_json_is_400() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir, None)
            .oneshot(Request::post("/linear").body(Body::from("nope")).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await,
            serde_json::json!({ "ok": false, "error": "invalid json" })
        );
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir, None)
            .oneshot(
                Request::post("/linear")
                    .body(Body::from(vec![b' '; 128]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn unrecognized_event_is_acknowledged() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir, None)
            .oneshot(
                Request::post("/linear")
                    .header("content-type", "text/plain")
                    .body(Body::from(r#"{"type":"Project"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["handled"], false);
    }
}
