//! Outbound JSON notifications to workers and the coordinator.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, NotifyError};

/// Outcome of one POST, reported back verbatim in webhook responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub ok: bool,
    pub status: u16,
    pub text: String,
}

impl DeliveryResult {
    /// Result reported when a worker has no endpoint to deliver to.
    pub fn missing_endpoint() -> Self {
        Self {
            ok: false,
            status: 0,
            text: "missing endpoint".to_string(),
        }
    }
}

/// Shared HTTP client for outbound POSTs.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    /// Create a notifier whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST `payload` as JSON with extra `headers`.
    ///
    /// Non-2xx responses are not errors; they come back with `ok: false`.
    /// Only transport failures (connect, timeout, body read) return `Err`.
    pub async fn post_json<T>(
        &self,
        url: &str,
        payload: &T,
        headers: &BTreeMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError>
    where
        T: Serialize + ?Sized,
    {
        let transport = |source: reqwest::Error| NotifyError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .post(url)
            .json(payload)
            .headers(build_headers(headers))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;
        debug!(url = %url, status = status.as_u16(), "Outbound POST completed");

        Ok(DeliveryResult {
            ok: status.is_success(),
            status: status.as_u16(),
            text,
        })
    }

    /// POST and discard the outcome. Failures are logged, never returned.
    pub async fn notify_best_effort<T>(&self, url: &str, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        match self.post_json(url, payload, &BTreeMap::new()).await {
            Ok(result) if result.ok => {
                info!(url = %url, status = result.status, "Best-effort notification delivered");
            }
            Ok(result) => {
                warn!(
                    url = %url,
                    status = result.status,
                    body = %result.text.chars().take(200).collect::<String>(),
                    "Best-effort notification rejected"
                );
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Best-effort notification failed");
            }
        }
    }
}

/// JSON content type plus caller headers. Caller headers win on conflict;
/// names or values that are not valid HTTP are skipped.
fn build_headers(extra: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid outbound header"),
        }
    }
    map
}
