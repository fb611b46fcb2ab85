//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::warn;

/// Name reported by `/health`.
pub const SERVICE_NAME: &str = "apex-agents-webhook-server";

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Relay configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listening port.
    pub port: u16,
    /// Shared webhook secret. `None` disables signature verification.
    pub webhook_secret: Option<SecretString>,
    /// Coordinator notified when a worker joins.
    pub coordinator_endpoint: Option<String>,
    /// Lightweight config document holding the local agent identity.
    pub config_file: PathBuf,
    /// Worker registry document.
    pub workers_file: PathBuf,
    /// Where the last received event is dumped when `log_events` is set.
    pub event_dump_file: PathBuf,
    pub log_events: bool,
    /// Timeout for every outbound POST.
    pub forward_timeout: Duration,
    /// Maximum accepted webhook body size.
    pub body_limit: usize,
    pub service_name: String,
}

impl RelayConfig {
    /// Defaults rooted at `base_dir` (normally `$HOME/.config/apex-agents`).
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            port: DEFAULT_PORT,
            webhook_secret: None,
            coordinator_endpoint: None,
            config_file: base_dir.join("config.json"),
            workers_file: base_dir.join("workers.json"),
            event_dump_file: base_dir.join("last-webhook-event.json"),
            log_events: false,
            forward_timeout: Duration::from_secs(DEFAULT_FORWARD_TIMEOUT_SECS),
            body_limit: DEFAULT_BODY_LIMIT_BYTES,
            service_name: SERVICE_NAME.to_string(),
        }
    }

    /// Build configuration from environment variables.
    pub fn from_env() -> Self {
        let home = env_nonempty("HOME").unwrap_or_default();
        let base_dir = PathBuf::from(home).join(".config").join("apex-agents");
        let defaults = Self::with_base_dir(&base_dir);

        let port: u16 = env_nonempty("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let forward_timeout = env_nonempty("APEX_FORWARD_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.forward_timeout);

        let body_limit: usize = env_nonempty("APEX_BODY_LIMIT_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.body_limit);

        Self {
            port,
            webhook_secret: env_nonempty("LINEAR_WEBHOOK_SECRET").map(SecretString::from),
            coordinator_endpoint: env_nonempty("QUEEN_ENDPOINT"),
            config_file: env_nonempty("APEX_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_file),
            workers_file: env_nonempty("APEX_WORKERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workers_file),
            event_dump_file: env_nonempty("APEX_EVENT_DUMP_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.event_dump_file),
            log_events: env_nonempty("LOG_EVENTS").is_some_and(|v| v == "true"),
            forward_timeout,
            body_limit,
            service_name: defaults.service_name,
        }
    }

    /// Whether inbound signatures are checked.
    pub fn verification_enabled(&self) -> bool {
        self.webhook_secret.is_some()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// ── Agent identity ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    agent: Option<AgentSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentSection {
    #[serde(default)]
    email: Option<String>,
}

/// Identity of the local agent, read from the config document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentIdentity {
    pub email: Option<String>,
}

impl AgentIdentity {
    /// Load the identity from `path`. Missing or unreadable files yield an
    /// empty identity.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<ConfigDocument>(&raw) {
            Ok(doc) => Self {
                email: doc
                    .agent
                    .and_then(|a| a.email)
                    .filter(|e| !e.trim().is_empty()),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparsable config document");
                Self::default()
            }
        }
    }
}
