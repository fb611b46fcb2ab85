//! File-backed worker registry.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::{RegistryFile, WorkerRecord, WorkerUpsert, normalize_email};
use crate::error::RegistryError;
use crate::storage::{read_json_or_default, write_json_atomic};

/// Result of an upsert.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// The record as stored after the merge.
    pub record: WorkerRecord,
    /// Number of workers in the registry after the write.
    pub total: usize,
    /// `true` when no record existed for this email.
    pub created: bool,
}

/// Registry of workers persisted as a single JSON document.
///
/// Each upsert reads the whole document, merges in memory, and replaces the
/// file atomically. Upserts from this process are serialized; a second
/// process writing the same file can still lose updates (last rename wins).
pub struct WorkerRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WorkerRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> RegistryFile {
        read_json_or_default(&self.path).await
    }

    /// Insert or merge a worker keyed by normalized email.
    pub async fn upsert(&self, upsert: WorkerUpsert) -> Result<UpsertOutcome, RegistryError> {
        let email = normalize_email(&upsert.email);
        if email.is_empty() {
            return Err(RegistryError::MissingEmail);
        }

        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await;
        let now = Utc::now();

        let (record, created) = match file.workers.iter_mut().find(|w| w.matches(&email)) {
            Some(existing) => {
                upsert.apply_to(existing, email, now);
                (existing.clone(), false)
            }
            None => {
                let record = upsert.into_record(email, now);
                file.workers.push(record.clone());
                (record, true)
            }
        };

        write_json_atomic(&self.path, &file)
            .await
            .map_err(RegistryError::Storage)?;

        let total = file.workers.len();
        info!(
            email = %record.email,
            created,
            total,
            "Worker registry updated"
        );
        Ok(UpsertOutcome {
            record,
            total,
            created,
        })
    }

    /// Look up a worker by email (case and whitespace insensitive).
    pub async fn find_by_email(&self, email: &str) -> Option<WorkerRecord> {
        let found = self
            .load()
            .await
            .workers
            .into_iter()
            .find(|w| w.matches(email));
        debug!(email = %normalize_email(email), found = found.is_some(), "Worker lookup");
        found
    }

    pub async fn count(&self) -> usize {
        self.load().await.workers.len()
    }
}
