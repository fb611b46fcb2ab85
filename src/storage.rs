//! JSON document persistence with atomic replace.
//!
//! Each write goes to a fresh uniquely-named temp file in the target's
//! directory, is synced, and is renamed over the target, so readers see
//! either the old document or the new one even while writes overlap.
//! Atomicity is per file only; concurrent read-modify-write cycles are the
//! caller's concern.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::warn;

use crate::error::StorageError;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON document, falling back to `T::default()` when the file is
/// missing or cannot be parsed.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable document, using empty default");
            return T::default();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unparsable document, using empty default");
            T::default()
        }
    }
}

/// Write `value` as pretty JSON, replacing `path` atomically.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&target, &bytes))
        .await
        .map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;

    // Random name, created with O_EXCL: overlapping writers never share it.
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    tmp.write_all(bytes).map_err(io_err(path))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| StorageError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    // Make the rename itself durable.
    let handle = std::fs::File::open(dir).map_err(io_err(dir))?;
    if let Err(e) = handle.sync_all() {
        warn!(path = %dir.display(), error = %e, "Directory sync failed");
    }
    Ok(())
}
