//! Backup and restore of the store file.
//!
//! Both directions copy whole files. Writes go to a temp file in the
//! destination directory first and are renamed into place, so a crash
//! mid-copy never leaves a half-written store or backup behind.
//!
//! A completed restore leaves a `restore-pending` marker beside the store;
//! the host consumes it on the next startup to confirm the hand-off.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CobroError, Result};
use crate::paths::restore_marker_path;

/// Terminal state of a backup or restore attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Completed,
    Cancelled,
    Failed,
}

/// What a backup or restore attempt reports back to the caller. Declining
/// to pick a destination is a cancellation, not a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub status: BackupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BackupReport {
    pub fn completed() -> Self {
        Self {
            status: BackupStatus::Completed,
            message: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: BackupStatus::Cancelled,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: BackupStatus::Failed,
            message: Some(message.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.status == BackupStatus::Completed
    }
}

/// Copy the live store to `destination`. A `None` destination means the user
/// declined to pick one.
pub fn backup_to(store_path: &Path, destination: Option<&Path>) -> BackupReport {
    let Some(destination) = destination else {
        return BackupReport::cancelled();
    };
    match copy_atomic(store_path, destination) {
        Ok(bytes) => {
            info!(destination = %destination.display(), bytes, "backup written");
            BackupReport::completed()
        }
        Err(e) => {
            warn!(destination = %destination.display(), error = %e, "backup failed");
            BackupReport::failed(e.to_string())
        }
    }
}

/// Replace the live store file with `source`. The caller must have closed
/// the store connection first and must reopen (or relaunch) afterwards.
pub fn overwrite_store_file(store_path: &Path, source: &Path) -> Result<u64> {
    let bytes = copy_atomic(source, store_path)?;
    info!(source = %source.display(), bytes, "store file replaced");
    Ok(bytes)
}

/// Record that a restore completed, for the next startup to acknowledge.
pub fn write_restore_marker(data_dir: &Path) -> Result<()> {
    fs::write(restore_marker_path(data_dir), b"")?;
    Ok(())
}

/// Consume the restore marker if present. Returns whether one was found.
pub fn take_restore_marker(data_dir: &Path) -> bool {
    let marker = restore_marker_path(data_dir);
    match fs::remove_file(&marker) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(marker = %marker.display(), error = %e, "could not remove restore marker");
            false
        }
    }
}

/// Copy `source` to `destination` via a temp file in the destination's
/// directory, renamed into place once the copy is complete.
fn copy_atomic(source: &Path, destination: &Path) -> Result<u64> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CobroError::File(format!("system time error: {}", e)))?
        .as_nanos();
    let temp_path = parent.join(format!(".cobro-copy-{}.tmp", nanos));

    let bytes = match fs::copy(source, &temp_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(CobroError::File(format!(
                "failed to copy {}: {}",
                source.display(),
                e
            )));
        }
    };

    if let Err(initial) = fs::rename(&temp_path, destination) {
        // Some platforms refuse to rename over an existing file.
        let _ = fs::remove_file(destination);
        if let Err(retry) = fs::rename(&temp_path, destination) {
            let _ = fs::remove_file(&temp_path);
            return Err(CobroError::File(format!(
                "failed to move copy into place (initial: {}, retry: {})",
                initial, retry
            )));
        }
    }
    Ok(bytes)
}
