//! Default filesystem locations for the store.
//!
//! The store lives in a user-scoped data directory so that the sandboxed UI
//! process never needs to know (or reach) the path directly.

use std::path::PathBuf;

use crate::error::{CobroError, Result};

/// File name of the live store. Fixed so that existing installations keep
/// opening the same file.
pub const STORE_FILE_NAME: &str = "database.sqlite";

/// Marker file written by a completed restore and consumed on the next
/// startup. Lives beside the store file.
pub const RESTORE_MARKER_NAME: &str = "restore-pending";

/// Resolve the data directory: `$XDG_DATA_HOME/cobro`, falling back to
/// `~/.local/share/cobro`.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("cobro"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("cobro"))
}

/// Path of the live store file inside a data directory.
pub fn store_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(STORE_FILE_NAME)
}

/// Path of the restore marker inside a data directory.
pub fn restore_marker_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(RESTORE_MARKER_NAME)
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| CobroError::File("HOME is not set; cannot resolve data directory".into()))?;
    Ok(PathBuf::from(home))
}
