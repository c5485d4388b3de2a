//! # Cobro Core
//!
//! Core library for Cobro - the data layer of a small invoicing app, run by
//! a privileged host process on behalf of a sandboxed UI.
//!
//! This crate provides everything that touches the store file directly,
//! independent of the process boundary that exposes it.
//!
//! ## Architecture
//!
//! - **schema**: Table creation, startup migrations, and the profile seed
//! - **storage**: The store handle, the generic query bridge, and typed
//!   per-entity repositories
//! - **backup**: Whole-file backup/restore and the restore hand-off marker
//! - **paths**: Default filesystem locations for the store

pub mod backup;
pub mod error;
pub mod paths;
pub mod schema;
pub mod storage;

pub use backup::{BackupReport, BackupStatus};
pub use error::{CobroError, Result};
pub use storage::{MutationOutcome, Row, Scalar, Store};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
