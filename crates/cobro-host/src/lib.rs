//! Host-side implementation of the Cobro bridge.
//!
//! The binary (`cobrod`) wires these pieces together; they are exposed as a
//! library so integration tests can run the server in-process.

pub mod config;
pub mod handlers;
pub mod server;

pub use handlers::{ControlAction, HostState};
pub use server::{Server, ServerOutcome};
