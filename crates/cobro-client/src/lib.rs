//! Client library for talking to the Cobro host bridge.
//!
//! The sandboxed UI process links this crate and never touches the store
//! file directly: every read and write goes over the bridge socket as a
//! JSON-RPC call, one line per message.

mod client;

pub use client::{BridgeClient, ClientError};
