//! AWS-oriented adapters and handler for the remote code loader.
//!
//! This crate owns runtime integration details (the Lambda handler, the
//! object store adapter and the embedded JavaScript runtime) and exposes a
//! single runtime module boundary for the contract, error and namespace
//! primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod runtime;
