//! Shared remote code loader primitives.
//!
//! This crate owns the invocation contract (event parsing, result shapes,
//! context record), the loader error taxonomy, and the execution namespace
//! that dynamic runtimes fill. It intentionally excludes AWS SDK, Lambda
//! runtime and interpreter concerns.

pub mod contract;
pub mod error;
pub mod namespace;
