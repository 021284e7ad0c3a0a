//! Sandboxed Python execution pipeline.
//!
//! Pure domain logic with no HTTP dependencies: static validation of
//! submitted scripts, harness generation, sandbox runner invocation, and
//! interpretation of the runner's output. The `api` crate wires these
//! together behind an HTTP endpoint.

pub mod error;
pub mod scripting;
