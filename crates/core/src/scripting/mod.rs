//! Script execution pipeline.
//!
//! Validation, harness generation, sandboxed execution, and result parsing
//! for submitted Python scripts. All subprocess management is pure (no HTTP
//! or shared state) and lives in the `core` crate for isolation and
//! testability.

pub mod executor;
pub mod harness;
pub mod protocol;
pub mod sandbox;
pub mod subprocess;
pub mod validator;
