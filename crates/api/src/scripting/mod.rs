//! Script execution service.
//!
//! The [`ScriptOrchestrator`](orchestrator::ScriptOrchestrator) ties the core
//! validator, harness, sandbox runner, and protocol parser together behind a
//! single entry point for handlers.

pub mod orchestrator;
