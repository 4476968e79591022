//! Deterministic, pure logic shared by the voting store.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! snapshots and take the current time as an argument so tests stay deterministic.

pub mod credentials;
pub mod draft;
pub mod invariants;
pub mod query;
pub mod reconcile;
pub mod types;
pub mod voting;
