//! I/O helpers for the voting store and CLI.

pub mod clock;
pub mod config;
pub mod init;
pub mod snapshot_store;
pub mod storage;
