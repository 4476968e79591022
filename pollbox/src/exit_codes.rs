//! Stable exit codes for pollbox CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Usage errors, missing or corrupt state, failed writes.
pub const INVALID: i32 = 1;
/// The store declined the operation and changed nothing (closed poll, unknown
/// poll or option, bad input, nobody signed in, nothing to do).
pub const DECLINED: i32 = 2;
/// The signed-in user is not an admin.
pub const UNAUTHORIZED: i32 = 3;
/// `pollbox login` rejected the id/password pair.
pub const INVALID_CREDENTIALS: i32 = 4;
