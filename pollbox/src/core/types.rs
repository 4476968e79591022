//! Shared deterministic types for pollbox core logic.
//!
//! These types define stable contracts between the store, the pure transition
//! functions, and the presentation layer. They must not depend on I/O.

use thiserror::Error;

/// Why the store declined an operation.
///
/// A rejected operation never changes state and never writes to storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A non-admin session attempted an admin-only operation.
    #[error("not authorized")]
    Unauthorized,
    /// The operation references a poll, option or user that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A required field is empty or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The operation needs a signed-in user.
    #[error("no active session")]
    NoActiveSession,
    /// Unknown identifier, wrong password, or id outside the provisioning range.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The poll is inactive or past its end date.
    #[error("poll {0} is closed for voting")]
    PollClosed(String),
    /// The request would not change anything (e.g. re-voting the same option).
    #[error("nothing to do: {0}")]
    NothingToDo(String),
}

/// Viewing state of a poll at a given instant.
///
/// Expiry is derived from the end date and takes precedence over the active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Active,
    Inactive,
    Expired,
}

impl PollStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Inactive => "inactive",
            PollStatus::Expired => "expired",
        }
    }
}

/// Summary of a vote transition applied to a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChange {
    pub poll_id: String,
    /// Option the user's vote was taken from, if any.
    pub removed_from: Option<String>,
    /// Option the user's vote was credited to, if any.
    pub added_to: Option<String>,
}
