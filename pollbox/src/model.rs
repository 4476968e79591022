//! Persisted data model for polls, users, feedback and the session.
//!
//! Field names serialize in camelCase so snapshots stay readable by the
//! storage slots' JSON Schemas in `schemas/snapshot/`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved identifier of the administrator account.
pub const ADMIN_ID: &str = "admin";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: String,
    pub options: Vec<PollOption>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Poll {
    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: &str) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|option| option.id == option_id)
    }

    /// True once `now` is past the poll's end date. Polls without an end date never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| now > end)
    }
}

/// One selectable choice. `votes` always equals `voted_by.len()`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: u32,
    pub voted_by: BTreeSet<String>,
}

impl PollOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            votes: 0,
            voted_by: BTreeSet::new(),
        }
    }

    /// Credit `user_id` with a vote. Returns false if the user was already a voter.
    pub(crate) fn add_voter(&mut self, user_id: &str) -> bool {
        if !self.voted_by.insert(user_id.to_string()) {
            return false;
        }
        self.votes += 1;
        true
    }

    /// Withdraw `user_id`'s vote. Returns false if the user was not a voter.
    pub(crate) fn remove_voter(&mut self, user_id: &str) -> bool {
        if !self.voted_by.remove(user_id) {
            return false;
        }
        self.votes = self.votes.saturating_sub(1);
        true
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    /// Poll id -> option id currently selected by this user.
    pub voted_polls: BTreeMap<String, String>,
    pub is_admin: bool,
}

impl User {
    pub fn voted_option(&self, poll_id: &str) -> Option<&str> {
        self.voted_polls.get(poll_id).map(String::as_str)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the store owns, as persisted across the four storage slots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub polls: Vec<Poll>,
    pub users: Vec<User>,
    /// Id of the signed-in user, resolved through `users`.
    pub session: Option<String>,
    pub feedback: Vec<Feedback>,
}

impl Snapshot {
    pub fn poll(&self, poll_id: &str) -> Option<&Poll> {
        self.polls.iter().find(|poll| poll.id == poll_id)
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn session_user(&self) -> Option<&User> {
        self.session.as_deref().and_then(|id| self.user(id))
    }
}
