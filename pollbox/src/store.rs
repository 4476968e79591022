//! The voting store: single owner of polls, users, session and feedback.
//!
//! Every mutation goes through [`VotingStore`]. A rejected call returns a
//! [`Rejection`] and leaves both memory and storage untouched. A successful call
//! writes the slots it changed straight away. Storage failures are logged and
//! kept for the caller (see [`VotingStore::take_persist_error`]); the in-memory
//! state stays authoritative either way.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::credentials::{self, LoginTarget};
use crate::core::types::{Rejection, VoteChange};
use crate::core::voting;
use crate::io::clock::Clock;
use crate::io::config::PollboxConfig;
use crate::io::snapshot_store::{load_snapshot, write_slot, write_snapshot};
use crate::io::storage::{Slot, SlotStorage};
use crate::model::{ADMIN_ID, Feedback, Poll, PollOption, Snapshot, User};

pub struct VotingStore<S: SlotStorage> {
    snapshot: Snapshot,
    config: PollboxConfig,
    storage: S,
    clock: Box<dyn Clock>,
    persist_error: Option<anyhow::Error>,
}

impl<S: SlotStorage> VotingStore<S> {
    /// Load state from `storage`, seeding absent slots.
    pub fn open(storage: S, clock: Box<dyn Clock>, config: PollboxConfig) -> Result<Self> {
        config.validate()?;
        let snapshot = load_snapshot(&storage)?;
        Ok(Self {
            snapshot,
            config,
            storage,
            clock,
            persist_error: None,
        })
    }

    pub fn polls(&self) -> &[Poll] {
        &self.snapshot.polls
    }

    pub fn poll(&self, poll_id: &str) -> Option<&Poll> {
        self.snapshot.poll(poll_id)
    }

    pub fn users(&self) -> &[User] {
        &self.snapshot.users
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.snapshot.user(user_id)
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.snapshot.feedback
    }

    /// Signed-in user, resolved through the users collection.
    pub fn current_user(&self) -> Option<&User> {
        self.snapshot.session_user()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give up the store and hand back its storage, e.g. to reopen it.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Most recent storage failure since the last call, if any.
    pub fn take_persist_error(&mut self) -> Option<anyhow::Error> {
        self.persist_error.take()
    }

    /// Sign in as the admin or an employee.
    ///
    /// Unknown employee ids inside the provisioning range get a fresh account.
    #[instrument(skip_all, fields(user_id = %id))]
    pub fn authenticate(&mut self, id: &str, password: &str) -> Result<(), Rejection> {
        let target = credentials::classify(&self.config.auth, id, password)
            .ok_or(Rejection::InvalidCredentials)?;

        let mut provisioned = false;
        match target {
            LoginTarget::Admin => {
                if self.snapshot.user(ADMIN_ID).is_none() {
                    warn!("admin account missing from users");
                    return Err(Rejection::InvalidCredentials);
                }
            }
            LoginTarget::Employee { id, number } => {
                if self.snapshot.user(&id).is_none() {
                    if !credentials::in_provisioning_range(&self.config.provisioning, number) {
                        debug!("employee id outside provisioning range");
                        return Err(Rejection::InvalidCredentials);
                    }
                    let user = credentials::provisioned_user(&self.config.provisioning, &id);
                    self.snapshot.users.push(user);
                    provisioned = true;
                }
            }
        }

        self.snapshot.session = Some(id.to_string());
        if provisioned {
            self.persist(&[Slot::Users, Slot::CurrentUser]);
        } else {
            self.persist(&[Slot::CurrentUser]);
        }
        info!(provisioned, "signed in");
        Ok(())
    }

    /// Sign out. Safe to call when nobody is signed in.
    pub fn end_session(&mut self) {
        if let Some(id) = self.snapshot.session.take() {
            info!(user_id = %id, "signed out");
        }
        self.persist(&[Slot::CurrentUser]);
    }

    /// Create an active poll with one empty option per text. Admin only.
    ///
    /// Returns the id of the new poll.
    #[instrument(skip_all, fields(options = option_texts.len()))]
    pub fn create_poll<T: AsRef<str>>(
        &mut self,
        title: &str,
        description: &str,
        option_texts: &[T],
        end_date: Option<DateTime<Utc>>,
    ) -> Result<String, Rejection> {
        let admin_id = self.require_admin()?;
        if option_texts.len() < 2 {
            return Err(Rejection::InvalidInput(
                "a poll needs at least 2 options".to_string(),
            ));
        }

        let poll = Poll {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            options: option_texts
                .iter()
                .map(|text| PollOption::new(Uuid::new_v4().to_string(), text.as_ref()))
                .collect(),
            created_by: admin_id,
            created_at: self.clock.now(),
            end_date,
            is_active: true,
        };
        let poll_id = poll.id.clone();
        self.snapshot.polls.push(poll);
        self.persist(&[Slot::Polls]);
        info!(poll_id = %poll_id, "poll created");
        Ok(poll_id)
    }

    /// Vote for `option_id`, moving the session user's earlier vote in the poll.
    #[instrument(skip_all, fields(poll_id = %poll_id, option_id = %option_id))]
    pub fn cast_vote(&mut self, poll_id: &str, option_id: &str) -> Result<VoteChange, Rejection> {
        let user_id = self.require_session()?;
        let now = self.clock.now();
        let change = voting::cast_vote(&mut self.snapshot, &user_id, poll_id, option_id, now)?;
        self.persist(&[Slot::Polls, Slot::Users]);
        info!(user_id = %user_id, moved_from = ?change.removed_from, "vote cast");
        Ok(change)
    }

    /// Withdraw the session user's vote in `poll_id`.
    #[instrument(skip_all, fields(poll_id = %poll_id))]
    pub fn retract_vote(&mut self, poll_id: &str) -> Result<VoteChange, Rejection> {
        let user_id = self.require_session()?;
        let now = self.clock.now();
        let change = voting::retract_vote(&mut self.snapshot, &user_id, poll_id, now)?;
        self.persist(&[Slot::Polls, Slot::Users]);
        info!(user_id = %user_id, "vote retracted");
        Ok(change)
    }

    /// Remove a poll and every user's vote-map entry for it. Admin only.
    #[instrument(skip_all, fields(poll_id = %poll_id))]
    pub fn delete_poll(&mut self, poll_id: &str) -> Result<(), Rejection> {
        self.require_admin()?;
        let idx = self
            .snapshot
            .polls
            .iter()
            .position(|poll| poll.id == poll_id)
            .ok_or_else(|| Rejection::NotFound(format!("poll '{poll_id}'")))?;
        self.snapshot.polls.remove(idx);
        let affected = voting::purge_poll_votes(&mut self.snapshot, poll_id);
        if affected.is_empty() {
            self.persist(&[Slot::Polls]);
        } else {
            self.persist(&[Slot::Polls, Slot::Users]);
        }
        info!(cleared_votes = affected.len(), "poll deleted");
        Ok(())
    }

    /// Switch a poll on or off. Existing votes are kept. Admin only.
    #[instrument(skip_all, fields(poll_id = %poll_id, active = active))]
    pub fn set_poll_active(&mut self, poll_id: &str, active: bool) -> Result<(), Rejection> {
        self.require_admin()?;
        let poll = self
            .snapshot
            .polls
            .iter_mut()
            .find(|poll| poll.id == poll_id)
            .ok_or_else(|| Rejection::NotFound(format!("poll '{poll_id}'")))?;
        if poll.is_active == active {
            return Err(Rejection::NothingToDo(format!(
                "poll '{poll_id}' is already {}",
                if active { "active" } else { "inactive" }
            )));
        }
        poll.is_active = active;
        self.persist(&[Slot::Polls]);
        info!("poll status changed");
        Ok(())
    }

    /// Flip a poll's active flag. Returns the new value. Admin only.
    pub fn toggle_poll_active(&mut self, poll_id: &str) -> Result<bool, Rejection> {
        self.require_admin()?;
        let current = self
            .snapshot
            .poll(poll_id)
            .map(|poll| poll.is_active)
            .ok_or_else(|| Rejection::NotFound(format!("poll '{poll_id}'")))?;
        self.set_poll_active(poll_id, !current)?;
        Ok(!current)
    }

    /// Append a feedback entry from the session user. Returns its id.
    pub fn record_feedback(&mut self, message: &str) -> Result<String, Rejection> {
        let user_id = self.require_session()?;
        let message = message.trim();
        if message.is_empty() {
            return Err(Rejection::InvalidInput(
                "feedback message is empty".to_string(),
            ));
        }
        let entry = Feedback {
            id: Uuid::new_v4().to_string(),
            user_id,
            message: message.to_string(),
            created_at: self.clock.now(),
        };
        let feedback_id = entry.id.clone();
        self.snapshot.feedback.push(entry);
        self.persist(&[Slot::Feedback]);
        info!(feedback_id = %feedback_id, "feedback recorded");
        Ok(feedback_id)
    }

    /// Write every slot, regardless of what changed.
    pub fn flush(&mut self) -> Result<()> {
        write_snapshot(&mut self.storage, &self.snapshot)
    }

    fn require_session(&self) -> Result<String, Rejection> {
        self.current_user()
            .map(|user| user.id.clone())
            .ok_or(Rejection::NoActiveSession)
    }

    fn require_admin(&self) -> Result<String, Rejection> {
        let user = self.current_user().ok_or(Rejection::NoActiveSession)?;
        if !user.is_admin {
            return Err(Rejection::Unauthorized);
        }
        Ok(user.id.clone())
    }

    fn persist(&mut self, slots: &[Slot]) {
        for &slot in slots {
            if let Err(err) = write_slot(&mut self.storage, &self.snapshot, slot) {
                warn!(slot = slot.key(), error = %format!("{err:#}"), "persist failed, keeping in-memory state");
                self.persist_error = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_invariants;
    use crate::io::storage::MemoryStorage;
    use crate::test_support::{ManualClock, at, memory_store, memory_store_at};

    fn signed_in(id: &str, password: &str) -> VotingStore<MemoryStorage> {
        let mut store = memory_store();
        store.authenticate(id, password).expect("login");
        store
    }

    #[test]
    fn admin_login_sets_session() {
        let mut store = memory_store();
        store.authenticate("admin", "123").expect("login");
        let user = store.current_user().expect("session");
        assert_eq!(user.id, "admin");
        assert!(user.is_admin);
        assert_eq!(store.storage().get(Slot::CurrentUser), Some("\"admin\"\n"));
    }

    #[test]
    fn failed_login_keeps_existing_session() {
        let mut store = signed_in("1001", "321");
        assert_eq!(
            store.authenticate("admin", "wrong"),
            Err(Rejection::InvalidCredentials)
        );
        assert_eq!(store.current_user().map(|user| user.id.as_str()), Some("1001"));
    }

    #[test]
    fn employee_login_provisions_inside_range_only() {
        let mut store = memory_store();
        let before = store.users().len();

        store.authenticate("1150", "321").expect("provision");
        assert_eq!(store.users().len(), before + 1);
        let user = store.user("1150").expect("provisioned user");
        assert_eq!(user.name, "Employee 1150");
        assert!(store.storage().get(Slot::Users).is_some());

        store.end_session();
        assert_eq!(
            store.authenticate("9999", "321"),
            Err(Rejection::InvalidCredentials)
        );
        assert_eq!(
            store.authenticate("12", "321"),
            Err(Rejection::InvalidCredentials)
        );
        assert!(store.current_user().is_none());
        assert_eq!(store.users().len(), before + 1);
    }

    /// Second login with a provisioned id reuses the account.
    #[test]
    fn repeat_login_does_not_duplicate_user() {
        let mut store = memory_store();
        store.authenticate("1150", "321").expect("provision");
        store.end_session();
        store.authenticate("1150", "321").expect("login again");
        assert_eq!(store.users().iter().filter(|user| user.id == "1150").count(), 1);
    }

    #[test]
    fn end_session_is_idempotent() {
        let mut store = signed_in("1002", "321");
        store.end_session();
        store.end_session();
        assert!(store.current_user().is_none());
        assert_eq!(store.storage().get(Slot::CurrentUser), Some("null\n"));
    }

    #[test]
    fn create_poll_requires_admin() {
        let mut store = signed_in("1001", "321");
        let before = store.polls().to_vec();

        let err = store.create_poll("Lunch", "", &["Tea", "Coffee"], None);
        assert_eq!(err, Err(Rejection::Unauthorized));
        assert_eq!(store.polls(), before.as_slice());
        assert_eq!(store.storage().get(Slot::Polls), None);

        store.end_session();
        let err = store.create_poll("Lunch", "", &["Tea", "Coffee"], None);
        assert_eq!(err, Err(Rejection::NoActiveSession));
    }

    #[test]
    fn create_poll_builds_active_empty_poll() {
        let clock = ManualClock::new(at(2025, 7, 1));
        let mut store = memory_store_at(clock);
        store.authenticate("admin", "123").expect("login");

        let poll_id = store
            .create_poll("Lunch", "Friday lunch", &["Tea", "Coffee", "Juice"], Some(at(2025, 8, 1)))
            .expect("create");

        let poll = store.poll(&poll_id).expect("created poll");
        assert_eq!(poll.created_by, "admin");
        assert_eq!(poll.created_at, at(2025, 7, 1));
        assert!(poll.is_active);
        assert_eq!(poll.options.len(), 3);
        assert!(poll.options.iter().all(|option| option.votes == 0 && option.voted_by.is_empty()));
        let option_ids: std::collections::BTreeSet<&str> =
            poll.options.iter().map(|option| option.id.as_str()).collect();
        assert_eq!(option_ids.len(), 3);
        assert_eq!(
            store.create_poll("Solo", "", &["Only"], None),
            Err(Rejection::InvalidInput("a poll needs at least 2 options".to_string()))
        );
    }

    #[test]
    fn vote_switch_and_retract_keep_invariants() {
        let clock = ManualClock::new(at(2025, 7, 1));
        let mut store = memory_store_at(clock);
        store.authenticate("admin", "123").expect("admin");
        let poll_id = store
            .create_poll("Lunch", "", &["Tea", "Coffee"], None)
            .expect("create");
        let options: Vec<String> = store.poll(&poll_id).expect("poll").options.iter().map(|o| o.id.clone()).collect();
        store.end_session();
        store.authenticate("1003", "321").expect("employee");

        store.cast_vote(&poll_id, &options[0]).expect("vote");
        store.cast_vote(&poll_id, &options[1]).expect("switch");
        let votes: Vec<u32> = store.poll(&poll_id).expect("poll").options.iter().map(|o| o.votes).collect();
        assert_eq!(votes, vec![0, 1]);
        assert_eq!(
            store.current_user().expect("session").voted_option(&poll_id),
            Some(options[1].as_str())
        );
        assert!(validate_invariants(store.snapshot()).is_empty());

        store.retract_vote(&poll_id).expect("retract");
        assert_eq!(store.current_user().expect("session").voted_option(&poll_id), None);
        let before = store.snapshot().clone();
        assert!(matches!(store.retract_vote(&poll_id), Err(Rejection::NothingToDo(_))));
        assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn vote_without_session_is_rejected() {
        let mut store = memory_store();
        assert_eq!(store.cast_vote("1", "1-1"), Err(Rejection::NoActiveSession));
        assert_eq!(store.retract_vote("1"), Err(Rejection::NoActiveSession));
        assert_eq!(store.record_feedback("hi"), Err(Rejection::NoActiveSession));
    }

    /// Seed polls ended in 2025; votes stay but new ones are refused.
    #[test]
    fn expired_poll_refuses_votes_and_keeps_tally() {
        let clock = ManualClock::new(at(2026, 1, 1));
        let mut store = memory_store_at(clock);
        store.authenticate("1001", "321").expect("login");
        let before = store.snapshot().clone();

        assert!(matches!(store.cast_vote("1", "1-2"), Err(Rejection::PollClosed(_))));
        assert!(matches!(store.retract_vote("1"), Err(Rejection::PollClosed(_))));
        assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn deactivate_blocks_votes_until_reactivated() {
        let clock = ManualClock::new(at(2025, 1, 20));
        let mut store = memory_store_at(clock);
        store.authenticate("admin", "123").expect("admin");
        store.set_poll_active("1", false).expect("deactivate");
        assert!(matches!(store.set_poll_active("1", false), Err(Rejection::NothingToDo(_))));
        store.end_session();

        store.authenticate("1001", "321").expect("employee");
        assert!(matches!(store.cast_vote("1", "1-2"), Err(Rejection::PollClosed(_))));
        assert_eq!(store.poll("1").expect("poll").option("1-1").expect("option").votes, 2);
        assert_eq!(store.set_poll_active("1", true), Err(Rejection::Unauthorized));
        store.end_session();

        store.authenticate("admin", "123").expect("admin");
        assert_eq!(store.toggle_poll_active("1"), Ok(true));
        store.end_session();
        store.authenticate("1001", "321").expect("employee");
        store.cast_vote("1", "1-2").expect("vote after reactivation");
    }

    #[test]
    fn delete_poll_cascades_vote_entries() {
        let mut store = signed_in("admin", "123");
        store.delete_poll("2").expect("delete");

        assert!(store.poll("2").is_none());
        assert!(store.poll("1").is_some());
        assert!(store.poll("3").is_some());
        assert!(store.users().iter().all(|user| user.voted_option("2").is_none()));
        assert_eq!(store.user("1001").expect("user").voted_option("1"), Some("1-1"));
        assert!(validate_invariants(store.snapshot()).is_empty());
        assert!(matches!(store.delete_poll("2"), Err(Rejection::NotFound(_))));
    }

    #[test]
    fn delete_poll_requires_admin() {
        let mut store = signed_in("1004", "321");
        assert_eq!(store.delete_poll("1"), Err(Rejection::Unauthorized));
        assert!(store.poll("1").is_some());
    }

    #[test]
    fn feedback_is_trimmed_and_appended() {
        let clock = ManualClock::new(at(2025, 4, 1));
        let mut store = memory_store_at(clock);
        store.authenticate("1005", "321").expect("login");
        let before = store.feedback().len();

        assert!(matches!(store.record_feedback("   "), Err(Rejection::InvalidInput(_))));
        let id = store.record_feedback("  More snacks please  ").expect("feedback");

        let entry = store.feedback().last().expect("entry");
        assert_eq!(store.feedback().len(), before + 1);
        assert_eq!(entry.id, id);
        assert_eq!(entry.user_id, "1005");
        assert_eq!(entry.message, "More snacks please");
        assert_eq!(entry.created_at, at(2025, 4, 1));
    }

    /// Reopening from the same storage reproduces the state before the restart.
    #[test]
    fn reopen_restores_identical_state() {
        let clock = ManualClock::new(at(2025, 7, 1));
        let mut store = memory_store_at(clock.clone());
        store.authenticate("admin", "123").expect("admin");
        let poll_id = store.create_poll("Lunch", "", &["Tea", "Coffee"], None).expect("create");
        store.end_session();
        store.authenticate("1180", "321").expect("provision");
        let option_id = store.poll(&poll_id).expect("poll").options[0].id.clone();
        store.cast_vote(&poll_id, &option_id).expect("vote");
        store.record_feedback("Nice").expect("feedback");
        let before = store.snapshot().clone();

        let reopened = VotingStore::open(
            store.into_storage(),
            Box::new(clock),
            PollboxConfig::default(),
        )
        .expect("reopen");

        assert_eq!(reopened.snapshot(), &before);
        assert_eq!(reopened.current_user().map(|user| user.id.as_str()), Some("1180"));
    }

    #[test]
    fn flush_writes_every_slot() {
        let mut store = memory_store();
        store.flush().expect("flush");
        for slot in Slot::ALL {
            assert!(store.storage().get(slot).is_some(), "slot {} missing", slot.key());
        }
        assert_eq!(store.storage().get(Slot::CurrentUser), Some("null\n"));
    }

    #[test]
    fn rejected_operations_do_not_write() {
        let mut store = memory_store();
        let _ = store.authenticate("admin", "nope");
        let _ = store.cast_vote("1", "1-1");
        let _ = store.delete_poll("1");
        assert_eq!(store.storage(), &MemoryStorage::new());
    }
}
