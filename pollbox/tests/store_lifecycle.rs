//! File-backed lifecycle tests for the voting store.
//!
//! Each test drives a `VotingStore` over `FileStorage` in a scratch root, then
//! reopens it from disk to check what a second process would see.

use std::fs;

use anyhow::{Result, bail};
use pollbox::core::invariants::validate_invariants;
use pollbox::core::types::Rejection;
use pollbox::io::config::PollboxConfig;
use pollbox::io::storage::{FileStorage, Slot, SlotStorage};
use pollbox::seed::seed_feedback;
use pollbox::store::VotingStore;
use pollbox::test_support::{ManualClock, TestRoot, at};

fn open(root: &TestRoot, clock: &ManualClock) -> VotingStore<FileStorage> {
    VotingStore::open(
        root.paths.storage(),
        Box::new(clock.clone()),
        PollboxConfig::default(),
    )
    .expect("open store")
}

#[test]
fn vote_switch_survives_restart() {
    let root = TestRoot::new().expect("root");
    let clock = ManualClock::new(at(2025, 3, 20));

    let mut store = open(&root, &clock);
    store.authenticate("1003", "321").expect("login");
    let change = store.cast_vote("3", "3-2").expect("switch");
    assert_eq!(change.removed_from.as_deref(), Some("3-1"));
    drop(store);
    assert!(root.path().join(".pollbox/state/users.json").exists());

    let store = open(&root, &clock);
    assert_eq!(store.current_user().map(|user| user.id.as_str()), Some("1003"));
    let poll = store.poll("3").expect("poll 3");
    assert_eq!(poll.option("3-1").expect("cricket").votes, 2);
    assert_eq!(poll.option("3-2").expect("football").votes, 2);
    assert_eq!(poll.option("3-3").expect("badminton").votes, 1);
    assert_eq!(
        store.user("1003").expect("user").voted_option("3"),
        Some("3-2")
    );
    assert!(validate_invariants(store.snapshot()).is_empty());
}

/// Admin creates a poll with an end date, a provisioned employee votes, the
/// poll expires, and the admin deletes it.
#[test]
fn poll_lifecycle_from_creation_to_deletion() {
    let root = TestRoot::new().expect("root");
    let clock = ManualClock::new(at(2025, 1, 20));

    let mut store = open(&root, &clock);
    store.authenticate("admin", "123").expect("admin");
    let poll_id = store
        .create_poll("Team lunch", "Friday", &["Pizza", "Sushi"], Some(at(2025, 2, 1)))
        .expect("create");
    store.end_session();

    let mut store = open(&root, &clock);
    store.authenticate("1150", "321").expect("provision");
    let sushi = store.poll(&poll_id).expect("poll").options[1].id.clone();
    store.cast_vote(&poll_id, &sushi).expect("vote");

    clock.set(at(2025, 2, 2));
    let mut store = open(&root, &clock);
    assert!(matches!(
        store.retract_vote(&poll_id),
        Err(Rejection::PollClosed(_))
    ));
    assert_eq!(
        store.poll(&poll_id).expect("poll").option(&sushi).expect("sushi").votes,
        1
    );
    store.end_session();
    store.authenticate("admin", "123").expect("admin");
    store.delete_poll(&poll_id).expect("delete");

    let store = open(&root, &clock);
    assert!(store.poll(&poll_id).is_none());
    assert!(store.poll("1").is_some());
    assert_eq!(store.user("1150").expect("provisioned").voted_option(&poll_id), None);
    assert!(validate_invariants(store.snapshot()).is_empty());
}

#[test]
fn missing_slot_file_falls_back_to_seed() {
    let root = TestRoot::new().expect("root");
    let clock = ManualClock::new(at(2025, 1, 20));
    let mut store = open(&root, &clock);
    store.authenticate("1002", "321").expect("login");
    store.record_feedback("Add dark mode").expect("feedback");
    drop(store);

    fs::remove_file(root.paths.storage().slot_path(Slot::Feedback)).expect("remove feedback");
    let store = open(&root, &clock);
    assert_eq!(store.feedback(), seed_feedback().as_slice());
    assert_eq!(store.current_user().map(|user| user.id.as_str()), Some("1002"));
}

/// File storage whose `users` slot cannot be written.
struct UsersWriteFails {
    inner: FileStorage,
}

impl SlotStorage for UsersWriteFails {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        self.inner.read(slot)
    }

    fn write(&mut self, slot: Slot, payload: &str) -> Result<()> {
        if slot == Slot::Users {
            bail!("users slot unavailable");
        }
        self.inner.write(slot, payload)
    }
}

#[test]
fn missing_users_slot_drops_votes_of_unknown_users() {
    let root = TestRoot::new().expect("root");
    let clock = ManualClock::new(at(2025, 1, 20));
    let mut store = open(&root, &clock);
    store.authenticate("1150", "321").expect("provision");
    store.cast_vote("1", "1-2").expect("vote");
    drop(store);

    fs::remove_file(root.paths.storage().slot_path(Slot::Users)).expect("remove users");
    let store = open(&root, &clock);
    assert!(store.user("1150").is_none());
    assert_eq!(store.current_user(), None);
    let mumbai = store.poll("1").expect("poll 1").option("1-2").expect("mumbai");
    assert_eq!(mumbai.votes, 1);
    assert!(!mumbai.voted_by.contains("1150"));
    assert!(validate_invariants(store.snapshot()).is_empty());
}

#[test]
fn failed_users_write_is_reconciled_on_reopen() {
    let root = TestRoot::new().expect("root");
    let clock = ManualClock::new(at(2025, 1, 20));
    let mut store = VotingStore::open(
        UsersWriteFails {
            inner: root.paths.storage(),
        },
        Box::new(clock.clone()),
        PollboxConfig::default(),
    )
    .expect("open");
    store.authenticate("1001", "321").expect("login");
    store.cast_vote("1", "1-2").expect("switch");
    let err = store.take_persist_error().expect("users write failed");
    assert!(format!("{err:#}").contains("users slot unavailable"));
    drop(store);

    let store = open(&root, &clock);
    let poll = store.poll("1").expect("poll 1");
    assert_eq!(poll.option("1-1").expect("bangalore").votes, 1);
    assert_eq!(poll.option("1-2").expect("mumbai").votes, 2);
    assert_eq!(store.user("1001").expect("user").voted_option("1"), Some("1-2"));
    assert!(validate_invariants(store.snapshot()).is_empty());
}

#[test]
fn corrupt_slot_file_fails_to_open() {
    let root = TestRoot::new().expect("root");
    fs::write(root.paths.storage().slot_path(Slot::Polls), "{not json").expect("corrupt");

    let err = VotingStore::open(
        root.paths.storage(),
        Box::new(ManualClock::new(at(2025, 1, 20))),
        PollboxConfig::default(),
    )
    .err()
    .expect("corrupt slot must fail");
    assert!(format!("{err:#}").contains("parse slot polls"));
}

#[test]
fn failed_write_keeps_in_memory_state() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "not a directory").expect("blocker");

    let mut store = VotingStore::open(
        FileStorage::new(blocker.join("state")),
        Box::new(ManualClock::new(at(2025, 1, 20))),
        PollboxConfig::default(),
    )
    .expect("open over seed");
    store.authenticate("1001", "321").expect("login still succeeds");

    assert_eq!(store.current_user().map(|user| user.id.as_str()), Some("1001"));
    let err = store.take_persist_error().expect("write failure reported");
    assert!(format!("{err:#}").contains("write slot currentUser"));
    assert!(store.take_persist_error().is_none());
}
