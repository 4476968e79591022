//! Test-only helpers for building snapshots, stores and scratch roots.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::io::clock::Clock;
use crate::io::config::PollboxConfig;
use crate::io::init::{InitOptions, PollboxPaths, init_pollbox};
use crate::io::storage::MemoryStorage;
use crate::model::{ADMIN_ID, Poll, PollOption, Snapshot, User};
use crate::store::VotingStore;

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid test date")
}

/// Clock whose time is set by the test. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Employee with default profile fields and no votes.
pub fn employee(id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("Employee {id}"),
        email: format!("{id}@company.com"),
        department: "General".to_string(),
        voted_polls: BTreeMap::new(),
        is_admin: false,
    }
}

/// Active poll without end date, created 2025-01-01, with options `<id>-<text>`.
pub fn open_poll(id: &str, texts: &[&str]) -> Poll {
    Poll {
        id: id.to_string(),
        title: format!("{id} title"),
        description: format!("{id} description"),
        options: texts
            .iter()
            .map(|text| PollOption::new(format!("{id}-{text}"), *text))
            .collect(),
        created_by: ADMIN_ID.to_string(),
        created_at: at(2025, 1, 1),
        end_date: None,
        is_active: true,
    }
}

/// Fill option counters with anonymous voters (for tally tests only).
pub fn with_votes(mut poll: Poll, counts: &[u32]) -> Poll {
    for (option, &count) in poll.options.iter_mut().zip(counts) {
        for n in 0..count {
            option.add_voter(&format!("{}-voter-{n}", option.id));
        }
    }
    poll
}

pub fn snapshot_with(polls: Vec<Poll>, users: Vec<User>) -> Snapshot {
    Snapshot {
        polls,
        users,
        session: None,
        feedback: Vec::new(),
    }
}

/// Seeded in-memory store at 2025-01-20, while every seed poll is still open.
pub fn memory_store() -> VotingStore<MemoryStorage> {
    memory_store_at(ManualClock::new(at(2025, 1, 20)))
}

pub fn memory_store_at(clock: ManualClock) -> VotingStore<MemoryStorage> {
    VotingStore::open(
        MemoryStorage::new(),
        Box::new(clock),
        PollboxConfig::default(),
    )
    .expect("open seeded memory store")
}

/// Scratch directory with an initialized `.pollbox/`.
pub struct TestRoot {
    dir: TempDir,
    pub paths: PollboxPaths,
}

impl TestRoot {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let paths = init_pollbox(dir.path(), &InitOptions { force: false })?;
        Ok(Self { dir, paths })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
