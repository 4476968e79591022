//! Durable key-value storage for the four store slots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// One independently persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Polls,
    Users,
    CurrentUser,
    Feedback,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Polls, Slot::Users, Slot::CurrentUser, Slot::Feedback];

    /// Storage key of the slot.
    pub fn key(self) -> &'static str {
        match self {
            Slot::Polls => "polls",
            Slot::Users => "users",
            Slot::CurrentUser => "currentUser",
            Slot::Feedback => "feedback",
        }
    }
}

/// Whole-value reads and writes of string payloads keyed by slot.
///
/// `read` returns `Ok(None)` for a slot that has never been written.
pub trait SlotStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>>;
    fn write(&mut self, slot: Slot, payload: &str) -> Result<()>;
}

/// One `<key>.json` file per slot inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn slot_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.json", slot.key()))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        if !path.exists() {
            debug!(slot = slot.key(), path = %path.display(), "slot absent");
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read slot {}", path.display()))?;
        Ok(Some(contents))
    }

    fn write(&mut self, slot: Slot, payload: &str) -> Result<()> {
        let path = self.slot_path(slot);
        debug!(slot = slot.key(), path = %path.display(), bytes = payload.len(), "writing slot");
        write_atomic(&path, payload)
    }
}

/// In-memory storage. Cloning it captures the persisted state, which lets tests
/// simulate a restart by building a second store from the clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    slots: BTreeMap<Slot, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        Ok(self.slots.get(&slot).cloned())
    }

    fn write(&mut self, slot: Slot, payload: &str) -> Result<()> {
        self.slots.insert(slot, payload.to_string());
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("slot path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp slot {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace slot {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_reads_none_until_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut storage = FileStorage::new(temp.path().join("state"));
        assert_eq!(storage.read(Slot::Polls).expect("read"), None);

        storage.write(Slot::Polls, "[]\n").expect("write");
        assert_eq!(storage.read(Slot::Polls).expect("read").as_deref(), Some("[]\n"));
        assert!(temp.path().join("state/polls.json").exists());
        assert!(!temp.path().join("state/polls.json.tmp").exists());
    }

    #[test]
    fn file_storage_uses_slot_keys_as_file_names() {
        let storage = FileStorage::new("/tmp/state");
        assert_eq!(
            storage.slot_path(Slot::CurrentUser),
            PathBuf::from("/tmp/state/currentUser.json")
        );
    }

    #[test]
    fn memory_storage_overwrites_whole_slot() {
        let mut storage = MemoryStorage::new();
        storage.write(Slot::Feedback, "[1]").expect("write");
        storage.write(Slot::Feedback, "[2]").expect("write");
        assert_eq!(storage.get(Slot::Feedback), Some("[2]"));
        assert_eq!(storage.read(Slot::Users).expect("read"), None);
    }
}
