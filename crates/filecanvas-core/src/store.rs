//! Client-side file store.
//!
//! The store is the single owner of [`FileEntry`] values. Local optimistic
//! intents and remote deltas both end in the same three idempotent
//! operations.

use crate::file::{FileEntry, FileId};

/// Authoritative local mapping of file id to entry, newest first.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    entries: Vec<FileEntry>,
}

impl FileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries, most recently added first.
    pub fn list(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Get an entry by id.
    pub fn get(&self, id: FileId) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Check whether an entry with this id is live.
    pub fn contains(&self, id: FileId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry unless one with the same id is already live.
    /// Returns true if the entry was inserted.
    pub fn apply_add(&mut self, entry: FileEntry) -> bool {
        if self.contains(entry.id) {
            log::debug!("Ignoring duplicate add for file {}", entry.id);
            return false;
        }
        self.entries.insert(0, entry);
        true
    }

    /// Remove an entry. No-op if absent.
    pub fn apply_remove(&mut self, id: FileId) -> Option<FileEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Reposition an entry. No-op if absent.
    /// Returns true if the entry exists.
    pub fn apply_move(&mut self, id: FileId, x: f64, y: f64) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.x = x;
                entry.y = y;
                true
            }
            None => false,
        }
    }

    /// Replace the contents with a freshly fetched list, keeping the
    /// server's order. Later duplicates of an id are dropped. This is the
    /// initial-load and refresh path; it only uses the apply operations.
    pub fn replace_all(&mut self, entries: Vec<FileEntry>) {
        let stale: Vec<FileId> = self.entries.iter().map(|e| e.id).collect();
        for id in stale {
            self.apply_remove(id);
        }
        // apply_add prepends, so feed the list back to front.
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<FileEntry> = entries.into_iter().filter(|e| seen.insert(e.id)).collect();
        for entry in unique.into_iter().rev() {
            self.apply_add(entry);
        }
    }
}
