//! Corpus providers.
//!
//! The managers never parse storage formats; they are handed already
//! materialized records. Persistent backends implement these traits outside
//! this crate; the in-memory versions here back the sample corpus and tests.

use crate::error::{MorphError, Result};
use crate::model::MorphEntry;

pub trait Provider<T>: Send + Sync {
    fn values(&self) -> Result<Vec<T>>;
}

/// The mutable entry corpus.
pub trait EntryStore: Provider<MorphEntry> {
    /// Persist a new entry and return its id.
    fn insert(&mut self, entry: MorphEntry) -> Result<u32>;
    fn update(&mut self, entry: &MorphEntry) -> Result<()>;
    fn delete(&mut self, id: u32) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider<T> {
    values: Vec<T>,
}

impl<T> MemoryProvider<T> {
    pub fn new(values: Vec<T>) -> Self {
        MemoryProvider { values }
    }
}

impl<T: Clone + Send + Sync> Provider<T> for MemoryProvider<T> {
    fn values(&self) -> Result<Vec<T>> {
        Ok(self.values.clone())
    }
}

/// In-memory entry store. Changes become visible to `values` only after
/// `commit`.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    committed: Vec<MorphEntry>,
    working: Vec<MorphEntry>,
    next_id: u32,
}

impl MemoryEntryStore {
    pub fn new(entries: Vec<MorphEntry>) -> Self {
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        MemoryEntryStore { committed: entries.clone(), working: entries, next_id }
    }

    fn position(&self, id: u32) -> Result<usize> {
        self.working.iter().position(|e| e.id == id).ok_or(MorphError::EntryNotFound(id))
    }
}

impl Provider<MorphEntry> for MemoryEntryStore {
    fn values(&self) -> Result<Vec<MorphEntry>> {
        Ok(self.committed.clone())
    }
}

impl EntryStore for MemoryEntryStore {
    fn insert(&mut self, mut entry: MorphEntry) -> Result<u32> {
        let id = self.next_id;
        self.next_id += 1;
        entry.id = id;
        self.working.push(entry);
        Ok(id)
    }

    fn update(&mut self, entry: &MorphEntry) -> Result<()> {
        let at = self.position(entry.id)?;
        self.working[at] = entry.clone();
        Ok(())
    }

    fn delete(&mut self, id: u32) -> Result<()> {
        let at = self.position(id)?;
        self.working.remove(at);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = self.working.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameters;

    #[test]
    fn entry_store_assigns_ids_and_commits() {
        let mut store = MemoryEntryStore::new(vec![MorphEntry::atom(4, "buddha", Parameters::EMPTY)]);
        let id = store.insert(MorphEntry::atom(0, "dhamma", Parameters::EMPTY)).unwrap();
        assert_eq!(id, 5);
        assert_eq!(store.values().unwrap().len(), 1);

        store.commit().unwrap();
        assert_eq!(store.values().unwrap().len(), 2);

        store.delete(4).unwrap();
        assert!(matches!(store.delete(4), Err(MorphError::EntryNotFound(4))));
        store.commit().unwrap();
        assert_eq!(store.values().unwrap().iter().map(|e| e.id).collect::<Vec<_>>(), vec![5]);
    }
}
