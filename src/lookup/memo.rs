//! Typed, concurrent memo tables.

use crate::error::Result;
use dashmap::DashMap;
use std::hash::Hash;

/// Unbounded memo table shared by worker threads.
///
/// Values are pure functions of their keys, so a lost race simply overwrites
/// an entry with an identical value.
pub struct Memo<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    table: DashMap<K, V>,
}

impl<K, V> std::fmt::Debug for Memo<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo").field("name", &self.name).field("len", &self.table.len()).finish()
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Memo { name, table: DashMap::new() }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.table.get(key).map(|v| v.value().clone())
    }

    /// Return the memoized value or compute, store and return it.
    ///
    /// A failing `compute` stores nothing.
    pub fn get_or_try_insert_with(&self, key: K, compute: impl FnOnce() -> Result<V>) -> Result<V> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        tracing::trace!(memo = self.name, key = ?key, "memo miss");
        self.table.insert(key, value.clone());
        Ok(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MorphError;

    #[test]
    fn computes_once_per_key() {
        let memo: Memo<u32, String> = Memo::new("test");
        let mut calls = 0;
        let a = memo.get_or_try_insert_with(1, || {
            calls += 1;
            Ok("one".to_string())
        });
        let b = memo.get_or_try_insert_with(1, || {
            calls += 1;
            Ok("uno".to_string())
        });
        assert_eq!(a.unwrap(), "one");
        assert_eq!(b.unwrap(), "one");
        assert_eq!(calls, 1);
    }

    #[test]
    fn failures_are_not_stored() {
        let memo: Memo<u32, u32> = Memo::new("test");
        assert!(memo.get_or_try_insert_with(7, || Err(MorphError::Cancelled)).is_err());
        assert!(!memo.contains(&7));
        assert!(memo.is_empty());
    }

    #[test]
    fn clear_empties_the_table() {
        let memo: Memo<u32, u32> = Memo::new("test");
        memo.get_or_try_insert_with(1, || Ok(1)).unwrap();
        memo.get_or_try_insert_with(2, || Ok(2)).unwrap();
        assert_eq!(memo.len(), 2);
        memo.clear();
        assert!(memo.is_empty());
    }
}
