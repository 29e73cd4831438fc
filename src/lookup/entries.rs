//! Entry resolver: dictionary lookups and corpus mutation.
//!
//! A lookup runs a fixed chain of filters, each one short-circuiting on an empty
//! candidate set:
//!
//! ```text
//! surface (exact | `*` wildcard)
//!   └─▶ left/right linkage (side present, id-equal if id>0, text-equal if non-empty)
//!        └─▶ parameters (per query slot: entry slot 0 or equal)
//!             └─▶ base (query Unknown = any; entry Unknown = wildcard)
//!                  └─▶ virtuality (exact unless "don't care")
//! ```
//!
//! The resident corpus sits behind a read/write lock so that
//! `insert`/`update`/`delete` can run between analyses; every mutation drops the
//! memo table, since cached answers may no longer hold.

use super::memo::Memo;
use super::pattern::Wildcard;
use super::provider::EntryStore;
use crate::error::{MorphError, Result, ensure_active};
use crate::model::{EntryRef, MorphBase, MorphEntry};
use crate::parameters::Parameters;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A full entry lookup.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery<'a> {
    pub entry: &'a str,
    pub parameters: Parameters,
    pub base: MorphBase,
    /// `None` = don't care.
    pub is_virtual: Option<bool>,
    pub left: Option<&'a EntryRef>,
    pub right: Option<&'a EntryRef>,
}

impl<'a> EntryQuery<'a> {
    pub fn surface(entry: &'a str) -> Self {
        EntryQuery { entry, ..EntryQuery::default() }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_base(mut self, base: MorphBase) -> Self {
        self.base = base;
        self
    }

    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = Some(is_virtual);
        self
    }

    pub fn with_left(mut self, left: &'a EntryRef) -> Self {
        self.left = Some(left);
        self
    }

    pub fn with_right(mut self, right: &'a EntryRef) -> Self {
        self.right = Some(right);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    entry: String,
    parameters: Parameters,
    base: MorphBase,
    is_virtual: Option<bool>,
}

#[derive(Debug, Default)]
struct Resident {
    entries: Vec<MorphEntry>,
    by_id: HashMap<u32, usize>,
    by_surface: HashMap<String, Vec<usize>>,
}

impl Resident {
    fn new(entries: Vec<MorphEntry>) -> Self {
        let mut resident = Resident { entries, ..Resident::default() };
        resident.reindex();
        resident
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_surface.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.by_id.insert(entry.id, idx);
            self.by_surface.entry(entry.entry.clone()).or_default().push(idx);
        }
    }
}

pub struct EntryResolver {
    resident: RwLock<Resident>,
    store: Mutex<Box<dyn EntryStore>>,
    memo: Memo<EntryKey, Arc<[MorphEntry]>>,
    patterns: Memo<String, Arc<Wildcard>>,
}

impl std::fmt::Debug for EntryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryResolver")
            .field("entries", &self.len())
            .field("memo", &self.memo)
            .field("store", &"<store>")
            .finish()
    }
}

impl EntryResolver {
    pub fn new(store: Box<dyn EntryStore>) -> Result<Self> {
        let entries = store.values()?;
        for entry in &entries {
            entry.check_links()?;
        }
        Ok(EntryResolver {
            resident: RwLock::new(Resident::new(entries)),
            store: Mutex::new(store),
            memo: Memo::new("entries.values"),
            patterns: Memo::new("entries.patterns"),
        })
    }

    pub fn len(&self) -> usize {
        self.resident.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact lookup by id.
    pub fn value(&self, id: u32) -> Result<MorphEntry> {
        let resident = self.resident.read();
        resident.by_id.get(&id).map(|&idx| resident.entries[idx].clone()).ok_or(MorphError::EntryNotFound(id))
    }

    /// Run the full filter chain.
    pub fn values(&self, query: &EntryQuery<'_>, cancel: &CancellationToken) -> Result<Vec<MorphEntry>> {
        ensure_active(cancel)?;
        let resident = self.resident.read();

        // surface
        let mut candidates: Vec<&MorphEntry> = if Wildcard::is_wildcard(query.entry) {
            let pattern = self.pattern(query.entry)?;
            resident.entries.iter().filter(|e| pattern.is_match(&e.entry)).collect()
        } else {
            resident
                .by_surface
                .get(query.entry)
                .map(|ids| ids.iter().map(|&i| &resident.entries[i]).collect())
                .unwrap_or_default()
        };

        // linkage
        for (constraint, side) in [(query.left, Side::Left), (query.right, Side::Right)] {
            let Some(constraint) = constraint else { continue };
            if candidates.is_empty() {
                return Ok(Vec::new());
            }
            ensure_active(cancel)?;
            candidates.retain(|e| side.of(e).is_some_and(|link| links_to(link, constraint)));
        }

        // parameters
        for slot in query.parameters.mask().indices() {
            if candidates.is_empty() {
                return Ok(Vec::new());
            }
            ensure_active(cancel)?;
            let value = query.parameters.slots()[slot];
            candidates.retain(|e| {
                let have = e.parameters.slots()[slot];
                have == 0 || have == value
            });
        }

        // base
        if query.base != MorphBase::Unknown {
            candidates.retain(|e| e.base == MorphBase::Unknown || e.base == query.base);
        }

        // virtuality
        if let Some(is_virtual) = query.is_virtual {
            candidates.retain(|e| e.is_virtual == is_virtual);
        }

        Ok(candidates.into_iter().cloned().collect())
    }

    /// Memoized lookup without linkage constraints.
    pub fn values_and_cache(
        &self,
        entry: &str,
        parameters: Parameters,
        base: MorphBase,
        is_virtual: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Arc<[MorphEntry]>> {
        let key = EntryKey { entry: entry.to_string(), parameters, base, is_virtual };
        self.memo.get_or_try_insert_with(key, || {
            let query = EntryQuery { entry, parameters, base, is_virtual, left: None, right: None };
            Ok(Arc::from(self.values(&query, cancel)?))
        })
    }

    fn pattern(&self, pattern: &str) -> Result<Arc<Wildcard>> {
        self.patterns.get_or_try_insert_with(pattern.to_string(), || Ok(Arc::new(Wildcard::parse(pattern)?)))
    }

    // --- Mutation ---------------------------------------------------------------

    /// Persist a new entry; returns its id.
    pub fn insert(&self, entry: MorphEntry) -> Result<u32> {
        entry.check_links()?;
        let id = self.store.lock().insert(entry.clone())?;
        let mut resident = self.resident.write();
        resident.entries.push(MorphEntry { id, ..entry });
        resident.reindex();
        drop(resident);
        self.invalidate("insert", id);
        Ok(id)
    }

    pub fn update(&self, entry: MorphEntry) -> Result<()> {
        entry.check_links()?;
        let idx = self.resident.read().by_id.get(&entry.id).copied().ok_or(MorphError::EntryNotFound(entry.id))?;
        self.store.lock().update(&entry)?;
        let id = entry.id;
        let mut resident = self.resident.write();
        resident.entries[idx] = entry;
        resident.reindex();
        drop(resident);
        self.invalidate("update", id);
        Ok(())
    }

    pub fn delete(&self, id: u32) -> Result<()> {
        let idx = self.resident.read().by_id.get(&id).copied().ok_or(MorphError::EntryNotFound(id))?;
        self.store.lock().delete(id)?;
        let mut resident = self.resident.write();
        resident.entries.remove(idx);
        resident.reindex();
        drop(resident);
        self.invalidate("delete", id);
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.store.lock().commit()
    }

    fn invalidate(&self, op: &'static str, id: u32) {
        tracing::debug!(op, id, dropped = self.memo.len(), "entry corpus changed; cache dropped");
        self.memo.clear();
    }

    pub fn cached(&self) -> usize {
        self.memo.len() + self.patterns.len()
    }

    pub fn clear(&self) {
        self.memo.clear();
        self.patterns.clear();
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn of(self, entry: &MorphEntry) -> Option<&EntryRef> {
        match self {
            Side::Left => entry.left.as_ref(),
            Side::Right => entry.right.as_ref(),
        }
    }
}

fn links_to(link: &EntryRef, constraint: &EntryRef) -> bool {
    (constraint.id == 0 || link.id == constraint.id) && (constraint.entry.is_empty() || link.entry == constraint.entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MemoryEntryStore;
    use crate::parameters::Category;
    use pretty_assertions::assert_eq;

    fn resolver() -> EntryResolver {
        let noun = Parameters::EMPTY.with(Category::PartOfSpeech, 1);
        let entries = vec![
            MorphEntry::atom(1, "buddha", noun.with(Category::Gender, 1)),
            MorphEntry::atom(2, "dhamma", noun),
            MorphEntry::atom(3, "dhammena", noun.with(Category::Case, 3)).virtual_form(),
            MorphEntry::atom(4, "ena", Parameters::EMPTY.with(Category::Case, 3)),
            MorphEntry::compound(
                5,
                "buddhadhamma",
                noun,
                EntryRef::new(1, "buddha"),
                EntryRef::new(2, "dhamma"),
            ),
            MorphEntry::atom(6, "dhamma", Parameters::EMPTY.with(Category::PartOfSpeech, 2))
                .with_base(MorphBase::Unknown),
        ];
        EntryResolver::new(Box::new(MemoryEntryStore::new(entries))).unwrap()
    }

    fn ids(entries: &[MorphEntry]) -> Vec<u32> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn exact_surface_and_parameters() {
        let r = resolver();
        let cancel = CancellationToken::new();
        assert_eq!(ids(&r.values(&EntryQuery::surface("dhamma"), &cancel).unwrap()), vec![2, 6]);

        let q = EntryQuery::surface("dhamma").with_parameters(Parameters::EMPTY.with(Category::PartOfSpeech, 1));
        assert_eq!(ids(&r.values(&q, &cancel).unwrap()), vec![2]);

        // open slot in the entry accepts any query value
        let q = EntryQuery::surface("buddha").with_parameters(Parameters::EMPTY.with(Category::Case, 5));
        assert_eq!(ids(&r.values(&q, &cancel).unwrap()), vec![1]);
    }

    #[test]
    fn wildcard_is_whole_string() {
        let r = resolver();
        let cancel = CancellationToken::new();
        assert_eq!(ids(&r.values(&EntryQuery::surface("dh*a"), &cancel).unwrap()), vec![2, 6]);
        assert_eq!(ids(&r.values(&EntryQuery::surface("*ena"), &cancel).unwrap()), vec![3, 4]);
        assert!(r.values(&EntryQuery::surface("*x*"), &cancel).unwrap().is_empty());
    }

    #[test]
    fn base_unknown_in_corpus_is_wildcard() {
        let r = resolver();
        let q = EntryQuery::surface("dhamma").with_base(MorphBase::None);
        assert_eq!(ids(&r.values(&q, &CancellationToken::new()).unwrap()), vec![2, 6]);
        let q = EntryQuery::surface("dhamma").with_base(MorphBase::Both);
        assert_eq!(ids(&r.values(&q, &CancellationToken::new()).unwrap()), vec![6]);
    }

    #[test]
    fn virtuality_filter() {
        let r = resolver();
        let cancel = CancellationToken::new();
        assert_eq!(ids(&r.values(&EntryQuery::surface("*ena").with_virtual(true), &cancel).unwrap()), vec![3]);
        assert_eq!(ids(&r.values(&EntryQuery::surface("*ena").with_virtual(false), &cancel).unwrap()), vec![4]);
    }

    #[test]
    fn linkage_constraints() {
        let r = resolver();
        let cancel = CancellationToken::new();
        let by_id = EntryRef::new(1, "");
        let by_text = EntryRef::new(0, "dhamma");
        let wrong = EntryRef::new(2, "");
        assert_eq!(ids(&r.values(&EntryQuery::surface("*").with_left(&by_id), &cancel).unwrap()), vec![5]);
        assert_eq!(ids(&r.values(&EntryQuery::surface("*").with_right(&by_text), &cancel).unwrap()), vec![5]);
        assert!(r.values(&EntryQuery::surface("*").with_left(&wrong), &cancel).unwrap().is_empty());
    }

    #[test]
    fn value_by_id() {
        let r = resolver();
        assert_eq!(r.value(4).unwrap().entry, "ena");
        assert!(matches!(r.value(99), Err(MorphError::EntryNotFound(99))));
    }

    #[test]
    fn mutation_invalidates_cache() {
        let r = resolver();
        let cancel = CancellationToken::new();
        let before = r.values_and_cache("sangha", Parameters::EMPTY, MorphBase::Unknown, None, &cancel).unwrap();
        assert!(before.is_empty());

        let id = r.insert(MorphEntry::atom(0, "sangha", Parameters::EMPTY)).unwrap();
        let after = r.values_and_cache("sangha", Parameters::EMPTY, MorphBase::Unknown, None, &cancel).unwrap();
        assert_eq!(ids(&after), vec![id]);

        r.delete(id).unwrap();
        let gone = r.values_and_cache("sangha", Parameters::EMPTY, MorphBase::Unknown, None, &cancel).unwrap();
        assert!(gone.is_empty());
    }

    #[test]
    fn mutation_rejects_broken_links() {
        let r = resolver();
        let broken = MorphEntry::atom(0, "x", Parameters::EMPTY).with_base(MorphBase::Left);
        assert!(matches!(r.insert(broken), Err(MorphError::Defect(_))));
        assert!(matches!(r.update(MorphEntry::atom(77, "x", Parameters::EMPTY)), Err(MorphError::EntryNotFound(77))));
    }
}
