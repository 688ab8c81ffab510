//! In-memory ordered record cache.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use oneflow_core::{Entity, RecordId};

#[derive(Debug)]
struct State<E> {
    records: Arc<Vec<E>>,
    epoch: u64,
}

/// Ordered, id-unique collection of one entity type.
///
/// Readers get a shared snapshot (`Arc<Vec<E>>`); writers copy on write, so a
/// snapshot handed out by [`EntityCache::list`] never changes underneath its
/// holder. Mutation is reserved to the owning synchronizer.
///
/// The epoch is bumped whenever the whole contents are replaced or cleared.
/// Settlement of a mutation that started under an older epoch is skipped.
#[derive(Debug)]
pub struct EntityCache<E> {
    state: RwLock<State<E>>,
}

impl<E> Default for EntityCache<E> {
    fn default() -> Self {
        Self {
            state: RwLock::new(State {
                records: Arc::new(Vec::new()),
                epoch: 0,
            }),
        }
    }
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State<E>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<E>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current contents in display order.
    pub fn list(&self) -> Arc<Vec<E>> {
        Arc::clone(&self.read().records)
    }

    pub fn find_by_id(&self, id: &RecordId) -> Option<E> {
        self.read().records.iter().find(|r| r.id() == id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.read().records.iter().any(|r| r.id() == id)
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.read().records.iter().position(|r| r.id() == id)
    }

    pub fn filter(&self, pred: impl Fn(&E) -> bool) -> Vec<E> {
        self.read().records.iter().filter(|r| pred(r)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Swap in a freshly fetched collection. Later duplicates of an id are
    /// dropped; returns how many were dropped.
    pub(crate) fn replace_all(&self, records: Vec<E>) -> usize {
        let total = records.len();
        let mut unique: Vec<E> = Vec::with_capacity(total);
        for record in records {
            if !unique.iter().any(|r| r.id() == record.id()) {
                unique.push(record);
            }
        }
        let dropped = total - unique.len();

        let mut state = self.write();
        state.records = Arc::new(unique);
        state.epoch += 1;
        dropped
    }

    pub(crate) fn clear(&self) {
        let mut state = self.write();
        state.records = Arc::new(Vec::new());
        state.epoch += 1;
    }

    /// Append `record`; returns the epoch it was inserted under.
    pub(crate) fn insert(&self, record: E) -> u64 {
        let mut state = self.write();
        Arc::make_mut(&mut state.records).push(record);
        state.epoch
    }

    /// Apply `f` to the record with `id` in place.
    ///
    /// Returns the record as it was before `f` ran, plus the epoch.
    pub(crate) fn modify(&self, id: &RecordId, f: impl FnOnce(&mut E)) -> Option<(E, u64)> {
        let mut state = self.write();
        let pos = state.records.iter().position(|r| r.id() == id)?;
        let records = Arc::make_mut(&mut state.records);
        let before = records[pos].clone();
        f(&mut records[pos]);
        Some((before, state.epoch))
    }

    /// Remove the record with `id`; returns it with its former index and the epoch.
    pub(crate) fn remove(&self, id: &RecordId) -> Option<(usize, E, u64)> {
        let mut state = self.write();
        let pos = state.records.iter().position(|r| r.id() == id)?;
        let removed = Arc::make_mut(&mut state.records).remove(pos);
        Some((pos, removed, state.epoch))
    }

    /// Put `record` where `id` currently sits.
    ///
    /// If `record` carries a different id that is already cached elsewhere,
    /// the entry for `id` is dropped instead so ids stay unique. No-op (false)
    /// when the epoch moved on or `id` is gone.
    pub(crate) fn replace(&self, epoch: u64, id: &RecordId, record: E) -> bool {
        let mut state = self.write();
        if state.epoch != epoch {
            return false;
        }
        let Some(pos) = state.records.iter().position(|r| r.id() == id) else {
            return false;
        };
        let duplicate = record.id() != id && state.records.iter().any(|r| r.id() == record.id());
        let records = Arc::make_mut(&mut state.records);
        if duplicate {
            records.remove(pos);
        } else {
            records[pos] = record;
        }
        true
    }

    /// Re-insert `record` at `index` (clamped to the current length).
    pub(crate) fn insert_at(&self, epoch: u64, index: usize, record: E) -> bool {
        let mut state = self.write();
        if state.epoch != epoch || state.records.iter().any(|r| r.id() == record.id()) {
            return false;
        }
        let records = Arc::make_mut(&mut state.records);
        let index = index.min(records.len());
        records.insert(index, record);
        true
    }

    /// Remove `id` unless the epoch moved on.
    pub(crate) fn discard(&self, epoch: u64, id: &RecordId) -> bool {
        let mut state = self.write();
        if state.epoch != epoch {
            return false;
        }
        let Some(pos) = state.records.iter().position(|r| r.id() == id) else {
            return false;
        };
        Arc::make_mut(&mut state.records).remove(pos);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneflow_sales::{SalesOrder, SalesOrderDraft};

    fn order(id: &str) -> SalesOrder {
        SalesOrder::from_draft(RecordId::from(id), &SalesOrderDraft::new(id, "Acme"))
    }

    fn ids(cache: &EntityCache<SalesOrder>) -> Vec<String> {
        cache.list().iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn replace_all_keeps_first_of_duplicate_ids() {
        let cache = EntityCache::new();
        let dropped = cache.replace_all(vec![order("1"), order("2"), order("1")]);
        assert_eq!(dropped, 1);
        assert_eq!(ids(&cache), vec!["1", "2"]);
        assert_eq!(cache.epoch(), 1);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_writes() {
        let cache = EntityCache::new();
        cache.insert(order("1"));
        let before = cache.list();
        cache.insert(order("2"));

        assert_eq!(before.len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn stale_epoch_writes_are_ignored() {
        let cache = EntityCache::new();
        let epoch = cache.insert(order("1"));
        cache.clear();

        assert!(!cache.replace(epoch, &RecordId::from("1"), order("1")));
        assert!(!cache.insert_at(epoch, 0, order("9")));
        assert!(!cache.discard(epoch, &RecordId::from("1")));
        assert!(cache.is_empty());
    }

    #[test]
    fn replace_with_already_cached_id_drops_the_placeholder() {
        let cache = EntityCache::new();
        cache.insert(order("7"));
        let epoch = cache.insert(order("tmp-a"));

        assert!(cache.replace(epoch, &RecordId::from("tmp-a"), order("7")));
        assert_eq!(ids(&cache), vec!["7"]);
    }

    #[test]
    fn insert_at_restores_position_and_clamps() {
        let cache = EntityCache::new();
        cache.replace_all(vec![order("1"), order("2"), order("3")]);
        let (pos, removed, epoch) = cache.remove(&RecordId::from("2")).unwrap();
        assert_eq!(pos, 1);

        assert!(cache.insert_at(epoch, pos, removed));
        assert_eq!(ids(&cache), vec!["1", "2", "3"]);

        assert!(cache.insert_at(epoch, 99, order("4")));
        assert_eq!(ids(&cache), vec!["1", "2", "3", "4"]);
        assert!(!cache.insert_at(epoch, 0, order("4")));
    }

    #[test]
    fn modify_returns_previous_value() {
        let cache = EntityCache::new();
        cache.insert(order("1"));
        let (before, _) = cache
            .modify(&RecordId::from("1"), |r| r.description = "rush".into())
            .unwrap();

        assert_eq!(before.description, "");
        assert_eq!(cache.find_by_id(&RecordId::from("1")).unwrap().description, "rush");
        assert!(cache.modify(&RecordId::from("2"), |_| {}).is_none());
    }
}
