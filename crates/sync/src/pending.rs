//! Rollback bookkeeping for one in-flight mutation.

use oneflow_core::{Entity, RecordId};

use crate::cache::EntityCache;

#[derive(Debug)]
enum Undo<E> {
    /// Drop the provisional record of a create.
    Discard(RecordId),
    /// Put the pre-update record back.
    Restore(E),
    /// Re-insert a deleted record at its old index.
    Reinsert(usize, E),
}

/// Pre-mutation snapshot of one optimistic change.
///
/// Settles exactly once: [`commit`](Self::commit) when the backend accepted
/// the change, [`rollback`](Self::rollback) when it did not. A guard dropped
/// unsettled (the caller's future was cancelled mid-flight) rolls back.
pub(crate) struct PendingMutation<'a, E: Entity> {
    cache: &'a EntityCache<E>,
    epoch: u64,
    undo: Option<Undo<E>>,
}

impl<'a, E: Entity> PendingMutation<'a, E> {
    pub(crate) fn created(cache: &'a EntityCache<E>, epoch: u64, provisional: RecordId) -> Self {
        Self::new(cache, epoch, Undo::Discard(provisional))
    }

    pub(crate) fn updated(cache: &'a EntityCache<E>, epoch: u64, snapshot: E) -> Self {
        Self::new(cache, epoch, Undo::Restore(snapshot))
    }

    pub(crate) fn deleted(cache: &'a EntityCache<E>, epoch: u64, index: usize, snapshot: E) -> Self {
        Self::new(cache, epoch, Undo::Reinsert(index, snapshot))
    }

    fn new(cache: &'a EntityCache<E>, epoch: u64, undo: Undo<E>) -> Self {
        Self {
            cache,
            epoch,
            undo: Some(undo),
        }
    }

    /// Accept the optimistic change; the caller writes the server's answer.
    pub(crate) fn commit(mut self) -> u64 {
        self.undo = None;
        self.epoch
    }

    /// Restore the snapshot. False when the cache was replaced meanwhile and
    /// nothing was written.
    pub(crate) fn rollback(mut self) -> bool {
        match self.undo.take() {
            Some(undo) => self.apply(undo),
            None => false,
        }
    }

    fn apply(&self, undo: Undo<E>) -> bool {
        match undo {
            Undo::Discard(id) => self.cache.discard(self.epoch, &id),
            Undo::Restore(snapshot) => {
                let id = snapshot.id().clone();
                self.cache.replace(self.epoch, &id, snapshot)
            }
            Undo::Reinsert(index, snapshot) => self.cache.insert_at(self.epoch, index, snapshot),
        }
    }
}

impl<E: Entity> Drop for PendingMutation<'_, E> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            let restored = self.apply(undo);
            tracing::warn!(
                resource = E::RESOURCE,
                restored,
                "mutation abandoned before settlement, rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneflow_sales::{SalesOrder, SalesOrderDraft, SalesOrderStatus};

    fn order(id: &str) -> SalesOrder {
        SalesOrder::from_draft(RecordId::from(id), &SalesOrderDraft::new(id, "Acme"))
    }

    #[test]
    fn dropped_update_restores_snapshot() {
        let cache = EntityCache::new();
        cache.insert(order("1"));
        let (before, epoch) = cache
            .modify(&RecordId::from("1"), |r| r.status = SalesOrderStatus::Confirmed)
            .unwrap();

        drop(PendingMutation::updated(&cache, epoch, before.clone()));
        assert_eq!(cache.find_by_id(&RecordId::from("1")), Some(before));
    }

    #[test]
    fn committed_mutation_is_left_alone() {
        let cache = EntityCache::new();
        let epoch = cache.insert(order("tmp-1"));

        let pending = PendingMutation::created(&cache, epoch, RecordId::from("tmp-1"));
        assert_eq!(pending.commit(), epoch);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rollback_after_clear_writes_nothing() {
        let cache = EntityCache::new();
        cache.insert(order("1"));
        let (idx, removed, epoch) = cache.remove(&RecordId::from("1")).unwrap();
        let pending = PendingMutation::deleted(&cache, epoch, idx, removed);

        cache.clear();
        assert!(!pending.rollback());
        assert!(cache.is_empty());
    }
}
