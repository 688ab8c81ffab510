//! Optimistic create/update/delete with reconciliation and rollback.

use std::sync::Arc;

use oneflow_core::{Entity, ProjectScoped, RecordId};
use oneflow_events::{EventBus, InMemoryEventBus, MutationKind, Subscription, SyncEvent};

use crate::cache::EntityCache;
use crate::error::SyncError;
use crate::locks::KeyedLocks;
use crate::pending::PendingMutation;
use crate::remote::RemoteCollection;
use crate::retry::RetryConfig;

struct Inner<E: Entity, R> {
    cache: EntityCache<E>,
    remote: R,
    locks: KeyedLocks,
    retry: RetryConfig,
    events: Arc<InMemoryEventBus<SyncEvent>>,
}

/// Sole writer of one [`EntityCache`], mirroring it against one remote collection.
///
/// Each mutation goes Idle → OptimisticallyApplied → Reconciled | RolledBack.
/// Failures restore the cache to exactly its pre-call state and are returned
/// unchanged. Cloning is cheap and every clone shares the same cache.
pub struct Synchronizer<E: Entity, R> {
    inner: Arc<Inner<E, R>>,
}

impl<E: Entity, R> Clone for Synchronizer<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity, R> core::fmt::Debug for Synchronizer<E, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("resource", &E::RESOURCE)
            .field("records", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl<E, R> Synchronizer<E, R>
where
    E: Entity,
    R: RemoteCollection<E>,
{
    /// Default retry policy and a private event bus.
    pub fn new(remote: R) -> Self {
        Self::with_parts(remote, RetryConfig::default(), Arc::new(InMemoryEventBus::new()))
    }

    pub fn with_parts(remote: R, retry: RetryConfig, events: Arc<InMemoryEventBus<SyncEvent>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: EntityCache::new(),
                remote,
                locks: KeyedLocks::new(),
                retry,
                events,
            }),
        }
    }

    /// Read-only view of the cache.
    pub fn cache(&self) -> &EntityCache<E> {
        &self.inner.cache
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    pub fn get(&self, id: &RecordId) -> Option<E> {
        self.inner.cache.find_by_id(id)
    }

    pub fn list(&self) -> Arc<Vec<E>> {
        self.inner.cache.list()
    }

    pub fn filter(&self, pred: impl Fn(&E) -> bool) -> Vec<E> {
        self.inner.cache.filter(pred)
    }

    /// Settlement notifications for this collection (and any other sharing the bus).
    pub fn subscribe(&self) -> Subscription<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Replace the cache with the backend's full collection.
    ///
    /// Records that belong to a sibling collection on the same endpoint are
    /// skipped. On failure the cache keeps its current contents.
    pub async fn load(&self) -> Result<usize, SyncError> {
        let inner = &self.inner;
        let fetched = inner
            .retry
            .fetch
            .run(E::RESOURCE, || inner.remote.fetch_all())
            .await;

        match fetched {
            Ok(records) => {
                let own: Vec<E> = records.into_iter().filter(E::belongs_to_collection).collect();
                let dropped = inner.cache.replace_all(own);
                if dropped > 0 {
                    tracing::warn!(resource = E::RESOURCE, dropped, "duplicate ids in fetched collection");
                }
                let count = inner.cache.len();
                tracing::info!(resource = E::RESOURCE, count, "collection loaded");
                self.publish(SyncEvent::reconciled(E::RESOURCE, None, MutationKind::Load));
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(resource = E::RESOURCE, error = %err, "collection load failed");
                self.publish(SyncEvent::rolled_back(E::RESOURCE, None, MutationKind::Load, &err));
                Err(err)
            }
        }
    }

    /// Seed an empty cache (e.g. from a local mirror) before the first load.
    /// Returns false and leaves the cache alone when it already has records.
    ///
    /// Provisional (`tmp-`) records are skipped: their creates never settle
    /// into this cache, so they could be neither updated nor deleted.
    pub fn hydrate(&self, records: Vec<E>) -> bool {
        if !self.inner.cache.is_empty() {
            return false;
        }
        let settled: Vec<E> = records.into_iter().filter(|r| !r.id().is_provisional()).collect();
        self.inner.cache.replace_all(settled);
        true
    }

    /// Drop every cached record. Mutations still in flight will not write back.
    pub fn discard(&self) {
        self.inner.cache.clear();
        tracing::debug!(resource = E::RESOURCE, "cache discarded");
    }

    /// Create a record.
    ///
    /// A provisional record (`tmp-` id) is appended immediately and replaced
    /// in place by the backend's record on success, or removed on failure.
    pub async fn create(&self, draft: E::Draft) -> Result<E, SyncError> {
        E::validate_draft(&draft)?;

        let inner = &self.inner;
        let provisional_id = RecordId::provisional();
        let epoch = inner.cache.insert(E::from_draft(provisional_id.clone(), &draft));
        let pending = PendingMutation::created(&inner.cache, epoch, provisional_id.clone());
        tracing::debug!(resource = E::RESOURCE, id = %provisional_id, "create applied optimistically");

        let outcome = inner
            .retry
            .create
            .run(E::RESOURCE, || inner.remote.create(&draft))
            .await;

        match outcome {
            Ok(record) => {
                let epoch = pending.commit();
                if !inner.cache.replace(epoch, &provisional_id, record.clone()) {
                    tracing::debug!(resource = E::RESOURCE, id = %record.id(), "cache replaced while create was in flight");
                }
                tracing::info!(resource = E::RESOURCE, id = %record.id(), "create reconciled");
                self.publish(SyncEvent::reconciled(
                    E::RESOURCE,
                    Some(record.id().clone()),
                    MutationKind::Create,
                ));
                Ok(record)
            }
            Err(err) => {
                pending.rollback();
                Err(self.rolled_back(MutationKind::Create, &provisional_id, err))
            }
        }
    }

    /// Shallow-merge `patch` into the record with `id`.
    ///
    /// On success the cached record is the backend's answer, not the local
    /// merge. On `Conflict` the backend's current record is adopted and the
    /// conflict is still returned.
    pub async fn update(&self, id: &RecordId, patch: E::Patch) -> Result<E, SyncError> {
        let inner = &self.inner;
        if id.is_provisional() || !inner.cache.contains(id) {
            return Err(SyncError::NotFound(id.clone()));
        }

        let _lock = inner.locks.acquire(id).await;
        // Snapshot under the lock: an earlier update on this id has settled by now.
        let Some((snapshot, epoch)) = inner.cache.modify(id, |record| record.apply_patch(&patch)) else {
            return Err(SyncError::NotFound(id.clone()));
        };
        let pending = PendingMutation::updated(&inner.cache, epoch, snapshot);
        tracing::debug!(resource = E::RESOURCE, %id, "update applied optimistically");

        let outcome = inner
            .retry
            .update
            .run(E::RESOURCE, || inner.remote.update(id, &patch))
            .await;

        match outcome {
            Ok(record) => {
                let epoch = pending.commit();
                inner.cache.replace(epoch, id, record.clone());
                tracing::info!(resource = E::RESOURCE, %id, "update reconciled");
                self.publish(SyncEvent::reconciled(E::RESOURCE, Some(id.clone()), MutationKind::Update));
                Ok(record)
            }
            Err(SyncError::Conflict(reason)) => {
                let err = SyncError::Conflict(reason);
                match inner.retry.fetch.run(E::RESOURCE, || inner.remote.fetch(id)).await {
                    Ok(current) => {
                        let epoch = pending.commit();
                        inner.cache.replace(epoch, id, current);
                        tracing::warn!(resource = E::RESOURCE, %id, error = %err, "update conflicted, adopted server record");
                        self.publish(SyncEvent::conflict_resolved(E::RESOURCE, id.clone(), &err));
                        Err(err)
                    }
                    Err(fetch_err) => {
                        tracing::warn!(resource = E::RESOURCE, %id, error = %fetch_err, "conflict refetch failed");
                        pending.rollback();
                        Err(self.rolled_back(MutationKind::Update, id, err))
                    }
                }
            }
            Err(err) => {
                pending.rollback();
                Err(self.rolled_back(MutationKind::Update, id, err))
            }
        }
    }

    /// Remove the record with `id`.
    ///
    /// A failed delete puts the record back at its original index. A remote
    /// `NotFound` means someone else already deleted it and counts as success.
    pub async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        let inner = &self.inner;
        if id.is_provisional() || !inner.cache.contains(id) {
            return Err(SyncError::NotFound(id.clone()));
        }

        let _lock = inner.locks.acquire(id).await;
        let Some((index, snapshot, epoch)) = inner.cache.remove(id) else {
            return Err(SyncError::NotFound(id.clone()));
        };
        let pending = PendingMutation::deleted(&inner.cache, epoch, index, snapshot);
        tracing::debug!(resource = E::RESOURCE, %id, index, "delete applied optimistically");

        let outcome = inner
            .retry
            .delete
            .run(E::RESOURCE, || inner.remote.delete(id))
            .await;

        match outcome {
            Ok(()) | Err(SyncError::NotFound(_)) => {
                pending.commit();
                tracing::info!(resource = E::RESOURCE, %id, "delete reconciled");
                self.publish(SyncEvent::reconciled(E::RESOURCE, Some(id.clone()), MutationKind::Delete));
                Ok(())
            }
            Err(err) => {
                pending.rollback();
                Err(self.rolled_back(MutationKind::Delete, id, err))
            }
        }
    }

    fn rolled_back(&self, kind: MutationKind, id: &RecordId, err: SyncError) -> SyncError {
        tracing::warn!(resource = E::RESOURCE, %id, ?kind, error = %err, "mutation rolled back");
        self.publish(SyncEvent::rolled_back(E::RESOURCE, Some(id.clone()), kind, &err));
        err
    }

    fn publish(&self, event: SyncEvent) {
        if let Err(err) = self.inner.events.publish(event) {
            tracing::warn!(resource = E::RESOURCE, ?err, "failed to publish sync event");
        }
    }
}

impl<E, R> Synchronizer<E, R>
where
    E: Entity + ProjectScoped,
    R: RemoteCollection<E>,
{
    /// Cached records attached to `project_id`, in cache order.
    pub fn by_project(&self, project_id: &RecordId) -> Vec<E> {
        self.filter(|r| r.project_id() == Some(project_id))
    }
}
