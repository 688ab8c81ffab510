//! Remote collection contract and an in-process implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use oneflow_core::{Entity, RecordId};
use tokio::sync::watch;

use crate::error::SyncError;

/// One REST collection (`/api/{resource}/`) as seen by a synchronizer.
#[async_trait]
pub trait RemoteCollection<E: Entity>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<E>, SyncError>;

    async fn fetch(&self, id: &RecordId) -> Result<E, SyncError>;

    async fn create(&self, draft: &E::Draft) -> Result<E, SyncError>;

    async fn update(&self, id: &RecordId, patch: &E::Patch) -> Result<E, SyncError>;

    async fn delete(&self, id: &RecordId) -> Result<(), SyncError>;
}

#[async_trait]
impl<E, R> RemoteCollection<E> for Arc<R>
where
    E: Entity,
    R: RemoteCollection<E> + ?Sized,
{
    async fn fetch_all(&self) -> Result<Vec<E>, SyncError> {
        (**self).fetch_all().await
    }

    async fn fetch(&self, id: &RecordId) -> Result<E, SyncError> {
        (**self).fetch(id).await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, SyncError> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &RecordId, patch: &E::Patch) -> Result<E, SyncError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        (**self).delete(id).await
    }
}

/// Remote operation kinds, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchAll,
    Fetch,
    Create,
    Update,
    Delete,
}

type WriteHook<E> = Box<dyn Fn(&mut E) + Send + Sync>;

/// In-process collection for tests/dev.
///
/// Behaves like the backend: assigns sequential ids on create, merges patches
/// server-side, answers `NotFound` for unknown ids. On top of that it can
/// - fail upcoming calls with a queued error ([`fail_next`](Self::fail_next)),
/// - hold every call at a gate until [`resume`](Self::resume),
/// - rewrite records on every write, standing in for server-computed fields.
pub struct InMemoryCollection<E: Entity> {
    records: Mutex<Vec<E>>,
    next_id: AtomicU64,
    failures: Mutex<VecDeque<(Option<RemoteOp>, SyncError)>>,
    calls: Mutex<HashMap<RemoteOp, usize>>,
    gate: watch::Sender<bool>,
    on_write: Option<WriteHook<E>>,
}

impl<E: Entity> Default for InMemoryCollection<E> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
            gate: watch::Sender::new(true),
            on_write: None,
        }
    }
}

impl<E: Entity> core::fmt::Debug for InMemoryCollection<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryCollection")
            .field("resource", &E::RESOURCE)
            .field("records", &lock(&self.records).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<E: Entity> InMemoryCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `records` already stored server-side. Generated ids
    /// continue after the largest numeric id seeded.
    pub fn with_records(records: Vec<E>) -> Self {
        let next = records
            .iter()
            .filter_map(|r| r.id().as_str().parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        let collection = Self::default();
        *lock(&collection.records) = records;
        collection.next_id.store(next, Ordering::SeqCst);
        collection
    }

    /// Run `hook` on every record the backend stores through create/update.
    pub fn on_write(mut self, hook: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.on_write = Some(Box::new(hook));
        self
    }

    /// Server-side contents.
    pub fn records(&self) -> Vec<E> {
        lock(&self.records).clone()
    }

    /// Fail the next call of any kind with `err`.
    pub fn fail_next(&self, err: SyncError) {
        lock(&self.failures).push_back((None, err));
    }

    /// Fail the next call of kind `op` with `err`.
    pub fn fail_next_on(&self, op: RemoteOp, err: SyncError) {
        lock(&self.failures).push_back((Some(op), err));
    }

    /// Calls received for `op`, including failed ones.
    pub fn calls(&self, op: RemoteOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Hold every subsequent call until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    async fn enter(&self, op: RemoteOp) -> Result<(), SyncError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;

        let mut open = self.gate.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = open.wait_for(|open| *open).await;

        let mut failures = lock(&self.failures);
        match failures.iter().position(|(target, _)| target.is_none_or(|t| t == op)) {
            Some(pos) => match failures.remove(pos) {
                Some((_, err)) => Err(err),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn stamp(&self, record: &mut E) {
        if let Some(hook) = &self.on_write {
            hook(record);
        }
    }
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for InMemoryCollection<E> {
    async fn fetch_all(&self) -> Result<Vec<E>, SyncError> {
        self.enter(RemoteOp::FetchAll).await?;
        Ok(self.records())
    }

    async fn fetch(&self, id: &RecordId) -> Result<E, SyncError> {
        self.enter(RemoteOp::Fetch).await?;
        lock(&self.records)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.clone()))
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, SyncError> {
        self.enter(RemoteOp::Create).await?;
        E::validate_draft(draft)?;

        let id = RecordId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut record = E::from_draft(id, draft);
        self.stamp(&mut record);
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &RecordId, patch: &E::Patch) -> Result<E, SyncError> {
        self.enter(RemoteOp::Update).await?;
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        record.apply_patch(patch);
        self.stamp(record);
        Ok(record.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        self.enter(RemoteOp::Delete).await?;
        let mut records = lock(&self.records);
        let pos = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        records.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneflow_core::Amount;
    use oneflow_sales::{SalesOrder, SalesOrderDraft, SalesOrderPatch, SalesOrderStatus};

    #[tokio::test]
    async fn assigns_sequential_ids_after_seeded_ones() {
        let seeded = SalesOrder::from_draft(RecordId::from("41"), &SalesOrderDraft::new("SO-1", "Acme"));
        let remote = InMemoryCollection::with_records(vec![seeded]);

        let created = remote.create(&SalesOrderDraft::new("SO-2", "Acme")).await.unwrap();
        assert_eq!(created.id, RecordId::from("42"));
        assert_eq!(remote.records().len(), 2);
    }

    #[tokio::test]
    async fn targeted_failures_only_hit_their_operation() {
        let remote = InMemoryCollection::<SalesOrder>::new();
        remote.fail_next_on(RemoteOp::Delete, SyncError::server(500, "boom"));

        assert!(remote.fetch_all().await.is_ok());
        assert_eq!(
            remote.delete(&RecordId::from("1")).await,
            Err(SyncError::server(500, "boom"))
        );
        assert_eq!(
            remote.delete(&RecordId::from("1")).await,
            Err(SyncError::NotFound(RecordId::from("1")))
        );
        assert_eq!(remote.calls(RemoteOp::Delete), 2);
    }

    #[tokio::test]
    async fn write_hook_applies_server_side_fields() {
        let remote = InMemoryCollection::<SalesOrder>::new().on_write(|o| {
            if o.amount.is_zero() {
                o.amount = Amount::from_major(1);
            }
        });
        let created = remote.create(&SalesOrderDraft::new("SO-3", "Acme")).await.unwrap();
        let updated = remote
            .update(&created.id, &SalesOrderPatch::status(SalesOrderStatus::Confirmed))
            .await
            .unwrap();

        assert_eq!(created.amount, Amount::from_major(1));
        assert_eq!(updated.status, SalesOrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn rejects_invalid_drafts_like_the_backend() {
        let remote = InMemoryCollection::<SalesOrder>::new();
        let res = remote.create(&SalesOrderDraft::new("", "Acme")).await;
        assert!(matches!(res, Err(SyncError::Validation(_))));
        assert!(remote.records().is_empty());
    }
}
