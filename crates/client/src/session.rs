//! One signed-in session: a synchronizer per entity over a shared HTTP client.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use oneflow_core::{Entity, RecordId};
use oneflow_events::{EventBus, InMemoryEventBus, Subscription, SyncEvent};
use oneflow_expenses::Expense;
use oneflow_invoicing::{CustomerInvoice, VendorBill};
use oneflow_projects::{Project, Task};
use oneflow_purchasing::PurchaseOrder;
use oneflow_sales::SalesOrder;
use oneflow_sync::{SyncError, Synchronizer};

use crate::config::ClientConfig;
use crate::http::HttpCollection;
use crate::mirror::LocalMirror;

pub type HttpSynchronizer<E> = Synchronizer<E, HttpCollection<E>>;

/// Owns every cache for the signed-in user.
///
/// Passed explicitly to whatever needs the data; there is no global instance.
/// All synchronizers publish onto one event bus, so a single
/// [`subscribe`](Self::subscribe) sees every settlement.
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    events: Arc<InMemoryEventBus<SyncEvent>>,
    pub projects: HttpSynchronizer<Project>,
    pub tasks: HttpSynchronizer<Task>,
    pub sales_orders: HttpSynchronizer<SalesOrder>,
    pub purchase_orders: HttpSynchronizer<PurchaseOrder>,
    pub invoices: HttpSynchronizer<CustomerInvoice>,
    pub bills: HttpSynchronizer<VendorBill>,
    pub expenses: HttpSynchronizer<Expense>,
}

impl Session {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        let events = Arc::new(InMemoryEventBus::new());

        let session = Self {
            projects: synchronizer(&client, &config, &events),
            tasks: synchronizer(&client, &config, &events),
            sales_orders: synchronizer(&client, &config, &events),
            purchase_orders: synchronizer(&client, &config, &events),
            invoices: synchronizer(&client, &config, &events),
            bills: synchronizer(&client, &config, &events),
            expenses: synchronizer(&client, &config, &events),
            events,
            config,
        };
        tracing::info!(
            api_url = %session.config.api_url,
            authenticated = session.config.token.is_some(),
            "session started"
        );
        Ok(session)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Settlement events from every collection in this session.
    pub fn subscribe(&self) -> Subscription<SyncEvent> {
        self.events.subscribe()
    }

    /// Load every collection concurrently.
    ///
    /// All loads run to completion; the first failure (in field order) is
    /// returned. Collections that loaded successfully keep their new contents.
    pub async fn load_all(&self) -> Result<(), SyncError> {
        let results = tokio::join!(
            self.projects.load(),
            self.tasks.load(),
            self.sales_orders.load(),
            self.purchase_orders.load(),
            self.invoices.load(),
            self.bills.load(),
            self.expenses.load(),
        );
        results.0?;
        results.1?;
        results.2?;
        results.3?;
        results.4?;
        results.5?;
        results.6?;
        Ok(())
    }

    pub fn project(&self, id: &RecordId) -> Option<Project> {
        self.projects.get(id)
    }

    pub fn tasks_by_project(&self, project_id: &RecordId) -> Vec<Task> {
        self.tasks.by_project(project_id)
    }

    /// Sign out: drop every cached record. In-flight mutations settle
    /// against the remote but never write back into the cleared caches.
    pub fn end(&self) {
        self.projects.discard();
        self.tasks.discard();
        self.sales_orders.discard();
        self.purchase_orders.discard();
        self.invoices.discard();
        self.bills.discard();
        self.expenses.discard();
        tracing::info!("session ended, caches cleared");
    }

    /// Snapshot every cache to its local mirror.
    pub fn persist(&self) -> anyhow::Result<()> {
        let root = self.mirror_root()?;
        save(&root, "projects", &self.projects)?;
        save(&root, "tasks", &self.tasks)?;
        save(&root, "sales-orders", &self.sales_orders)?;
        save(&root, "purchase-orders", &self.purchase_orders)?;
        save(&root, "invoices", &self.invoices)?;
        save(&root, "bills", &self.bills)?;
        save(&root, "expenses", &self.expenses)?;
        Ok(())
    }

    /// Seed empty caches from their local mirrors. Returns how many
    /// collections were seeded; caches that already hold records are skipped.
    pub fn hydrate(&self) -> anyhow::Result<usize> {
        let root = self.mirror_root()?;
        let seeded = [
            restore(&root, "projects", &self.projects)?,
            restore(&root, "tasks", &self.tasks)?,
            restore(&root, "sales-orders", &self.sales_orders)?,
            restore(&root, "purchase-orders", &self.purchase_orders)?,
            restore(&root, "invoices", &self.invoices)?,
            restore(&root, "bills", &self.bills)?,
            restore(&root, "expenses", &self.expenses)?,
        ];
        Ok(seeded.into_iter().filter(|s| *s).count())
    }

    fn mirror_root(&self) -> anyhow::Result<PathBuf> {
        match &self.config.mirror_dir {
            Some(dir) => Ok(dir.clone()),
            None => LocalMirror::default_root(),
        }
    }
}

fn synchronizer<E: Entity>(
    client: &reqwest::Client,
    config: &ClientConfig,
    events: &Arc<InMemoryEventBus<SyncEvent>>,
) -> HttpSynchronizer<E> {
    Synchronizer::with_parts(
        HttpCollection::new(client.clone(), &config.api_url, config.token.clone()),
        config.retry.clone(),
        Arc::clone(events),
    )
}

// Invoices and bills share one endpoint, so mirrors are keyed by collection
// name rather than by resource. Creates still in flight are left out.
fn save<E: Entity>(root: &Path, name: &str, sync: &HttpSynchronizer<E>) -> anyhow::Result<()> {
    let settled: Vec<E> = sync.list().iter().filter(|r| !r.id().is_provisional()).cloned().collect();
    LocalMirror::new(root, name)
        .save(&settled)
        .with_context(|| format!("failed to persist {name}"))
}

fn restore<E: Entity>(root: &Path, name: &str, sync: &HttpSynchronizer<E>) -> anyhow::Result<bool> {
    let Some(records) = LocalMirror::new(root, name)
        .load::<E>()
        .with_context(|| format!("failed to hydrate {name}"))?
    else {
        return Ok(false);
    };
    let count = records.len();
    let seeded = sync.hydrate(records);
    if seeded {
        tracing::debug!(collection = name, count, "cache hydrated from mirror");
    }
    Ok(seeded)
}
