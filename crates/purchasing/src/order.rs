use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{
    Amount, Entity, FieldErrors, LineItem, LineTotals, ProjectScoped, RecordId, merge_patch,
    resolve_amount, wire,
};

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[default]
    Draft,
    Confirmed,
    Billed,
}

/// Purchase order as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: RecordId,
    #[serde(rename = "project", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub number: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub vendor: String,
    #[serde(flatten, with = "wire::total_amount")]
    pub amount: Amount,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: PurchaseOrderStatus,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
}

impl PurchaseOrder {
    pub fn is_bill_allowed(&self) -> bool {
        matches!(self.status, PurchaseOrderStatus::Confirmed)
    }
}

/// Payload for creating a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrderDraft {
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    pub number: String,
    pub vendor: String,
    #[serde(rename = "total_amount")]
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineItem>,
}

impl PurchaseOrderDraft {
    pub fn new(number: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            project_id: None,
            number: number.into(),
            vendor: vendor.into(),
            amount: Amount::ZERO,
            date: None,
            status: PurchaseOrderStatus::Draft,
            description: String::new(),
            lines: Vec::new(),
        }
    }

    pub fn for_project(mut self, project_id: impl Into<RecordId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach order lines; a non-zero line total replaces the entered amount.
    pub fn with_lines(mut self, lines: Vec<LineItem>) -> Self {
        self.amount = resolve_amount(&lines, self.amount);
        self.lines = lines;
        self
    }

    /// Submit as confirmed (the "Confirm" action on the order form).
    pub fn confirmed(mut self) -> Self {
        self.status = PurchaseOrderStatus::Confirmed;
        self
    }

    pub fn totals(&self) -> LineTotals {
        LineTotals::of(&self.lines)
    }
}

/// Partial update for a purchase order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurchaseOrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(rename = "total_amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PurchaseOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PurchaseOrderPatch {
    pub fn status(status: PurchaseOrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for PurchaseOrder {
    type Draft = PurchaseOrderDraft;
    type Patch = PurchaseOrderPatch;

    const RESOURCE: &'static str = "purchase-orders";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            project_id: draft.project_id.clone(),
            number: draft.number.clone(),
            vendor: draft.vendor.clone(),
            amount: draft.amount,
            date: draft.date,
            status: draft.status,
            description: draft.description.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(self, patch, [number, vendor, amount, status, description], optional [date]);
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("number", &draft.number, "PO number is required");
        errors.require("vendor", &draft.vendor, "Vendor is required");
        if draft.amount.is_negative() {
            errors.add("total_amount", "Amount must be positive");
        }
        errors.into_result()
    }
}

impl ProjectScoped for PurchaseOrder {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}
