use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{
    Amount, Entity, FieldErrors, LineItem, ProjectScoped, RecordId, merge_patch, resolve_amount,
    wire,
};

use crate::{INVOICES_RESOURCE, InvoiceKind};

/// Vendor bill status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorBillStatus {
    #[default]
    Draft,
    Confirmed,
    Paid,
}

/// Vendor bill as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBill {
    pub id: RecordId,
    #[serde(rename = "invoice_type", default, deserialize_with = "wire::known_enum")]
    pub kind: Option<InvoiceKind>,
    #[serde(rename = "project", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(rename = "purchase_order", default, deserialize_with = "wire::optional_id")]
    pub purchase_order_id: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub number: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub vendor: String,
    #[serde(flatten, with = "wire::total_amount")]
    pub amount: Amount,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: VendorBillStatus,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
}

/// Payload for creating a vendor bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorBillDraft {
    #[serde(rename = "invoice_type")]
    kind: InvoiceKind,
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    #[serde(rename = "purchase_order", skip_serializing_if = "Option::is_none")]
    pub purchase_order_id: Option<RecordId>,
    pub number: String,
    pub vendor: String,
    #[serde(rename = "total_amount")]
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: VendorBillStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineItem>,
}

impl VendorBillDraft {
    pub fn new(number: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            kind: InvoiceKind::Vendor,
            project_id: None,
            purchase_order_id: None,
            number: number.into(),
            vendor: vendor.into(),
            amount: Amount::ZERO,
            date: None,
            due_date: None,
            status: VendorBillStatus::Draft,
            description: String::new(),
            lines: Vec::new(),
        }
    }

    pub fn for_project(mut self, project_id: impl Into<RecordId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn for_purchase_order(mut self, purchase_order_id: impl Into<RecordId>) -> Self {
        self.purchase_order_id = Some(purchase_order_id.into());
        self
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    pub fn dated(mut self, date: NaiveDate, due_date: NaiveDate) -> Self {
        self.date = Some(date);
        self.due_date = Some(due_date);
        self
    }

    pub fn with_lines(mut self, lines: Vec<LineItem>) -> Self {
        self.amount = resolve_amount(&lines, self.amount);
        self.lines = lines;
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.status = VendorBillStatus::Confirmed;
        self
    }
}

/// Partial update for a vendor bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorBillPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(rename = "total_amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VendorBillStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VendorBillPatch {
    pub fn status(status: VendorBillStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for VendorBill {
    type Draft = VendorBillDraft;
    type Patch = VendorBillPatch;

    const RESOURCE: &'static str = INVOICES_RESOURCE;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            kind: Some(InvoiceKind::Vendor),
            project_id: draft.project_id.clone(),
            purchase_order_id: draft.purchase_order_id.clone(),
            number: draft.number.clone(),
            vendor: draft.vendor.clone(),
            amount: draft.amount,
            date: draft.date,
            due_date: draft.due_date,
            status: draft.status,
            description: draft.description.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(
            self,
            patch,
            [number, vendor, amount, status, description],
            optional [date, due_date]
        );
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("number", &draft.number, "Bill number is required");
        errors.require("vendor", &draft.vendor, "Vendor is required");
        if draft.amount.is_negative() {
            errors.add("total_amount", "Amount must be positive");
        }
        if draft.date.is_none() {
            errors.add("date", "Date is required");
        }
        if draft.due_date.is_none() {
            errors.add("due_date", "Due date is required");
        }
        errors.into_result()
    }

    fn belongs_to_collection(&self) -> bool {
        self.kind == Some(InvoiceKind::Vendor)
    }
}

impl ProjectScoped for VendorBill {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}
