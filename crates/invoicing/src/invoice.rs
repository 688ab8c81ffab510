use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{
    Amount, Entity, FieldErrors, LineItem, ProjectScoped, RecordId, merge_patch, resolve_amount,
    wire,
};

use crate::{INVOICES_RESOURCE, InvoiceKind};

/// Customer invoice status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
}

/// Customer invoice as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInvoice {
    pub id: RecordId,
    #[serde(rename = "invoice_type", default, deserialize_with = "wire::known_enum")]
    pub kind: Option<InvoiceKind>,
    #[serde(rename = "project", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(rename = "sales_order", default, deserialize_with = "wire::optional_id")]
    pub sales_order_id: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub number: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub customer: String,
    #[serde(flatten, with = "wire::total_amount")]
    pub amount: Amount,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: InvoiceStatus,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
}

impl CustomerInvoice {
    /// Unpaid and past its due date as of `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != InvoiceStatus::Paid && self.due_date.is_some_and(|due| due < today)
    }
}

/// Payload for creating a customer invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerInvoiceDraft {
    #[serde(rename = "invoice_type")]
    kind: InvoiceKind,
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    #[serde(rename = "sales_order", skip_serializing_if = "Option::is_none")]
    pub sales_order_id: Option<RecordId>,
    pub number: String,
    pub customer: String,
    #[serde(rename = "total_amount")]
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineItem>,
}

impl CustomerInvoiceDraft {
    pub fn new(number: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            kind: InvoiceKind::Customer,
            project_id: None,
            sales_order_id: None,
            number: number.into(),
            customer: customer.into(),
            amount: Amount::ZERO,
            date: None,
            due_date: None,
            status: InvoiceStatus::Draft,
            description: String::new(),
            lines: Vec::new(),
        }
    }

    pub fn for_project(mut self, project_id: impl Into<RecordId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn for_sales_order(mut self, sales_order_id: impl Into<RecordId>) -> Self {
        self.sales_order_id = Some(sales_order_id.into());
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

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_lines(mut self, lines: Vec<LineItem>) -> Self {
        self.amount = resolve_amount(&lines, self.amount);
        self.lines = lines;
        self
    }

    /// Submit as sent (the "Send" action on the invoice form).
    pub fn sent(mut self) -> Self {
        self.status = InvoiceStatus::Sent;
        self
    }
}

/// Partial update for a customer invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerInvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(rename = "total_amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomerInvoicePatch {
    pub fn status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for CustomerInvoice {
    type Draft = CustomerInvoiceDraft;
    type Patch = CustomerInvoicePatch;

    const RESOURCE: &'static str = INVOICES_RESOURCE;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            kind: Some(InvoiceKind::Customer),
            project_id: draft.project_id.clone(),
            sales_order_id: draft.sales_order_id.clone(),
            number: draft.number.clone(),
            customer: draft.customer.clone(),
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
            [number, customer, amount, status, description],
            optional [date, due_date]
        );
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("number", &draft.number, "Invoice number is required");
        errors.require("customer", &draft.customer, "Customer is required");
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
        self.kind == Some(InvoiceKind::Customer)
    }
}

impl ProjectScoped for CustomerInvoice {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}
