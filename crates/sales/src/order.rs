use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{
    Amount, Entity, FieldErrors, LineItem, ProjectScoped, RecordId, merge_patch, resolve_amount,
    wire,
};

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    #[default]
    Draft,
    Confirmed,
    Invoiced,
}

/// Sales order as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: RecordId,
    #[serde(rename = "project", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub number: String,
    /// Customer name (numeric customer keys are kept as their string form).
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub customer: String,
    /// Order total in minor units (`total_amount` on the wire).
    #[serde(flatten, with = "wire::total_amount")]
    pub amount: Amount,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: SalesOrderStatus,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
}

impl SalesOrder {
    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Draft)
    }

    pub fn is_invoice_allowed(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Confirmed)
    }
}

/// Payload for creating a sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesOrderDraft {
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    pub number: String,
    pub customer: String,
    #[serde(rename = "total_amount")]
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub status: SalesOrderStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineItem>,
}

impl SalesOrderDraft {
    pub fn new(number: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            project_id: None,
            number: number.into(),
            customer: customer.into(),
            amount: Amount::ZERO,
            date: None,
            status: SalesOrderStatus::Draft,
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
}

/// Partial update for a sales order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesOrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(rename = "total_amount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SalesOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SalesOrderPatch {
    pub fn status(status: SalesOrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn amount(amount: Amount) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }
}

impl Entity for SalesOrder {
    type Draft = SalesOrderDraft;
    type Patch = SalesOrderPatch;

    const RESOURCE: &'static str = "sales-orders";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            project_id: draft.project_id.clone(),
            number: draft.number.clone(),
            customer: draft.customer.clone(),
            amount: draft.amount,
            date: draft.date,
            status: draft.status,
            description: draft.description.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(self, patch, [number, customer, amount, status, description], optional [date]);
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("number", &draft.number, "Order number is required");
        errors.require("customer", &draft.customer, "Customer is required");
        if draft.amount.is_negative() {
            errors.add("total_amount", "Amount must be positive");
        }
        errors.into_result()
    }
}

impl ProjectScoped for SalesOrder {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}
