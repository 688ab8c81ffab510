use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oneflow_core::{Amount, Entity, FieldErrors, ProjectScoped, RecordId, merge_patch, wire};

/// Expense approval lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Expense claim as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: RecordId,
    #[serde(rename = "project", default, deserialize_with = "wire::optional_id")]
    pub project_id: Option<RecordId>,
    /// Claimant (`user` on the wire).
    #[serde(rename = "user", default, deserialize_with = "wire::lenient_string")]
    pub employee: String,
    #[serde(default)]
    pub amount: Amount,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "wire::lenient_bool")]
    pub billable: bool,
    #[serde(default, deserialize_with = "wire::enum_or_default")]
    pub status: ExpenseStatus,
    #[serde(default, deserialize_with = "wire::optional_string")]
    pub receipt: Option<String>,
}

impl Expense {
    /// Approved and re-billable to the customer.
    pub fn is_rebillable(&self) -> bool {
        self.billable && self.status == ExpenseStatus::Approved
    }
}

/// Payload for submitting an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseDraft {
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<RecordId>,
    #[serde(rename = "user")]
    pub employee: String,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub category: String,
    pub description: String,
    pub billable: bool,
    pub status: ExpenseStatus,
}

impl ExpenseDraft {
    pub fn new(employee: impl Into<String>, category: impl Into<String>, amount: Amount) -> Self {
        Self {
            project_id: None,
            employee: employee.into(),
            amount,
            date: None,
            category: category.into(),
            description: String::new(),
            billable: false,
            status: ExpenseStatus::Pending,
        }
    }

    pub fn for_project(mut self, project_id: impl Into<RecordId>) -> Self {
        self.project_id = Some(project_id.into());
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

    pub fn billable(mut self) -> Self {
        self.billable = true;
        self
    }
}

/// Partial update for an expense.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpenseStatus>,
}

impl ExpensePatch {
    pub fn status(status: ExpenseStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for Expense {
    type Draft = ExpenseDraft;
    type Patch = ExpensePatch;

    const RESOURCE: &'static str = "expenses";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self {
        Self {
            id,
            project_id: draft.project_id.clone(),
            employee: draft.employee.clone(),
            amount: draft.amount,
            date: draft.date,
            category: draft.category.clone(),
            description: draft.description.clone(),
            billable: draft.billable,
            status: draft.status,
            receipt: None,
        }
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        merge_patch!(
            self,
            patch,
            [amount, category, description, billable, status],
            optional [date]
        );
    }

    fn validate_draft(draft: &Self::Draft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("user", &draft.employee, "Employee is required");
        errors.require("category", &draft.category, "Category is required");
        if draft.amount.is_negative() {
            errors.add("amount", "Amount must be positive");
        }
        errors.into_result()
    }
}

impl ProjectScoped for Expense {
    fn project_id(&self) -> Option<&RecordId> {
        self.project_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_payload_maps_user_to_employee() {
        let exp: Expense = serde_json::from_value(json!({
            "id": 3,
            "project": 1,
            "user": 42,
            "amount": "18.50",
            "billable": true,
            "receipt": null
        }))
        .unwrap();

        assert_eq!(exp.employee, "42");
        assert_eq!(exp.amount, Amount::from_minor(1_850));
        assert_eq!(exp.status, ExpenseStatus::Pending);
        assert_eq!(exp.receipt, None);
        assert!(exp.billable);
    }

    #[test]
    fn rebillable_requires_approval() {
        let draft = ExpenseDraft::new("alice", "travel", Amount::from_major(40)).billable();
        let mut exp = Expense::from_draft(RecordId::from("1"), &draft);
        assert!(!exp.is_rebillable());

        exp.apply_patch(&ExpensePatch::status(ExpenseStatus::Approved));
        assert!(exp.is_rebillable());
        assert_eq!(exp.category, "travel");
    }

    #[test]
    fn validation_flags_missing_category_and_negative_amount() {
        let errors = Expense::validate_draft(&ExpenseDraft::new("alice", "", Amount::from_minor(-10)))
            .unwrap_err();
        assert!(errors.get("category").is_some());
        assert!(errors.get("amount").is_some());
        assert!(errors.get("user").is_none());
    }
}
