//! Expense records.

pub mod expense;

pub use expense::{Expense, ExpenseDraft, ExpensePatch, ExpenseStatus};
