//! Sales Orders records.
//!
//! Schema, create/update payloads and client-side validation for sales orders,
//! implemented purely as data (no IO, no HTTP, no caching).

pub mod order;

pub use order::{SalesOrder, SalesOrderDraft, SalesOrderPatch, SalesOrderStatus};
