//! Purchasing records (Purchase Orders).
//!
//! Schema, create/update payloads and client-side validation for purchase
//! orders, implemented purely as data (no IO, no HTTP, no caching).

pub mod order;

pub use order::{PurchaseOrder, PurchaseOrderDraft, PurchaseOrderPatch, PurchaseOrderStatus};
