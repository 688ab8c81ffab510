//! Invoicing records: customer invoices and vendor bills.
//!
//! Both live behind the same backend collection (`invoices`) and are told apart
//! by `invoice_type`; each record type keeps only its own kind.

pub mod bill;
pub mod invoice;

use serde::{Deserialize, Serialize};

pub use bill::{VendorBill, VendorBillDraft, VendorBillPatch, VendorBillStatus};
pub use invoice::{CustomerInvoice, CustomerInvoiceDraft, CustomerInvoicePatch, InvoiceStatus};

/// Discriminator stored in `invoice_type`.
///
/// Records with a missing or unrecognised label belong to neither collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Customer,
    Vendor,
}

/// Shared collection for both kinds.
pub(crate) const INVOICES_RESOURCE: &str = "invoices";
