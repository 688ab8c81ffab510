//! Entity trait: identity + the per-entity configuration the synchronizer needs.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::FieldErrors;
use crate::id::RecordId;

/// A record type held in a cache and mirrored by one REST collection.
///
/// Implementations are plain data: a schema (serde), the create payload
/// (`Draft`), the partial-update payload (`Patch`) and how each folds into a
/// record. No IO happens here.
pub trait Entity:
    Clone + core::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Create payload (everything except the backend-assigned id).
    type Draft: Clone + core::fmt::Debug + Serialize + Send + Sync + 'static;

    /// Partial update payload; absent fields are left untouched.
    type Patch: Clone + core::fmt::Debug + Serialize + Send + Sync + 'static;

    /// REST collection name, e.g. `"sales-orders"`.
    const RESOURCE: &'static str;

    fn id(&self) -> &RecordId;

    /// Build the record shown while a create is in flight.
    fn from_draft(id: RecordId, draft: &Self::Draft) -> Self;

    /// Shallow merge: every field present in `patch` overwrites the record's.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Client-side validation run before any optimistic insert.
    fn validate_draft(_draft: &Self::Draft) -> Result<(), FieldErrors> {
        Ok(())
    }

    /// Whether a record fetched from `RESOURCE` belongs to this collection.
    ///
    /// Collections that share an endpoint (customer invoices and vendor bills)
    /// use this to keep only their own kind.
    fn belongs_to_collection(&self) -> bool {
        true
    }
}

/// Records that hang off a project.
pub trait ProjectScoped {
    fn project_id(&self) -> Option<&RecordId>;
}

/// Fold the `Some` fields of a patch into a record.
///
/// ```ignore
/// merge_patch!(self, patch, [name, status], optional [due_date]);
/// ```
///
/// Fields in the first list are assigned directly; fields in `optional [...]`
/// are `Option<T>` on the record and become `Some(value)`.
#[macro_export]
macro_rules! merge_patch {
    ($target:expr, $patch:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = value.clone();
            }
        )*
    };
    ($target:expr, $patch:expr, [$($field:ident),* $(,)?], optional [$($opt:ident),* $(,)?]) => {
        $crate::merge_patch!($target, $patch, [$($field),*]);
        $(
            if let Some(value) = &$patch.$opt {
                $target.$opt = Some(value.clone());
            }
        )*
    };
}
