//! `oneflow-core`: record building blocks shared by every entity crate.
//!
//! This crate contains **pure data** primitives (no IO, no HTTP, no caching):
//! identifiers, money, line-item arithmetic, the `Entity` contract and the
//! lenient wire helpers every schema uses.

pub mod entity;
pub mod error;
pub mod id;
pub mod lines;
pub mod money;
pub mod wire;

pub use entity::{Entity, ProjectScoped};
pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::RecordId;
pub use lines::{LineItem, LineTotals, resolve_amount};
pub use money::Amount;
