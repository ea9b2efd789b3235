//! `jurnal-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the fixed-point [`Amount`] and the domain error type.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, CategoryId, TransactionId, UserId, WorkspaceId};
pub use money::{Amount, CURRENCY_SCALE, MAX_INTEGER_DIGITS, round_currency};
pub use value_object::ValueObject;
