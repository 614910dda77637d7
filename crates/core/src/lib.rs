//! `stockroom-core`: shared domain building blocks.
//!
//! Pure domain primitives only (no IO, no HTTP, no storage).

pub mod error;
pub mod id;
pub mod record;
pub mod time;

pub use error::{DomainError, DomainResult, required_text};
pub use id::{CategoryId, CustomerId, ProductId, StockId};
pub use record::{ExpectedRevision, Record};
