//! Inventory domain module: the stock ledger rules.
//!
//! Status derivation and quantity adjustments, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod stock;

pub use stock::{
    Adjustment, AdjustmentKind, DEFAULT_LOCATION, NewStock, StatusMode, StatusOverride, StockError,
    StockRecord, StockSettings, StockStatus, derive_status,
};
