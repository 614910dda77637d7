//! Customer directory domain module.
//!
//! Validation and update rules for customer records (no IO, no storage).

pub mod customer;

pub use customer::{CustomerChanges, CustomerRecord, NewCustomer};
