//! Product catalog domain module (products and their categories).

pub mod category;
pub mod product;

pub use category::{CategoryChanges, CategoryRecord, NewCategory};
pub use product::{NewProduct, ProductChanges, ProductRecord};
