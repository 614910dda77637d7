//! Infrastructure layer: storage backends and the persistence gateway.

pub mod store;

pub use store::{
    Document, DocumentStore, GatewayError, GatewayResult, InMemoryDocumentStore, Page,
    PostgresDocumentStore, Query, StoreError, StoreResult,
};
