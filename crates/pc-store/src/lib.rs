//! Pooled access to the backing spatial point-cloud store: connection
//! management, dataset catalog, and output-schema registry.

pub mod catalog;
pub mod client;
pub mod schema_registry;

pub use catalog::TableCatalog;
pub use client::{NodeQuery, RankRange, StoreClient};
pub use schema_registry::{SchemaRegistry, SharedSchemaRegistry};
