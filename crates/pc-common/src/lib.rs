//! Shared types for the point-cloud streaming crates: bounding boxes,
//! dataset/schema descriptions, configuration, and the common error type.

pub mod bbox;
pub mod config;
pub mod error;
pub mod schema;

pub use bbox::BoundingBox3;
pub use config::Config;
pub use error::{PcError, PcResult};
pub use schema::{Dataset, Dimension, DimensionKind, OutputSchema, SchemaKey};
