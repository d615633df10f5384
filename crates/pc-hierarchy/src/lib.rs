//! The octree hierarchy engine: recursive spatial subdivision, disk cache,
//! binary point reads, and the info/tileset documents built on top of it.

pub mod cache;
pub mod engine;
pub mod info_service;
pub mod read_service;
pub mod tileset;
pub mod tree;

pub use cache::HierarchyCache;
pub use engine::HierarchyEngine;
pub use info_service::{InfoDocument, InfoService};
pub use read_service::{ReadRequest, ReadService};
pub use tileset::{Tile, Tileset, TilesetBuilder};
pub use tree::HierarchyNode;
