//! Dataset and output-schema types.
//!
//! An `OutputSchema`'s identity within a `Dataset` is the triple
//! `(scales, offsets, sorted dimension list)`; two schemas with the same
//! triple must resolve to the same pcid (see `pc_store::schema_registry`).

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionKind {
    Signed,
    Unsigned,
    Floating,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub interpretation: DimensionKind,
    pub size_bytes: u8,
}

impl Dimension {
    pub fn new(name: impl Into<String>, interpretation: DimensionKind, size_bytes: u8) -> Self {
        Self {
            name: name.into(),
            interpretation,
            size_bytes,
        }
    }
}

/// `(scales, offsets, sorted dims)` — the identity of an `OutputSchema`
/// within a dataset. Two requests producing the same key must resolve to
/// the same pcid.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaKey {
    pub scales: (f64, f64, f64),
    pub offsets: (f64, f64, f64),
    pub dimensions: Vec<Dimension>,
}

impl SchemaKey {
    pub fn new(scales: (f64, f64, f64), offsets: (f64, f64, f64), mut dimensions: Vec<Dimension>) -> Self {
        dimensions.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            scales,
            offsets,
            dimensions,
        }
    }

    /// Offsets rounded to 2 decimals, as the ingestion convention in
    /// `lopocs`'s `cli.py` establishes for newly derived schemas.
    pub fn rounded_offsets(&self) -> (f64, f64, f64) {
        let r = |v: f64| (v * 100.0).round() / 100.0;
        (r(self.offsets.0), r(self.offsets.1), r(self.offsets.2))
    }

    fn matches(&self, other: &SchemaKey) -> bool {
        self.scales == other.scales
            && self.rounded_offsets() == other.rounded_offsets()
            && self.dimensions == other.dimensions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSchema {
    pub pcid: i32,
    pub dimensions: Vec<Dimension>,
    pub scales: (f64, f64, f64),
    pub offsets: (f64, f64, f64),
    pub srid: i32,
}

impl OutputSchema {
    pub fn key(&self) -> SchemaKey {
        SchemaKey::new(self.scales, self.offsets, self.dimensions.clone())
    }

    pub fn matches_key(&self, key: &SchemaKey) -> bool {
        self.key().matches(key)
    }

    /// Compares dimension lists only, ignoring scale/offset — used by the
    /// normalization-probe path, which cares whether a schema serves the
    /// same fields, not whether it was registered under the same scale.
    pub fn matches_dimensions(&self, dims: &[Dimension]) -> bool {
        let mut a = self.dimensions.clone();
        let mut b = dims.to_vec();
        a.sort_by(|x, y| x.name.cmp(&y.name));
        b.sort_by(|x, y| x.name.cmp(&y.name));
        a == b
    }

    /// Default `(scale, offset)` convention used by ingestion for a given
    /// SRID and bbox center: micro-degree scale for geographic SRIDs,
    /// centimeter scale otherwise.
    pub fn default_scale_offset(srid: i32, bbox: &BoundingBox3) -> ((f64, f64, f64), (f64, f64, f64)) {
        let geographic = matches!(srid, 4326 | 4269 | 4267);
        let scale = if geographic {
            (1e-6, 1e-6, 1e-2)
        } else {
            (0.01, 0.01, 0.01)
        };
        let r = |v: f64| (v * 100.0).round() / 100.0;
        let offset = (
            r((bbox.xmin + bbox.xmax) / 2.0),
            r((bbox.ymin + bbox.ymax) / 2.0),
            r((bbox.zmin + bbox.zmax) / 2.0),
        );
        (scale, offset)
    }
}

/// The fixed Greyhound-style info schema: a stable "what a viewer should
/// expect" description, independent of a dataset's live registered
/// `OutputSchema`s.
pub fn greyhound_info_schema() -> Vec<Dimension> {
    vec![
        Dimension::new("X", DimensionKind::Floating, 8),
        Dimension::new("Y", DimensionKind::Floating, 8),
        Dimension::new("Z", DimensionKind::Floating, 8),
        Dimension::new("Intensity", DimensionKind::Unsigned, 2),
        Dimension::new("Classification", DimensionKind::Unsigned, 1),
        Dimension::new("Red", DimensionKind::Unsigned, 2),
        Dimension::new("Green", DimensionKind::Unsigned, 2),
        Dimension::new("Blue", DimensionKind::Unsigned, 2),
    ]
}

/// Per-dataset metadata: registered at load time, read-only afterwards
/// except for `output_schemas` appends.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub bbox: BoundingBox3,
    pub srid: i32,
    pub approx_row_count: i64,
    pub patch_size: i32,
    pub max_points_per_patch: Option<i32>,
    pub max_patches_per_query: Option<i32>,
    pub use_morton: bool,
    pub output_schemas: Vec<OutputSchema>,
}

impl Dataset {
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    pub fn find_schema(&self, key: &SchemaKey) -> Option<&OutputSchema> {
        self.output_schemas.iter().find(|s| s.matches_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_key_identity_ignores_offset_rounding_noise() {
        let dims = vec![Dimension::new("X", DimensionKind::Floating, 8)];
        let a = SchemaKey::new((0.01, 0.01, 0.01), (50.001, 50.0, 5.0), dims.clone());
        let b = SchemaKey::new((0.01, 0.01, 0.01), (50.0, 50.0, 5.0), dims);
        assert!(a.matches(&b));
    }

    #[test]
    fn default_scale_offset_picks_geographic_convention() {
        let bbox = BoundingBox3::new(-10.0, -10.0, 0.0, 10.0, 10.0, 100.0);
        let (scale, offset) = OutputSchema::default_scale_offset(4326, &bbox);
        assert_eq!(scale, (1e-6, 1e-6, 1e-2));
        assert_eq!(offset, (0.0, 0.0, 50.0));
    }
}
