//! Composes the root metadata document served before a viewer starts
//! requesting hierarchy/read calls.

use serde::Serialize;

use pc_common::{schema::greyhound_info_schema, BoundingBox3, Dataset, Dimension};

#[derive(Debug, Serialize)]
pub struct InfoDocument {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub base_depth: u32,
    pub bounds: [f64; 6],
    pub bounds_conforming: [f64; 6],
    pub num_points: i64,
    pub srs: i32,
    pub schema: Vec<Dimension>,
    pub output_schemas: Vec<pc_common::OutputSchema>,
}

pub struct InfoService;

impl InfoService {
    #[tracing::instrument(skip(dataset))]
    pub fn info(dataset: &Dataset) -> InfoDocument {
        let bounds = bbox_array(&dataset.bbox);
        InfoDocument {
            kind: "octree",
            base_depth: 0,
            bounds,
            bounds_conforming: bounds,
            num_points: dataset.approx_row_count * dataset.patch_size as i64,
            srs: dataset.srid,
            schema: greyhound_info_schema(),
            output_schemas: dataset.output_schemas.clone(),
        }
    }
}

fn bbox_array(b: &BoundingBox3) -> [f64; 6] {
    [b.xmin, b.ymin, b.zmin, b.xmax, b.ymax, b.zmax]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_common::schema::DimensionKind;

    fn sample_dataset() -> Dataset {
        Dataset {
            schema_name: "public".into(),
            table_name: "pts".into(),
            column_name: "pa".into(),
            bbox: BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0),
            srid: 4978,
            approx_row_count: 10,
            patch_size: 400,
            max_points_per_patch: None,
            max_patches_per_query: None,
            use_morton: true,
            output_schemas: vec![pc_common::OutputSchema {
                pcid: 1,
                dimensions: vec![pc_common::Dimension::new("X", DimensionKind::Floating, 8)],
                scales: (0.01, 0.01, 0.01),
                offsets: (50.0, 50.0, 5.0),
                srid: 4978,
            }],
        }
    }

    #[test]
    fn info_document_matches_dataset_metadata() {
        let dataset = sample_dataset();
        let info = InfoService::info(&dataset);
        assert_eq!(info.kind, "octree");
        assert_eq!(info.base_depth, 0);
        assert_eq!(info.num_points, 4000);
        assert_eq!(info.bounds, info.bounds_conforming);
        assert_eq!(info.output_schemas.len(), 1);
        assert!(info.schema.iter().any(|d| d.name == "Classification"));
    }
}
