//! Answers a single binary point read: resolve LoD, resolve/register the
//! requested output schema, convert the request bbox from schema-local
//! coordinates to world coordinates, fetch the aggregated patch, and
//! frame the response.

use pc_common::{BoundingBox3, Dataset, Dimension, OutputSchema, SchemaKey};
use pc_store::{NodeQuery, RankRange, SchemaRegistry, StoreClient};

/// `LOADER_GREYHOUND_MIN_DEPTH` in the system this protocol is modeled on.
const LOADER_MIN_DEPTH: u32 = 8;

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub bbox: Option<BoundingBox3>,
    pub depth: Option<u32>,
    pub depth_begin: Option<u32>,
    pub depth_end: Option<u32>,
    pub scale: Option<f64>,
    pub offset: Option<(f64, f64, f64)>,
    pub requested_dimensions: Option<Vec<Dimension>>,
}

pub struct ReadService<'a> {
    store: &'a StoreClient,
    registry: &'a SchemaRegistry,
}

impl<'a> ReadService<'a> {
    pub fn new(store: &'a StoreClient, registry: &'a SchemaRegistry) -> Self {
        Self { store, registry }
    }

    /// Resolve the LoD to serve. A caller-supplied `depth` takes precedence
    /// over a `depth_end`-derived LoD: the read-only `depthEnd` path is the
    /// one actually exercised upstream, but a caller that instead sends a
    /// single `depth` gets a deterministic `lod = 0` rather than being
    /// silently ignored. See DESIGN.md (OQ-1).
    pub fn resolve_lod(req: &ReadRequest, dataset_depth_cap: u32) -> u32 {
        let lod = if req.depth.is_some() {
            0
        } else {
            let depth_end = req.depth_end.unwrap_or(LOADER_MIN_DEPTH + 1);
            depth_end.saturating_sub(LOADER_MIN_DEPTH).saturating_sub(1)
        };
        lod.min(dataset_depth_cap)
    }

    /// Resolve the `OutputSchema` to serve under, registering a new one on
    /// miss. When scale/offset/bbox are all absent (a normalization probe
    /// from the viewer) the registered schema whose dimensions match the
    /// request is reused; if none matches, a new one is registered reusing
    /// the dataset's first schema's scale/offset.
    #[tracing::instrument(skip(self, dataset, req))]
    pub async fn resolve_output_schema(&self, dataset: &Dataset, req: &ReadRequest) -> pc_common::PcResult<OutputSchema> {
        if req.scale.is_none() && req.offset.is_none() && req.bbox.is_none() {
            let probe_dims = req
                .requested_dimensions
                .clone()
                .unwrap_or_else(pc_common::schema::greyhound_info_schema);

            if let Some(found) = dataset.output_schemas.iter().find(|s| s.matches_dimensions(&probe_dims)) {
                return Ok(found.clone());
            }

            if let Some(first) = dataset.output_schemas.first() {
                let key = SchemaKey::new(first.scales, first.offsets, probe_dims);
                if let Some(found) = dataset.find_schema(&key) {
                    return Ok(found.clone());
                }
                if let Some(found) = self.registry.find(&dataset.schema_name, &dataset.table_name, &dataset.column_name, &key).await {
                    return Ok(found);
                }
                return self
                    .registry
                    .register(&dataset.schema_name, &dataset.table_name, &dataset.column_name, &key, dataset.srid)
                    .await;
            }
        }

        let dims = req
            .requested_dimensions
            .clone()
            .unwrap_or_else(pc_common::schema::greyhound_info_schema);

        let (default_scale, default_offset) = OutputSchema::default_scale_offset(dataset.srid, &dataset.bbox);
        let scale = req.scale.unwrap_or(default_scale.0);
        let scales = (scale, scale, scale);
        let offsets = req.offset.unwrap_or(default_offset);

        let key = SchemaKey::new(scales, offsets, dims);

        if let Some(found) = dataset.find_schema(&key) {
            return Ok(found.clone());
        }
        if let Some(found) = self.registry.find(&dataset.schema_name, &dataset.table_name, &dataset.column_name, &key).await {
            return Ok(found);
        }

        self.registry
            .register(&dataset.schema_name, &dataset.table_name, &dataset.column_name, &key, dataset.srid)
            .await
    }

    /// Convert a bbox from schema-local integer coordinates to world
    /// coordinates: `world = local * scale + offset` per axis.
    pub fn to_world_bbox(local: &BoundingBox3, schema: &OutputSchema) -> BoundingBox3 {
        let (sx, sy, sz) = schema.scales;
        let (ox, oy, oz) = schema.offsets;
        BoundingBox3::new(
            local.xmin * sx + ox,
            local.ymin * sy + oy,
            local.zmin * sz + oz,
            local.xmax * sx + ox,
            local.ymax * sy + oy,
            local.zmax * sz + oz,
        )
    }

    /// Execute the read and frame the response. Any store failure degrades
    /// to the empty-frame response rather than propagating.
    #[tracing::instrument(skip(self, dataset, req))]
    pub async fn read(&self, dataset: &Dataset, req: &ReadRequest) -> Vec<u8> {
        // The dataset catalog does not itself carry a global depth cap;
        // `Config.depth` is applied by the caller before `depth_end` gets
        // here, so no additional clamping happens at this layer.
        let lod = Self::resolve_lod(req, u32::MAX);

        let schema = match self.resolve_output_schema(dataset, req).await {
            Ok(s) => s,
            Err(err) => {
                tracing::debug!(?err, "schema resolution failed, returning empty read frame");
                return pc_codec::empty_response().to_vec();
            }
        };

        let world_bbox = match &req.bbox {
            Some(local) => Self::to_world_bbox(local, &schema),
            None => dataset.bbox,
        };

        let range = match dataset.max_points_per_patch {
            Some(m) => RankRange::flat(m),
            None => RankRange::for_lod(lod),
        };

        let table = dataset.qualified_table();
        let query = NodeQuery {
            table: &table,
            column: &dataset.column_name,
            bbox: world_bbox,
            range,
            srid: dataset.srid,
            max_patches: dataset.max_patches_per_query,
            use_morton: dataset.use_morton,
        };

        match self.store.query_read_node(&query, schema.pcid).await {
            Ok(Some(wkb)) => match decode_frame(&wkb) {
                Ok(framed) => framed,
                Err(err) => {
                    tracing::debug!(?err, "failed to decode returned patch, returning empty read frame");
                    pc_codec::empty_response().to_vec()
                }
            },
            Ok(None) => pc_codec::empty_response().to_vec(),
            Err(err) => {
                tracing::debug!(?err, "store read failed, returning empty read frame");
                pc_codec::empty_response().to_vec()
            }
        }
    }
}

fn decode_frame(wkb: &[u8]) -> Result<Vec<u8>, pc_codec::CodecError> {
    let n = pc_codec::npoints(wkb)?;
    let payload = pc_codec::payload(wkb)?;
    Ok(pc_codec::frame_response(payload, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_lod_prefers_depth_when_present() {
        let req = ReadRequest {
            depth: Some(0),
            depth_end: Some(10),
            ..Default::default()
        };
        assert_eq!(ReadService::resolve_lod(&req, u32::MAX), 0);
    }

    #[test]
    fn resolve_lod_derives_from_depth_end_when_depth_absent() {
        let req = ReadRequest {
            depth: None,
            depth_end: Some(10),
            ..Default::default()
        };
        // 10 - 8 - 1 = 1
        assert_eq!(ReadService::resolve_lod(&req, u32::MAX), 1);
    }

    #[test]
    fn resolve_lod_clamps_to_dataset_cap() {
        let req = ReadRequest {
            depth: None,
            depth_end: Some(30),
            ..Default::default()
        };
        assert_eq!(ReadService::resolve_lod(&req, 5), 5);
    }

    #[test]
    fn output_schema_probe_matches_by_dimensions_not_first() {
        let geo = pc_common::schema::greyhound_info_schema();
        let other = vec![Dimension::new("X", pc_common::DimensionKind::Floating, 8)];

        let first = OutputSchema {
            pcid: 1,
            dimensions: other.clone(),
            scales: (0.01, 0.01, 0.01),
            offsets: (0.0, 0.0, 0.0),
            srid: 4978,
        };
        let matching = OutputSchema {
            pcid: 2,
            dimensions: geo.clone(),
            scales: (0.02, 0.02, 0.02),
            offsets: (1.0, 1.0, 1.0),
            srid: 4978,
        };
        assert!(!first.matches_dimensions(&geo));
        assert!(matching.matches_dimensions(&geo));
    }

    #[test]
    fn to_world_bbox_applies_scale_and_offset() {
        let schema = OutputSchema {
            pcid: 1,
            dimensions: vec![],
            scales: (0.01, 0.01, 0.01),
            offsets: (50.0, 50.0, 5.0),
            srid: 4978,
        };
        let local = BoundingBox3::new(-100.0, -100.0, -100.0, 100.0, 100.0, 100.0);
        let world = ReadService::to_world_bbox(&local, &schema);
        assert_eq!(world.xmin, 49.0);
        assert_eq!(world.xmax, 51.0);
    }
}
