//! Pooled connection to the backing spatial point-cloud store.
//!
//! `StoreClient` is deliberately thin: it owns the `PgPool` and knows how
//! to build and run the two node-level queries the hierarchy/read paths
//! need (`sql_hierarchy_query` and `sql_read_query`). It holds no
//! business state of its own.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use pc_common::{BoundingBox3, PcError, PcResult};

/// Rank-range sampling window for a single octree node's LoD.
#[derive(Debug, Clone, Copy)]
pub struct RankRange {
    pub min: i64,
    pub max: i64,
}

impl RankRange {
    /// `range_min = Σ 4^i (i=0..lod)` (the rank offset already emitted by
    /// ancestors), `range_max = 4^lod` (a **count**, not a cumulative
    /// bound — `pc_range`'s second argument is `(start, n)`). Callers with
    /// a flat `max_points_per_patch` cap should use [`RankRange::flat`]
    /// instead.
    pub fn for_lod(lod: u32) -> Self {
        let min: i64 = (0..lod).map(|i| 4i64.pow(i)).sum();
        let max = 4i64.pow(lod);
        Self { min, max }
    }

    pub fn flat(max_points_per_patch: i32) -> Self {
        Self {
            min: 0,
            max: max_points_per_patch as i64,
        }
    }
}

/// One per-node query against the store.
pub struct NodeQuery<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub bbox: BoundingBox3,
    pub range: RankRange,
    pub srid: i32,
    pub max_patches: Option<i32>,
    pub use_morton: bool,
}

#[derive(Clone)]
pub struct StoreClient {
    pool: PgPool,
}

impl StoreClient {
    pub async fn connect(database_url: &str, pool_size: u32) -> PcResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| PcError::Store(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the uncompressed-union query used by the hierarchy engine: only
    /// the aggregated point count is needed, so the store is not asked to
    /// restamp or compress the result.
    #[tracing::instrument(skip(self), fields(table = q.table, lod_min = q.range.min, lod_max = q.range.max))]
    pub async fn query_hierarchy_node(&self, q: &NodeQuery<'_>) -> PcResult<Option<Vec<u8>>> {
        let sql = sql_hierarchy_query(q);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PcError::Store(e.to_string()))?;
        match row {
            Some(row) => {
                let bytes: Vec<u8> = row.try_get(0).map_err(|e| PcError::Store(e.to_string()))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Run the read query: the store restamps the aggregated patch to the
    /// requested output pcid and LAZ-compresses it before returning.
    #[tracing::instrument(skip(self), fields(table = q.table, pcid = out_pcid))]
    pub async fn query_read_node(&self, q: &NodeQuery<'_>, out_pcid: i32) -> PcResult<Option<Vec<u8>>> {
        let sql = sql_read_query(q, out_pcid);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PcError::Store(e.to_string()))?;
        match row {
            Some(row) => {
                let bytes: Vec<u8> = row.try_get(0).map_err(|e| PcError::Store(e.to_string()))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

fn intersection_predicate(q: &NodeQuery<'_>) -> String {
    format!(
        "{col} && ST_MakeEnvelope({xmin}, {ymin}, {xmax}, {ymax}, {srid})",
        col = q.column,
        xmin = q.bbox.xmin,
        ymin = q.bbox.ymin,
        xmax = q.bbox.xmax,
        ymax = q.bbox.ymax,
        srid = q.srid,
    )
}

fn limit_clause(q: &NodeQuery<'_>) -> String {
    match q.max_patches {
        Some(n) => {
            let order = if q.use_morton { " order by morton" } else { "" };
            format!("{order} limit {n}")
        }
        None => {
            if q.use_morton {
                " order by morton".to_string()
            } else {
                String::new()
            }
        }
    }
}

fn ranked_union_expr(q: &NodeQuery<'_>) -> String {
    format!(
        "pc_union(pc_filterbetween(pc_range({col}, {range_min}, {range_max}), 'Z', {zmin}, {zmax}))",
        col = q.column,
        range_min = q.range.min,
        range_max = q.range.max,
        zmin = q.bbox.zmin,
        zmax = q.bbox.zmax,
    )
}

fn sql_hierarchy_query(q: &NodeQuery<'_>) -> String {
    format!(
        "select {expr} from {table} where {pred}{limit}",
        expr = ranked_union_expr(q),
        table = q.table,
        pred = intersection_predicate(q),
        limit = limit_clause(q),
    )
}

fn sql_read_query(q: &NodeQuery<'_>, out_pcid: i32) -> String {
    format!(
        "select pc_compress(pc_patchtransform({expr}, {pcid}), 'laz') from {table} where {pred}{limit}",
        expr = ranked_union_expr(q),
        pcid = out_pcid,
        table = q.table,
        pred = intersection_predicate(q),
        limit = limit_clause(q),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> NodeQuery<'static> {
        NodeQuery {
            table: "public.pts",
            column: "pa",
            bbox: BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0),
            range: RankRange::for_lod(2),
            srid: 4978,
            max_patches: Some(100),
            use_morton: true,
        }
    }

    #[test]
    fn rank_range_matches_geometric_series() {
        assert_eq!(RankRange::for_lod(0).min, 0);
        assert_eq!(RankRange::for_lod(0).max, 1);
        assert_eq!(RankRange::for_lod(1).min, 1);
        assert_eq!(RankRange::for_lod(1).max, 4);
        assert_eq!(RankRange::for_lod(2).min, 5);
        assert_eq!(RankRange::for_lod(2).max, 16);
    }

    #[test]
    fn hierarchy_sql_has_no_compression_or_transform() {
        let sql = sql_hierarchy_query(&sample_query());
        assert!(sql.contains("pc_union"));
        assert!(!sql.contains("pc_compress"));
        assert!(!sql.contains("pc_patchtransform"));
        assert!(sql.contains("order by morton"));
        assert!(sql.contains("limit 100"));
    }

    #[test]
    fn read_sql_compresses_and_restamps() {
        let sql = sql_read_query(&sample_query(), 42);
        assert!(sql.contains("pc_patchtransform"));
        assert!(sql.contains("pc_compress"));
        assert!(sql.contains(", 42)"));
    }
}
