//! Registers and looks up `OutputSchema`s for a dataset.
//!
//! The in-memory side (one `RwLock<Vec<OutputSchema>>` per dataset) is
//! read-mostly: lookups are frequent, inserts are rare and only happen the
//! first time a viewer asks for a new (scale, offset, dims) triple. The
//! persisted side goes through an upsert so concurrent registration of the
//! same triple from two requests converges on one pcid rather than
//! erroring.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use pc_common::{OutputSchema, PcError, PcResult, SchemaKey};

pub struct SchemaRegistry {
    pool: PgPool,
    cached: RwLock<HashMap<String, Vec<OutputSchema>>>,
}

fn dataset_key(schema: &str, table: &str, column: &str) -> String {
    format!("{schema}.{table}.{column}")
}

impl SchemaRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cached: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the in-memory cache for a dataset from schemas already loaded
    /// by the catalog, so the first lookup doesn't miss unnecessarily.
    pub async fn seed(&self, schema: &str, table: &str, column: &str, schemas: Vec<OutputSchema>) {
        let mut cached = self.cached.write().await;
        cached.insert(dataset_key(schema, table, column), schemas);
    }

    pub async fn find(&self, schema: &str, table: &str, column: &str, key: &SchemaKey) -> Option<OutputSchema> {
        let cached = self.cached.read().await;
        cached
            .get(&dataset_key(schema, table, column))
            .and_then(|schemas| schemas.iter().find(|s| s.matches_key(key)).cloned())
    }

    /// Register a new `(scales, offsets, dims)` triple, returning its pcid.
    /// Idempotent: if a concurrent caller already inserted the identical
    /// triple, the unique-constraint conflict is resolved by re-querying
    /// the existing pcid rather than erroring.
    #[tracing::instrument(skip(self, key))]
    pub async fn register(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        key: &SchemaKey,
        srid: i32,
    ) -> PcResult<OutputSchema> {
        if let Some(existing) = self.find(schema, table, column, key).await {
            return Ok(existing);
        }

        let dims_json = serde_json::to_string(&key.dimensions).map_err(|e| PcError::Store(e.to_string()))?;
        let (ox, oy, oz) = key.rounded_offsets();

        let row = sqlx::query(
            "insert into pc_catalog_output_schemas
                (schema_name, table_name, column_name, pcid, dims_json,
                 scale_x, scale_y, scale_z, offset_x, offset_y, offset_z, srid)
             values ($1,$2,$3, nextval('pc_catalog_pcid_seq'), $4, $5,$6,$7, $8,$9,$10, $11)
             on conflict (schema_name, table_name, column_name, scale_x, scale_y, scale_z, offset_x, offset_y, offset_z, dims_json)
                do update set pcid = pc_catalog_output_schemas.pcid
             returning pcid",
        )
        .bind(schema)
        .bind(table)
        .bind(column)
        .bind(&dims_json)
        .bind(key.scales.0)
        .bind(key.scales.1)
        .bind(key.scales.2)
        .bind(ox)
        .bind(oy)
        .bind(oz)
        .bind(srid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PcError::SchemaConflict(e.to_string()))?;

        let pcid: i32 = row.try_get(0).map_err(|e| PcError::Store(e.to_string()))?;

        let registered = OutputSchema {
            pcid,
            dimensions: key.dimensions.clone(),
            scales: key.scales,
            offsets: (ox, oy, oz),
            srid,
        };

        let mut cached = self.cached.write().await;
        cached
            .entry(dataset_key(schema, table, column))
            .or_default()
            .push(registered.clone());

        Ok(registered)
    }
}

pub type SharedSchemaRegistry = Arc<SchemaRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use pc_common::{Dimension, DimensionKind};

    #[tokio::test]
    async fn find_returns_none_for_unseeded_dataset() {
        // no pool needed: find() never touches the database.
        let pool = PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let registry = SchemaRegistry::new(pool);
        let key = SchemaKey::new(
            (0.01, 0.01, 0.01),
            (0.0, 0.0, 0.0),
            vec![Dimension::new("X", DimensionKind::Floating, 8)],
        );
        assert!(registry.find("public", "pts", "pa", &key).await.is_none());
    }

    #[tokio::test]
    async fn seeded_schema_is_found_by_matching_key() {
        let pool = PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let registry = SchemaRegistry::new(pool);
        let dims = vec![Dimension::new("X", DimensionKind::Floating, 8)];
        let schema = OutputSchema {
            pcid: 5,
            dimensions: dims.clone(),
            scales: (0.01, 0.01, 0.01),
            offsets: (1.0, 2.0, 3.0),
            srid: 4978,
        };
        registry.seed("public", "pts", "pa", vec![schema]).await;

        let key = SchemaKey::new((0.01, 0.01, 0.01), (1.0, 2.0, 3.0), dims);
        let found = registry.find("public", "pts", "pa", &key).await;
        assert_eq!(found.unwrap().pcid, 5);
    }
}
