//! Per-dataset metadata: bbox, srid, patch size, query caps, and the
//! registered output schemas. Mirrors the teacher's dataset catalog: a
//! metadata table keyed by the dataset's identity, upserted on
//! registration, read back into typed rows via `sqlx::query_as`.

use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use pc_common::{BoundingBox3, Dataset, OutputSchema, PcError, PcResult};

const SCHEMA_SQL: &str = "
create sequence if not exists pc_catalog_pcid_seq;
create table if not exists pc_catalog_datasets (
    schema_name text not null,
    table_name text not null,
    column_name text not null,
    xmin double precision not null,
    ymin double precision not null,
    zmin double precision not null,
    xmax double precision not null,
    ymax double precision not null,
    zmax double precision not null,
    srid integer not null,
    approx_row_count bigint not null default 0,
    patch_size integer not null,
    max_points_per_patch integer,
    max_patches_per_query integer,
    use_morton boolean not null default true,
    primary key (schema_name, table_name, column_name)
);
create table if not exists pc_catalog_output_schemas (
    schema_name text not null,
    table_name text not null,
    column_name text not null,
    pcid integer not null,
    dims_json text not null,
    scale_x double precision not null,
    scale_y double precision not null,
    scale_z double precision not null,
    offset_x double precision not null,
    offset_y double precision not null,
    offset_z double precision not null,
    srid integer not null,
    unique (schema_name, table_name, column_name, scale_x, scale_y, scale_z, offset_x, offset_y, offset_z, dims_json)
);
create index if not exists idx_pc_output_schemas_dataset
    on pc_catalog_output_schemas (schema_name, table_name, column_name);
";

#[derive(Debug, FromRow)]
struct DatasetRow {
    schema_name: String,
    table_name: String,
    column_name: String,
    xmin: f64,
    ymin: f64,
    zmin: f64,
    xmax: f64,
    ymax: f64,
    zmax: f64,
    srid: i32,
    approx_row_count: i64,
    patch_size: i32,
    max_points_per_patch: Option<i32>,
    max_patches_per_query: Option<i32>,
    use_morton: bool,
}

impl From<DatasetRow> for Dataset {
    fn from(row: DatasetRow) -> Self {
        Dataset {
            schema_name: row.schema_name,
            table_name: row.table_name,
            column_name: row.column_name,
            bbox: BoundingBox3::new(row.xmin, row.ymin, row.zmin, row.xmax, row.ymax, row.zmax),
            srid: row.srid,
            approx_row_count: row.approx_row_count,
            patch_size: row.patch_size,
            max_points_per_patch: row.max_points_per_patch,
            max_patches_per_query: row.max_patches_per_query,
            use_morton: row.use_morton,
            output_schemas: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct OutputSchemaRow {
    pcid: i32,
    dims_json: String,
    scale_x: f64,
    scale_y: f64,
    scale_z: f64,
    offset_x: f64,
    offset_y: f64,
    offset_z: f64,
    srid: i32,
}

impl OutputSchemaRow {
    fn into_output_schema(self) -> PcResult<OutputSchema> {
        let dimensions: Vec<pc_common::Dimension> =
            serde_json::from_str(&self.dims_json).map_err(|e| PcError::Store(e.to_string()))?;
        Ok(OutputSchema {
            pcid: self.pcid,
            dimensions,
            scales: (self.scale_x, self.scale_y, self.scale_z),
            offsets: (self.offset_x, self.offset_y, self.offset_z),
            srid: self.srid,
        })
    }
}

#[derive(Clone)]
pub struct TableCatalog {
    pool: PgPool,
}

impl TableCatalog {
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

    pub async fn migrate(&self) -> PcResult<()> {
        for stmt in SCHEMA_SQL.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| PcError::Store(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn register_dataset(&self, dataset: &Dataset) -> PcResult<()> {
        sqlx::query(
            "insert into pc_catalog_datasets
                (schema_name, table_name, column_name, xmin, ymin, zmin, xmax, ymax, zmax,
                 srid, approx_row_count, patch_size, max_points_per_patch, max_patches_per_query, use_morton)
             values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
             on conflict (schema_name, table_name, column_name) do update set
                xmin = excluded.xmin, ymin = excluded.ymin, zmin = excluded.zmin,
                xmax = excluded.xmax, ymax = excluded.ymax, zmax = excluded.zmax,
                srid = excluded.srid, approx_row_count = excluded.approx_row_count,
                patch_size = excluded.patch_size, max_points_per_patch = excluded.max_points_per_patch,
                max_patches_per_query = excluded.max_patches_per_query, use_morton = excluded.use_morton",
        )
        .bind(&dataset.schema_name)
        .bind(&dataset.table_name)
        .bind(&dataset.column_name)
        .bind(dataset.bbox.xmin)
        .bind(dataset.bbox.ymin)
        .bind(dataset.bbox.zmin)
        .bind(dataset.bbox.xmax)
        .bind(dataset.bbox.ymax)
        .bind(dataset.bbox.zmax)
        .bind(dataset.srid)
        .bind(dataset.approx_row_count)
        .bind(dataset.patch_size)
        .bind(dataset.max_points_per_patch)
        .bind(dataset.max_patches_per_query)
        .bind(dataset.use_morton)
        .execute(&self.pool)
        .await
        .map_err(|e| PcError::Store(e.to_string()))?;
        Ok(())
    }

    pub async fn find_dataset(&self, schema: &str, table: &str, column: &str) -> PcResult<Dataset> {
        let row = sqlx::query_as::<_, DatasetRow>(
            "select schema_name, table_name, column_name, xmin, ymin, zmin, xmax, ymax, zmax,
                    srid, approx_row_count, patch_size, max_points_per_patch, max_patches_per_query, use_morton
             from pc_catalog_datasets
             where schema_name = $1 and table_name = $2 and column_name = $3",
        )
        .bind(schema)
        .bind(table)
        .bind(column)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PcError::Store(e.to_string()))?
        .ok_or_else(|| PcError::NotFound(format!("{schema}.{table}.{column}")))?;

        let mut dataset: Dataset = row.into();
        dataset.output_schemas = self.list_output_schemas(schema, table, column).await?;
        Ok(dataset)
    }

    pub async fn list_output_schemas(&self, schema: &str, table: &str, column: &str) -> PcResult<Vec<OutputSchema>> {
        let rows = sqlx::query_as::<_, OutputSchemaRow>(
            "select pcid, dims_json, scale_x, scale_y, scale_z, offset_x, offset_y, offset_z, srid
             from pc_catalog_output_schemas
             where schema_name = $1 and table_name = $2 and column_name = $3",
        )
        .bind(schema)
        .bind(table)
        .bind(column)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PcError::Store(e.to_string()))?;

        rows.into_iter().map(OutputSchemaRow::into_output_schema).collect()
    }
}
