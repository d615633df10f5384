//! Wires the config-loaded connection pool, catalog, schema registry, and
//! hierarchy engine/cache into the shared handle an (out-of-scope) HTTP
//! layer would hold as its application state.

use std::sync::Arc;

use pc_common::{BoundingBox3, Config, Dataset};
use pc_hierarchy::{HierarchyCache, HierarchyEngine, HierarchyNode};
use pc_store::{SchemaRegistry, StoreClient, TableCatalog};

pub struct AppState {
    pub config: Config,
    pub store: Arc<StoreClient>,
    pub catalog: TableCatalog,
    pub schema_registry: Arc<SchemaRegistry>,
    pub hierarchy_engine: HierarchyEngine,
    pub hierarchy_cache: HierarchyCache,
}

impl AppState {
    /// Build from environment configuration: connects the store pool,
    /// runs the catalog migration, and wires the rest together. Failures
    /// here are startup-fatal (unlike request-scoped store errors, which
    /// degrade instead of propagating), so this returns `anyhow::Result`
    /// the way the teacher's application bootstrap does.
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = Config::from_env();
        Self::from_config(config).await
    }

    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let database_url = config.database_url();

        let store = Arc::new(StoreClient::connect(&database_url, config.pool_size).await?);
        let catalog = TableCatalog::connect(&database_url, config.pool_size).await?;
        catalog.migrate().await?;

        let schema_registry = Arc::new(SchemaRegistry::new(catalog.pool().clone()));
        let hierarchy_engine = HierarchyEngine::new(store.clone(), config.pool_size);
        let hierarchy_cache = HierarchyCache::new(
            config.cache_dir.clone(),
            config.root_hcy.clone().map(std::path::PathBuf::from),
        );

        Ok(Self {
            config,
            store,
            catalog,
            schema_registry,
            hierarchy_engine,
            hierarchy_cache,
        })
    }

    /// Serve a `Hierarchy` call: consult the cache first, building and
    /// populating it on miss. This is the cache-consult responsibility §4.5
    /// places in the core rather than the (out-of-scope) HTTP handler.
    #[tracing::instrument(skip(self, dataset, root_bbox), fields(table = %dataset.qualified_table(), lod_min, lod_max))]
    pub async fn hierarchy(&self, dataset: &Dataset, root_bbox: BoundingBox3, lod_min: u32, lod_max: u32) -> HierarchyNode {
        let table = dataset.qualified_table();

        if let Some(tree) = self.hierarchy_cache.get(&table, &dataset.column_name, lod_min, lod_max, &root_bbox) {
            return tree;
        }

        let tree = self.hierarchy_engine.build(dataset, root_bbox, lod_min, lod_max).await;

        if let Err(err) = self.hierarchy_cache.put(&table, &dataset.column_name, lod_min, lod_max, &root_bbox, &tree) {
            tracing::debug!(?err, table = %table, "hierarchy cache write failed, serving uncached tree");
        }

        tree
    }
}
