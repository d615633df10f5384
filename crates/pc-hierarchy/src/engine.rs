//! Recursive octree traversal.
//!
//! The root's 8 children are dispatched to a worker pool bounded by the
//! store's connection-pool size; everything below that level recurses
//! serially inside whichever worker picked it up. This mirrors the
//! bounded-concurrency idiom used for startup cache warming: a
//! `Semaphore` sized to the pool plus `tokio::spawn` per unit of work,
//! rather than letting recursion fan out without limit and starve the
//! pool.

use std::sync::Arc;

use pc_common::{BoundingBox3, Dataset};

use pc_store::{NodeQuery, RankRange, StoreClient};

use crate::tree::HierarchyNode;

pub struct HierarchyEngine {
    store: Arc<StoreClient>,
    /// Bounds both the root fan-out width and, indirectly, max inflight
    /// queries: equal to the store's connection-pool size.
    pool_size: usize,
}

impl HierarchyEngine {
    pub fn new(store: Arc<StoreClient>, pool_size: u32) -> Self {
        Self {
            store,
            pool_size: pool_size as usize,
        }
    }

    /// Build the hierarchy tree for `[lod_min, lod_max]` over `root_bbox`.
    #[tracing::instrument(skip(self, dataset), fields(table = %dataset.qualified_table(), lod_min, lod_max))]
    pub async fn build(&self, dataset: &Dataset, root_bbox: BoundingBox3, lod_min: u32, lod_max: u32) -> HierarchyNode {
        let root_n = self.query_node_count(dataset, &root_bbox, lod_min).await;

        let mut root = match root_n {
            Some(n) => HierarchyNode::leaf(n),
            None => HierarchyNode::default(),
        };

        if root_n.is_some() && lod_min < lod_max {
            let children = self.expand_root_children(dataset, &root_bbox, lod_min, lod_max).await;
            for (octant, child) in children {
                root.set_child(octant, child);
            }
        }

        root
    }

    /// Dispatch the root's 8 octants to a `Semaphore`-bounded pool of
    /// `tokio::spawn`ed tasks, then let each task recurse serially.
    async fn expand_root_children(
        &self,
        dataset: &Dataset,
        root_bbox: &BoundingBox3,
        lod_min: u32,
        lod_max: u32,
    ) -> Vec<(&'static str, HierarchyNode)> {
        use pc_common::bbox::OCTANT_CODES;

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.pool_size));
        let octants = root_bbox.split_octants();

        let mut handles = Vec::with_capacity(8);
        for (octant, bbox) in OCTANT_CODES.into_iter().zip(octants.into_iter()) {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let dataset = dataset.clone();

            handles.push(tokio::spawn(async move {
                let permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
                let engine = HierarchyEngine::new(store, 1);
                let node = engine.build_serial(&dataset, bbox, lod_min + 1, lod_max).await;
                drop(permit);
                (octant, node)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(pair) => results.push(pair),
                Err(err) => tracing::warn!(?err, "hierarchy worker task panicked, treating child as empty"),
            }
        }
        results
    }

    /// Same algorithm as `build`, but without ever spawning a further
    /// fan-out: used for everything below the root. Boxed because async
    /// fns can't recurse directly (the future would have infinite size).
    fn build_serial<'a>(
        &'a self,
        dataset: &'a Dataset,
        bbox: BoundingBox3,
        lod_min: u32,
        lod_max: u32,
    ) -> futures::future::BoxFuture<'a, HierarchyNode> {
        Box::pin(async move {
            let n = self.query_node_count(dataset, &bbox, lod_min).await;
            let mut node = match n {
                Some(n) => HierarchyNode::leaf(n),
                None => return HierarchyNode::default(),
            };

            if lod_min < lod_max {
                use pc_common::bbox::OCTANT_CODES;
                let octants = bbox.split_octants();
                for (octant, child_bbox) in OCTANT_CODES.into_iter().zip(octants.into_iter()) {
                    let child = self.build_serial(dataset, child_bbox, lod_min + 1, lod_max).await;
                    node.set_child(octant, child);
                }
            }

            node
        })
    }

    async fn query_node_count(&self, dataset: &Dataset, bbox: &BoundingBox3, lod: u32) -> Option<u32> {
        let range = match dataset.max_points_per_patch {
            Some(m) => RankRange::flat(m),
            None => RankRange::for_lod(lod),
        };
        let table = dataset.qualified_table();
        let query = NodeQuery {
            table: &table,
            column: &dataset.column_name,
            bbox: *bbox,
            range,
            srid: dataset.srid,
            max_patches: dataset.max_patches_per_query,
            use_morton: dataset.use_morton,
        };

        match self.store.query_hierarchy_node(&query).await {
            Ok(Some(wkb)) => match pc_codec::npoints(&wkb) {
                Ok(n) => Some(n),
                Err(err) => {
                    tracing::debug!(?err, "failed to decode patch header, treating node as empty");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(?err, table = %dataset.qualified_table(), lod, "store query failed, pruning subtree");
                None
            }
        }
    }
}
