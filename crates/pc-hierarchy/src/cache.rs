//! Disk-backed hierarchy cache, keyed by a deterministic filename derived
//! from `(table, column, lodmin, lodmax, bbox)`. Writes go through a
//! sibling temp file and an atomic rename so a crash mid-write never
//! leaves a corrupt cache entry behind.

use std::path::{Path, PathBuf};

use pc_common::{BoundingBox3, PcError, PcResult};

use crate::tree::HierarchyNode;

pub struct HierarchyCache {
    base_dir: PathBuf,
    root_override: Option<PathBuf>,
}

impl HierarchyCache {
    pub fn new(base_dir: impl Into<PathBuf>, root_override: Option<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            root_override,
        }
    }

    pub fn cache_path(&self, table: &str, column: &str, lod_min: u32, lod_max: u32, bbox: &BoundingBox3) -> PathBuf {
        if lod_min == 0 {
            if let Some(root) = &self.root_override {
                return root.clone();
            }
        }
        let filename = format!(
            "{table}_{column}_{lod_min}_{lod_max}_{x0}_{y0}_{z0}_{x1}_{y1}_{z1}.hcy",
            x0 = bbox.xmin,
            y0 = bbox.ymin,
            z0 = bbox.zmin,
            x1 = bbox.xmax,
            y1 = bbox.ymax,
            z1 = bbox.zmax,
        );
        self.base_dir.join(filename)
    }

    #[tracing::instrument(skip(self))]
    pub fn get(&self, table: &str, column: &str, lod_min: u32, lod_max: u32, bbox: &BoundingBox3) -> Option<HierarchyNode> {
        let path = self.cache_path(table, column, lod_min, lod_max, bbox);
        match read_tree(&path) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::debug!(?err, path = %path.display(), "hierarchy cache read treated as miss");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, tree))]
    pub fn put(&self, table: &str, column: &str, lod_min: u32, lod_max: u32, bbox: &BoundingBox3, tree: &HierarchyNode) -> PcResult<()> {
        let path = self.cache_path(table, column, lod_min, lod_max, bbox);
        write_tree_atomic(&path, tree)
    }
}

fn read_tree(path: &Path) -> PcResult<Option<HierarchyNode>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let tree = serde_json::from_slice(&bytes)?;
    Ok(Some(tree))
}

fn write_tree_atomic(path: &Path, tree: &HierarchyNode) -> PcResult<()> {
    let dir = path.parent().ok_or_else(|| PcError::CacheIo("cache path has no parent directory".to_string()))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PcError::CacheIo(e.to_string()))?;
    serde_json::to_writer(&mut tmp, tree)?;
    tmp.persist(path).map_err(|e| PcError::CacheIo(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic_for_same_inputs() {
        let cache = HierarchyCache::new("/tmp/pc-cache-test", None);
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0);
        let a = cache.cache_path("public.pts", "pa", 8, 10, &bbox);
        let b = cache.cache_path("public.pts", "pa", 8, 10, &bbox);
        assert_eq!(a, b);
        assert!(a.to_string_lossy().ends_with(".hcy"));
    }

    #[test]
    fn root_override_used_only_at_lod_min_zero() {
        let root_path = PathBuf::from("/tmp/pc-cache-test/root.hcy");
        let cache = HierarchyCache::new("/tmp/pc-cache-test", Some(root_path.clone()));
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0);
        assert_eq!(cache.cache_path("t", "c", 0, 10, &bbox), root_path);
        assert_ne!(cache.cache_path("t", "c", 2, 10, &bbox), root_path);
    }

    #[test]
    fn roundtrip_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HierarchyCache::new(dir.path(), None);
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0);
        let mut tree = HierarchyNode::leaf(42);
        tree.set_child("nwu", HierarchyNode::leaf(3));

        cache.put("t", "c", 0, 10, &bbox, &tree).unwrap();
        let loaded = cache.get("t", "c", 0, 10, &bbox).unwrap();
        assert_eq!(loaded, tree);
    }

    #[test]
    fn missing_cache_entry_is_a_clean_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HierarchyCache::new(dir.path(), None);
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        assert!(cache.get("t", "c", 0, 10, &bbox).is_none());
    }
}
