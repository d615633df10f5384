//! Builds a tiled-scene root document from a hierarchy tree, for the
//! sibling tile-based protocol that shares the same `HierarchyEngine`
//! traversal rather than duplicating it.

use serde::Serialize;

use pc_common::BoundingBox3;

use crate::tree::HierarchyNode;

#[derive(Debug, Serialize)]
pub struct Tile {
    pub bounding_volume: [f64; 6],
    pub geometric_error: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tile>,
}

#[derive(Debug, Serialize)]
pub struct Tileset {
    pub asset_version: &'static str,
    pub geometric_error: f64,
    pub root: Tile,
}

pub struct TilesetBuilder;

impl TilesetBuilder {
    /// Walk a hierarchy tree, pairing each present node with its octant
    /// bbox (recomputed by the same midpoint split `HierarchyEngine` used
    /// to build the tree) to produce the tile tree a 3D-tiles-style
    /// viewer expects.
    pub fn build(node: &HierarchyNode, bbox: BoundingBox3, base_uri: &str, path: &str) -> Option<Tileset> {
        let root = Self::build_tile(node, bbox, base_uri, path)?;
        Some(Tileset {
            asset_version: "1.0",
            geometric_error: geometric_error_for(0),
            root,
        })
    }

    fn build_tile(node: &HierarchyNode, bbox: BoundingBox3, base_uri: &str, path: &str) -> Option<Tile> {
        let n = node.n?;
        let depth = path.len() as u32;

        let octants = bbox.split_octants();
        let children = pc_common::bbox::OCTANT_CODES
            .into_iter()
            .zip(octants.into_iter())
            .filter_map(|(octant, child_bbox)| {
                let child_node = node.children.get(octant)?;
                let child_path = format!("{path}{octant}");
                Self::build_tile(child_node, child_bbox, base_uri, &child_path)
            })
            .collect::<Vec<_>>();

        Some(Tile {
            bounding_volume: [bbox.xmin, bbox.ymin, bbox.zmin, bbox.xmax, bbox.ymax, bbox.zmax],
            geometric_error: geometric_error_for(depth),
            content_uri: if n > 0 { Some(format!("{base_uri}/{path}")) } else { None },
            children,
        })
    }
}

/// Geometric error halves each level, matching the bbox's own halving on
/// every split.
fn geometric_error_for(depth: u32) -> f64 {
    100.0 / 2f64.powi(depth as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_root_tile_for_nonempty_node() {
        let mut node = HierarchyNode::leaf(10);
        node.set_child("nwu", HierarchyNode::leaf(2));
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 10.0);

        let tileset = TilesetBuilder::build(&node, bbox, "tiles", "").unwrap();
        assert_eq!(tileset.root.children.len(), 1);
        assert_eq!(tileset.root.content_uri.as_deref(), Some("tiles/"));
    }

    #[test]
    fn empty_root_produces_no_tileset() {
        let node = HierarchyNode::default();
        let bbox = BoundingBox3::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        assert!(TilesetBuilder::build(&node, bbox, "tiles", "").is_none());
    }
}
