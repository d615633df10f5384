//! The hierarchy tree itself: a recursive octant node carrying a point
//! count, serialized for the on-disk cache as a sparse JSON object (absent
//! children mean "no points", matching the pruning invariant).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pc_common::bbox::OCTANT_CODES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub children: BTreeMap<String, Box<HierarchyNode>>,
}

impl HierarchyNode {
    pub fn leaf(n: u32) -> Self {
        Self {
            n: Some(n),
            children: BTreeMap::new(),
        }
    }

    /// A node is prunable when it has no count of its own and no
    /// non-empty descendants.
    pub fn is_empty(&self) -> bool {
        self.n.is_none() && self.children.is_empty()
    }

    pub fn set_child(&mut self, octant: &str, child: HierarchyNode) {
        debug_assert!(OCTANT_CODES.contains(&octant));
        if !child.is_empty() {
            self.children.insert(octant.to_string(), Box::new(child));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_child_is_not_attached() {
        let mut root = HierarchyNode::leaf(10);
        root.set_child("nwu", HierarchyNode::default());
        assert!(root.children.is_empty());
    }

    #[test]
    fn non_empty_child_is_attached() {
        let mut root = HierarchyNode::leaf(10);
        root.set_child("nwu", HierarchyNode::leaf(3));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children["nwu"].n, Some(3));
    }

    #[test]
    fn serializes_sparsely() {
        let mut root = HierarchyNode::leaf(10);
        root.set_child("seu", HierarchyNode::leaf(2));
        let json = serde_json::to_string(&root).unwrap();
        assert!(json.contains("\"n\":10"));
        assert!(json.contains("\"seu\""));
        assert!(!json.contains("nwu"));
    }
}
