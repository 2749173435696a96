//! Arena-owned component tree.
//!
//! Nodes live in one `Vec` and refer to each other by `NodeIndex`. Each node
//! has a single parent slot and an ordered child index list, so a node can
//! never be its own ancestor and is never shared between two parents.

use std::collections::HashMap;
use std::fmt;

use shared::{ComponentId, ComponentNode};

/// Index of a node in its `ComponentTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    DuplicateId(ComponentId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::DuplicateId(id) => write!(f, "duplicate component id '{}'", id),
        }
    }
}

impl std::error::Error for TreeError {}

/// One node's data without its children
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub data: ComponentNode,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeIndex>,
    by_id: HashMap<ComponentId, NodeIndex>,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the nested persisted form; ids must be unique across the forest
    pub fn from_nodes(roots: &[ComponentNode]) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        for root in roots {
            tree.insert_subtree(root, None)?;
        }
        Ok(tree)
    }

    fn insert_subtree(&mut self, node: &ComponentNode, parent: Option<NodeIndex>) -> Result<NodeIndex, TreeError> {
        let mut data = node.clone();
        let children = std::mem::take(&mut data.children);
        let index = self.insert(data, parent)?;
        for child in &children {
            self.insert_subtree(child, Some(index))?;
        }
        Ok(index)
    }

    /// Insert a childless node under `parent` (or as a root); rejects duplicate ids
    pub fn insert(&mut self, mut data: ComponentNode, parent: Option<NodeIndex>) -> Result<NodeIndex, TreeError> {
        if self.by_id.contains_key(&data.id) {
            return Err(TreeError::DuplicateId(data.id));
        }
        data.children.clear();
        let index = NodeIndex(self.nodes.len());
        let depth = parent.map(|p| self.nodes[p.0].depth + 1).unwrap_or(0);
        self.by_id.insert(data.id.clone(), index);
        self.nodes.push(TreeNode { data, parent, children: Vec::new(), depth });
        match parent {
            Some(p) => self.nodes[p.0].children.push(index),
            None => self.roots.push(index),
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn get(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0]
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.nodes[index.0].parent
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(self.parent(index), move |i| self.parent(*i))
    }

    /// All nodes in depth-first pre-order (parents before children)
    pub fn iter_depth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index.0].children.iter().rev().copied());
        }
        order
    }

    /// Rebuild the nested persisted form
    pub fn to_nodes(&self) -> Vec<ComponentNode> {
        self.roots.iter().map(|r| self.build_nested(*r)).collect()
    }

    fn build_nested(&self, index: NodeIndex) -> ComponentNode {
        let entry = &self.nodes[index.0];
        let mut node = entry.data.clone();
        node.children = entry.children.iter().map(|c| self.build_nested(*c)).collect();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door() -> Vec<ComponentNode> {
        vec![ComponentNode::new("door", "Door").with_children(vec![
            ComponentNode::new("frame", "Frame").with_children(vec![
                ComponentNode::new("stile-l", "Left stile"),
                ComponentNode::new("stile-r", "Right stile"),
            ]),
            ComponentNode::new("glass", "Glass"),
        ])]
    }

    #[test]
    fn test_roundtrip_nested_form() {
        let nodes = door();
        let tree = ComponentTree::from_nodes(&nodes).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.to_nodes(), nodes);
    }

    #[test]
    fn test_parent_and_depth() {
        let tree = ComponentTree::from_nodes(&door()).unwrap();
        let stile = tree.find("stile-r").unwrap();
        let frame = tree.find("frame").unwrap();
        assert_eq!(tree.parent(stile), Some(frame));
        assert_eq!(tree.get(stile).depth, 2);
        let ancestors: Vec<_> = tree.ancestors(stile).map(|i| tree.get(i).data.id.clone()).collect();
        assert_eq!(ancestors, vec!["frame", "door"]);
    }

    #[test]
    fn test_depth_first_order() {
        let tree = ComponentTree::from_nodes(&door()).unwrap();
        let ids: Vec<_> = tree.iter_depth_first().iter().map(|i| tree.get(*i).data.id.as_str()).collect();
        assert_eq!(ids, vec!["door", "frame", "stile-l", "stile-r", "glass"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let nodes = vec![
            ComponentNode::new("a", "A").with_children(vec![ComponentNode::new("b", "B")]),
            ComponentNode::new("b", "B again"),
        ];
        assert_eq!(ComponentTree::from_nodes(&nodes), Err(TreeError::DuplicateId("b".into())));
    }
}
