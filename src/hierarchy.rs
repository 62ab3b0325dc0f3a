//! Multi-parent hierarchies reconstructed from flat classification rows
//!
//! A [`Hierarchy`] owns all nodes of one build batch in an arena. Nodes are
//! addressed by [`NodeId`]; parent and child links are index sets, so sharing
//! a parent between many children never copies it.
//!
//! Hierarchies are built with the [`Builder`] and are used by the global
//! [`crate::Ontology`] and the per-entity [`crate::ClassificationForest`].
use core::fmt::Debug;
use std::fmt::Display;

use crate::decoder::ClassRecord;
use crate::TcrdResult;

mod arena;
mod builder;
mod group;
mod node;

use arena::Arena;
pub use builder::{AcyclicNodes, AllNodes, Builder, ConnectedNodes, LooseCollection};
pub use group::NodeGroup;
pub use node::{HierarchyNode, NodePath, Nodes};

/// Index of a node inside its [`Hierarchy`]
///
/// Indices are assigned in the order in which ids are first seen in the batch
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId {
    inner: u32,
}

impl NodeId {
    pub fn as_usize(&self) -> usize {
        self.inner as usize
    }
}

impl From<u32> for NodeId {
    fn from(inner: u32) -> Self {
        Self { inner }
    }
}

impl From<usize> for NodeId {
    /// # Panics
    ///
    /// Panics if `n` does not fit into an `u32`
    fn from(n: usize) -> Self {
        Self {
            inner: n.try_into().expect("hierarchies hold at most u32::MAX nodes"),
        }
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.inner)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.inner)
    }
}

/// A resolved, acyclic hierarchy of classification nodes
#[derive(Default)]
pub struct Hierarchy {
    nodes: Arena,
}

impl Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hierarchy with {} nodes", self.nodes.len())
    }
}

impl Hierarchy {
    pub(crate) fn new(nodes: Arena) -> Self {
        Self { nodes }
    }

    /// Runs the full build on a batch of decoded records
    ///
    /// # Errors
    ///
    /// [`crate::TcrdError::Cycle`] if a node is its own ancestor
    pub fn from_records<I: IntoIterator<Item = ClassRecord>>(records: I) -> TcrdResult<Self> {
        let mut builder = Builder::new();
        for record in records {
            builder.add_record(record);
        }
        Ok(builder
            .nodes_complete()
            .connect_all_nodes()
            .verify_acyclic()?
            .build())
    }

    /// Returns the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the hierarchy does not contain any node
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the node at the arena index `index`
    pub fn node(&self, index: NodeId) -> Option<HierarchyNode<'_>> {
        self.nodes
            .get(index)
            .map(|node| HierarchyNode::new(self, node))
    }

    /// Returns the node with the public id `id`
    pub fn get(&self, id: &str) -> Option<HierarchyNode<'_>> {
        self.node(self.nodes.index_of(id)?)
    }

    /// Returns an iterator of all nodes, in first-seen order
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    /// Returns all nodes without parents
    pub fn roots(&self) -> impl Iterator<Item = HierarchyNode<'_>> {
        self.iter().filter(|node| node.is_root())
    }

    /// Returns all nodes that are not the parent of any other node
    pub fn leaves(&self) -> impl Iterator<Item = HierarchyNode<'_>> {
        self.iter().filter(|node| node.is_leaf())
    }

    /// Returns the ids of all direct and indirect children of `index`
    pub fn descendants(&self, index: NodeId) -> NodeGroup {
        let mut res = NodeGroup::new();
        let mut queue = vec![index];
        while let Some(current) = queue.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for child in node.children() {
                if res.insert(child) {
                    queue.push(child);
                }
            }
        }
        res
    }
}

/// Iterates the [`Hierarchy`] and yields [`HierarchyNode`]s
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, node::NodeInternal>,
    hierarchy: &'a Hierarchy,
}

impl<'a> Iterator for Iter<'a> {
    type Item = HierarchyNode<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|node| HierarchyNode::new(self.hierarchy, node))
    }
}

impl<'a> IntoIterator for &'a Hierarchy {
    type Item = HierarchyNode<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.nodes.values(),
            hierarchy: self,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::{decode_rows, ClassRow};
    use crate::DecoderConfig;

    fn hierarchy() -> Hierarchy {
        let rows = vec![
            ClassRow::new("PC00197", "transmembrane signal receptor", "PC00000"),
            ClassRow::new("PC00021", "G-protein coupled receptor", "PC00197|PC00000"),
            ClassRow::new("PC00022", "Family A GPCR", "PC00021|PC00197|PC00000"),
            ClassRow::new("PC00176", "kinase", "PC00000"),
        ];
        Hierarchy::from_records(decode_rows(rows, &DecoderConfig::default())).unwrap()
    }

    #[test]
    fn roots_and_leaves() {
        let hierarchy = hierarchy();
        assert_eq!(hierarchy.len(), 4);

        let roots: Vec<&str> = hierarchy.roots().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["PC00197", "PC00176"]);

        let leaves: Vec<&str> = hierarchy.leaves().map(|n| n.id()).collect();
        assert_eq!(leaves, vec!["PC00022", "PC00176"]);
    }

    #[test]
    fn lookup() {
        let hierarchy = hierarchy();
        let node = hierarchy.get("PC00021").unwrap();
        assert_eq!(node.name(), "G-protein coupled receptor");
        assert_eq!(hierarchy.node(node.index()).unwrap(), node);
        assert!(hierarchy.get("PC99999").is_none());
        assert!(hierarchy.node(100u32.into()).is_none());
    }

    #[test]
    fn descendants() {
        let hierarchy = hierarchy();
        let root = hierarchy.get("PC00197").unwrap();
        let descendants = hierarchy.descendants(root.index());
        assert_eq!(descendants.len(), 2);
        assert!(hierarchy.descendants(hierarchy.get("PC00176").unwrap().index()).is_empty());
    }

    #[test]
    fn paths_and_distances() {
        let hierarchy = hierarchy();
        let leaf = hierarchy.get("PC00022").unwrap();
        let root = hierarchy.get("PC00197").unwrap();

        let paths = leaf.paths();
        assert_eq!(paths.len(), 2);
        let ids: Vec<Vec<&str>> = paths
            .iter()
            .map(|p| p.iter().map(|n| n.id()).collect())
            .collect();
        assert!(ids.contains(&vec!["PC00197", "PC00021", "PC00022"]));
        assert!(ids.contains(&vec!["PC00197", "PC00022"]));

        assert_eq!(leaf.distance_to_ancestor(&root), Some(1));
        assert!(root.parent_of(&leaf));
        assert_eq!(root.distance_to_ancestor(&leaf), None);
    }

    #[test]
    fn to_path() {
        let hierarchy = hierarchy();
        let path = hierarchy.get("PC00021").unwrap().to_path();
        assert_eq!(path.id, "PC00021");
        assert_eq!(path.parents.len(), 1);
        assert_eq!(path.parents[0].id, "PC00197");
        assert!(path.parents[0].parents.is_empty());
    }
}
