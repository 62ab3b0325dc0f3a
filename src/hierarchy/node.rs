use serde::Serialize;
use smallvec::SmallVec;

use crate::decoder::AncestorChain;
use crate::hierarchy::group::NodeGroup;
use crate::hierarchy::{Hierarchy, NodeId};
use crate::{DEFAULT_NUM_CHILDREN, DEFAULT_NUM_PARENTS};

pub(crate) type Parents = SmallVec<[NodeId; DEFAULT_NUM_PARENTS]>;

#[derive(Debug)]
pub(crate) struct NodeInternal {
    index: NodeId,
    id: String,
    name: String,
    parent_ids: AncestorChain,
    parents: Parents,
    children: NodeGroup,
    all_parents: NodeGroup,
}

impl NodeInternal {
    pub fn new(index: NodeId, id: String, name: String, parent_ids: AncestorChain) -> Self {
        Self {
            index,
            id,
            name,
            parent_ids,
            parents: Parents::new(),
            children: NodeGroup::with_capacity(DEFAULT_NUM_CHILDREN),
            all_parents: NodeGroup::default(),
        }
    }

    pub fn index(&self) -> NodeId {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_ids(&self) -> &AncestorChain {
        &self.parent_ids
    }

    pub fn parent_ids_mut(&mut self) -> &mut AncestorChain {
        &mut self.parent_ids
    }

    pub fn parents(&self) -> &Parents {
        &self.parents
    }

    pub fn children(&self) -> &NodeGroup {
        &self.children
    }

    pub fn all_parents(&self) -> &NodeGroup {
        &self.all_parents
    }

    pub fn all_parents_mut(&mut self) -> &mut NodeGroup {
        &mut self.all_parents
    }

    /// Returns `true` once the transitive ancestors are known
    ///
    /// A node without parents never needs caching
    pub fn parents_cached(&self) -> bool {
        if self.parents.is_empty() {
            true
        } else {
            !self.all_parents.is_empty()
        }
    }

    pub fn add_parent(&mut self, parent: NodeId) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    pub fn add_child(&mut self, child: NodeId) -> bool {
        self.children.insert(child)
    }
}

impl PartialEq for NodeInternal {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for NodeInternal {}

/// A single node of a [`Hierarchy`]
///
/// The node borrows the hierarchy it belongs to and provides traversal
/// towards its parents and children.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyNode<'a> {
    node: &'a NodeInternal,
    hierarchy: &'a Hierarchy,
}

impl<'a> HierarchyNode<'a> {
    pub(crate) fn new(hierarchy: &'a Hierarchy, node: &'a NodeInternal) -> Self {
        Self { node, hierarchy }
    }

    /// Returns the arena index of the node
    pub fn index(&self) -> NodeId {
        self.node.index()
    }

    /// Returns the public id of the node, e.g. `PC00197`
    pub fn id(&self) -> &'a str {
        self.node.id()
    }

    /// Returns the display name of the node
    pub fn name(&self) -> &'a str {
        self.node.name()
    }

    /// Returns the decoded, unresolved ancestor ids of the node
    ///
    /// This can contain ids that are not present in the hierarchy
    pub fn parent_ids(&self) -> &'a AncestorChain {
        self.node.parent_ids()
    }

    /// Returns an iterator of the resolved direct parents
    pub fn parents(&self) -> Nodes<'a> {
        Nodes::new(self.node.parents(), self.hierarchy)
    }

    /// Returns an iterator of the direct children
    pub fn children(&self) -> Nodes<'a> {
        Nodes::new(self.node.children().as_slice(), self.hierarchy)
    }

    /// Returns an iterator of all direct and indirect parents
    pub fn all_parents(&self) -> Nodes<'a> {
        Nodes::new(self.node.all_parents().as_slice(), self.hierarchy)
    }

    /// Returns `true` if the node does not have any parent
    pub fn is_root(&self) -> bool {
        self.node.parents().is_empty()
    }

    /// Returns `true` if no other node has this node as parent
    pub fn is_leaf(&self) -> bool {
        self.node.children().is_empty()
    }

    /// Returns `true` if `self` is a child (direct or indirect) of `other`
    pub fn child_of(&self, other: &HierarchyNode) -> bool {
        self.node.all_parents().contains(&other.index())
    }

    /// Returns `true` if `self` is a parent (direct or indirect) of `other`
    pub fn parent_of(&self, other: &HierarchyNode) -> bool {
        other.child_of(self)
    }

    /// Returns every path from a root down to this node
    ///
    /// Each path starts with a root and ends with `self`
    pub fn paths(&self) -> Vec<Vec<HierarchyNode<'a>>> {
        if self.is_root() {
            return vec![vec![*self]];
        }
        let mut res = Vec::new();
        for parent in self.parents() {
            for mut path in parent.paths() {
                path.push(*self);
                res.push(path);
            }
        }
        res
    }

    /// Returns the length of the shortest path to `other`, if `other` is an ancestor
    pub fn distance_to_ancestor(&self, other: &HierarchyNode) -> Option<usize> {
        if self.index() == other.index() {
            return Some(0);
        }
        if !self.child_of(other) {
            return None;
        }
        self.parents()
            .filter_map(|p| p.distance_to_ancestor(other))
            .min()
            .map(|c| c + 1)
    }

    /// Returns an owned copy of the node with its resolved ancestors
    pub fn to_path(&self) -> NodePath {
        NodePath {
            id: self.id().to_string(),
            name: self.name().to_string(),
            parents: self.parents().map(|p| p.to_path()).collect(),
        }
    }
}

impl PartialEq for HierarchyNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node.id() == other.node.id()
    }
}

impl Eq for HierarchyNode<'_> {}

/// Owned, serializable upward view of a node
///
/// This is the shape the API layer renders for classification paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodePath {
    pub id: String,
    pub name: String,
    pub parents: Vec<NodePath>,
}

/// Iterates [`HierarchyNode`]s from a list of [`NodeId`]s
pub struct Nodes<'a> {
    ids: std::slice::Iter<'a, NodeId>,
    hierarchy: &'a Hierarchy,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(ids: &'a [NodeId], hierarchy: &'a Hierarchy) -> Self {
        Self {
            ids: ids.iter(),
            hierarchy,
        }
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = HierarchyNode<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.ids.next()?;
        self.hierarchy.node(*index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl std::fmt::Debug for Nodes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nodes")
    }
}
