use std::ops::BitOr;

use crate::hierarchy::NodeId;

/// A set of [`NodeId`]s
///
/// Each node can occur only once in the group. The ids are kept sorted,
/// which is also the order in which the nodes were first seen while building
/// the hierarchy.
///
/// This group is used for the children and the cached ancestors of a node
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeGroup {
    ids: Vec<NodeId>,
}

impl NodeGroup {
    /// Constructs a new, empty [`NodeGroup`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a new, empty [`NodeGroup`] with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Returns `true` if the group contains no [`NodeId`]s
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of [`NodeId`]s in the group
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Adds a new [`NodeId`] to the group
    ///
    /// Returns whether the `NodeId` was newly inserted
    pub fn insert(&mut self, id: NodeId) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(idx) => {
                self.ids.insert(idx, id);
                true
            }
        }
    }

    /// Returns `true` if the group contains the [`NodeId`]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Returns an Iterator of the [`NodeId`]s inside the group
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, NodeId>> {
        self.ids.iter().copied()
    }

    pub(crate) fn as_slice(&self) -> &[NodeId] {
        &self.ids
    }
}

impl FromIterator<NodeId> for NodeGroup {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        let mut group = NodeGroup::new();
        for id in iter {
            group.insert(id);
        }
        group
    }
}

impl<'a> IntoIterator for &'a NodeGroup {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BitOr for &NodeGroup {
    type Output = NodeGroup;

    fn bitor(self, rhs: &NodeGroup) -> NodeGroup {
        let (large, small) = if self.len() > rhs.len() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let mut group = large.clone();
        for id in small {
            group.insert(id);
        }
        group
    }
}
