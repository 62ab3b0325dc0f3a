use std::collections::HashMap;

use crate::decoder::ClassRecord;
use crate::hierarchy::node::NodeInternal;
use crate::hierarchy::NodeId;

/// Owns all nodes of a hierarchy, addressed by [`NodeId`]
///
/// Nodes are never removed, so a `NodeId` handed out by the arena stays valid
/// for the lifetime of the arena.
#[derive(Default)]
pub(crate) struct Arena {
    nodes: Vec<NodeInternal>,
    ids: HashMap<String, NodeId>,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ids: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a decoded record and returns its index
    ///
    /// A record whose id is already present keeps the first name and
    /// adds its ancestor ids to the existing node.
    pub fn insert(&mut self, record: ClassRecord) -> NodeId {
        if let Some(index) = self.ids.get(&record.id) {
            let index = *index;
            self.get_unchecked_mut(index)
                .parent_ids_mut()
                .extend(record.parents);
            return index;
        }
        let index = NodeId::from(self.nodes.len());
        self.ids.insert(record.id.clone(), index);
        self.nodes.push(NodeInternal::new(
            index,
            record.id,
            record.name,
            record.parents,
        ));
        index
    }

    pub fn get(&self, index: NodeId) -> Option<&NodeInternal> {
        self.nodes.get(index.as_usize())
    }

    /// Returns the index of the node with the public id `id`
    pub fn index_of(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// # Panics
    ///
    /// Panics if `index` was not handed out by this arena
    pub fn get_unchecked(&self, index: NodeId) -> &NodeInternal {
        &self.nodes[index.as_usize()]
    }

    /// # Panics
    ///
    /// Panics if `index` was not handed out by this arena
    pub fn get_unchecked_mut(&mut self, index: NodeId) -> &mut NodeInternal {
        &mut self.nodes[index.as_usize()]
    }

    pub fn values(&self) -> std::slice::Iter<'_, NodeInternal> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::from)
    }
}
