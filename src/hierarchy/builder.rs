use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::decoder::{ClassRecord, ClassRow};
use crate::hierarchy::arena::Arena;
use crate::hierarchy::group::NodeGroup;
use crate::hierarchy::{Hierarchy, NodeId};
use crate::{DecoderConfig, TcrdError, TcrdResult};

pub struct LooseCollection;
pub struct AllNodes;
pub struct ConnectedNodes;
pub struct AcyclicNodes;

fn transition_state<TX, TY>(builder: Builder<TX>) -> Builder<TY> {
    Builder::<TY> {
        nodes: builder.nodes,
        dangling: builder.dangling,
        state: PhantomData,
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Builds a [`Hierarchy`] from a batch of decoded rows
///
/// All nodes are allocated before any ancestor id is resolved, so every
/// parent link points at a node that already exists in the arena.
///
/// ```mermaid
/// stateDiagram-v2
///     LooseCollection --> LooseCollection: add_record() / add_row()
///     LooseCollection --> AllNodes: nodes_complete()
///     AllNodes --> ConnectedNodes: connect_all_nodes()
///     ConnectedNodes --> AcyclicNodes: verify_acyclic()
///     AcyclicNodes --> Hierarchy: build()
/// ```
///
/// # Examples
///
/// ```
/// use tcrd::hierarchy::Builder;
/// use tcrd::{ClassRow, DecoderConfig};
///
/// let config = DecoderConfig::default();
/// let mut builder = Builder::new();
/// builder.add_row(ClassRow::new("PC00197", "transmembrane signal receptor", "PC00000"), &config);
/// builder.add_row(ClassRow::new("PC00021", "G-protein coupled receptor", "PC00197|PC00000"), &config);
///
/// let hierarchy = builder
///     .nodes_complete()
///     .connect_all_nodes()
///     .verify_acyclic()
///     .unwrap()
///     .build();
///
/// let gpcr = hierarchy.get("PC00021").unwrap();
/// assert_eq!(gpcr.parents().next().unwrap().id(), "PC00197");
/// ```
pub struct Builder<T> {
    nodes: Arena,
    dangling: usize,
    state: PhantomData<T>,
}

impl Default for Builder<LooseCollection> {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder<LooseCollection> {
    pub fn new() -> Builder<LooseCollection> {
        Builder::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Builder<LooseCollection> {
        Builder::<LooseCollection> {
            nodes: Arena::with_capacity(capacity),
            dangling: 0,
            state: PhantomData,
        }
    }

    /// Adds a decoded record to the hierarchy
    ///
    /// This method does not link the node to its parents
    pub fn add_record(&mut self, record: ClassRecord) -> NodeId {
        self.nodes.insert(record)
    }

    /// Decodes a raw row and adds it to the hierarchy
    pub fn add_row(&mut self, row: ClassRow, config: &DecoderConfig) -> NodeId {
        self.add_record(ClassRecord::from_row(row, config))
    }

    #[must_use]
    pub fn nodes_complete(self) -> Builder<AllNodes> {
        transition_state(self)
    }
}

impl Builder<AllNodes> {
    /// Resolves the ancestor ids of every node into parent and child links
    ///
    /// Ancestor ids that are not part of the batch are dropped from the
    /// resolved parents. The unresolved ids stay available through
    /// [`crate::HierarchyNode::parent_ids`].
    #[must_use]
    pub fn connect_all_nodes(mut self) -> Builder<ConnectedNodes> {
        let indices: Vec<NodeId> = self.nodes.keys().collect();
        for child in indices {
            let parent_ids = self.nodes.get_unchecked(child).parent_ids().clone();
            for parent_id in &parent_ids {
                match self.nodes.index_of(parent_id) {
                    Some(parent) => self.add_parent(parent, child),
                    None => {
                        warn!(
                            "Ancestor {} of {} is not part of the batch",
                            parent_id,
                            self.nodes.get_unchecked(child).id()
                        );
                        self.dangling += 1;
                    }
                }
            }
        }
        transition_state(self)
    }

    fn add_parent(&mut self, parent: NodeId, child: NodeId) {
        self.nodes.get_unchecked_mut(parent).add_child(child);
        self.nodes.get_unchecked_mut(child).add_parent(parent);
    }
}

impl Builder<ConnectedNodes> {
    /// Returns the number of ancestor ids that could not be resolved
    pub fn dangling(&self) -> usize {
        self.dangling
    }

    /// Ensures that no node is its own (indirect) ancestor
    ///
    /// # Errors
    ///
    /// [`TcrdError::Cycle`] with the ids along the first cycle found,
    /// starting and ending with the same id
    pub fn verify_acyclic(self) -> TcrdResult<Builder<AcyclicNodes>> {
        match self.find_cycle() {
            Some(cycle) => {
                let path = cycle
                    .into_iter()
                    .map(|index| self.nodes.get_unchecked(index).id().to_string())
                    .collect();
                Err(TcrdError::Cycle { path })
            }
            None => Ok(transition_state(self)),
        }
    }

    /// Iterative depth-first search along the parent links
    fn find_cycle(&self) -> Option<Vec<NodeId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Visit {
            New,
            Active,
            Done,
        }

        let mut state = vec![Visit::New; self.nodes.len()];
        for start in self.nodes.keys() {
            if state[start.as_usize()] != Visit::New {
                continue;
            }
            state[start.as_usize()] = Visit::Active;
            let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];

            while let Some(&(node, next)) = stack.last() {
                let parents = self.nodes.get_unchecked(node).parents();
                let Some(&parent) = parents.get(next) else {
                    state[node.as_usize()] = Visit::Done;
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match state[parent.as_usize()] {
                    Visit::New => {
                        state[parent.as_usize()] = Visit::Active;
                        stack.push((parent, 0));
                    }
                    Visit::Active => {
                        let pos = stack.iter().position(|(n, _)| *n == parent)?;
                        let mut cycle: Vec<NodeId> = stack[pos..].iter().map(|(n, _)| *n).collect();
                        cycle.push(parent);
                        return Some(cycle);
                    }
                    Visit::Done => {}
                }
            }
        }
        None
    }
}

impl Builder<AcyclicNodes> {
    /// Caches all direct and indirect ancestors and returns the [`Hierarchy`]
    pub fn build(mut self) -> Hierarchy {
        let indices: Vec<NodeId> = self.nodes.keys().collect();
        for index in indices {
            if !self.nodes.get_unchecked(index).parents_cached() {
                self.create_cache_of_ancestors(index);
            }
        }
        debug!(
            "Built hierarchy with {} nodes, {} unresolved ancestors",
            self.nodes.len(),
            self.dangling
        );
        Hierarchy::new(self.nodes)
    }

    /// Collects the parents and all their cached ancestors
    ///
    /// The recursion bubbles up to the roots and caches `all_parents` for
    /// every node on the way back down. It stops at nodes that are already
    /// cached and terminates because the graph is acyclic.
    fn create_cache_of_ancestors(&mut self, index: NodeId) {
        let parents = self.nodes.get_unchecked(index).parents().clone();
        let mut res = NodeGroup::with_capacity(parents.len());
        for parent in parents {
            res.insert(parent);
            for ancestor in self.all_ancestors(parent) {
                res.insert(ancestor);
            }
        }
        *self.nodes.get_unchecked_mut(index).all_parents_mut() = res;
    }

    fn all_ancestors(&mut self, index: NodeId) -> &NodeGroup {
        if !self.nodes.get_unchecked(index).parents_cached() {
            self.create_cache_of_ancestors(index);
        }
        self.nodes.get_unchecked(index).all_parents()
    }
}
