//! Classification paths of a single entity
//!
//! The store returns every class a target is annotated with, including the
//! intermediate classes. The [`ClassificationForest`] keeps only the most
//! specific classes as entries; their ancestors are reached by walking
//! [`HierarchyNode::parents`].
use crate::decoder::{decode_rows, ClassRecord, ClassRow};
use crate::hierarchy::{Hierarchy, HierarchyNode, NodeId, NodePath};
use crate::{DecoderConfig, TcrdResult};

/// Per-request hierarchy anchored at the most specific classes of one entity
///
/// # Examples
///
/// ```
/// use tcrd::{ClassRow, ClassificationForest, DecoderConfig};
///
/// let rows = vec![
///     ClassRow::new("PC00197", "transmembrane signal receptor", "PC00000"),
///     ClassRow::new("PC00021", "G-protein coupled receptor", "PC00197|PC00000"),
/// ];
/// let forest = ClassificationForest::from_rows(rows, &DecoderConfig::default()).unwrap();
///
/// let entries: Vec<&str> = forest.entries().map(|n| n.id()).collect();
/// assert_eq!(entries, vec!["PC00021"]);
/// assert_eq!(forest.len(), 2);
/// ```
#[derive(Debug)]
pub struct ClassificationForest {
    hierarchy: Hierarchy,
    entries: Vec<NodeId>,
}

impl ClassificationForest {
    /// Decodes and resolves a batch of rows
    ///
    /// # Errors
    ///
    /// [`crate::TcrdError::Cycle`] if the rows describe a cycle
    pub fn from_rows<I: IntoIterator<Item = ClassRow>>(
        rows: I,
        config: &DecoderConfig,
    ) -> TcrdResult<Self> {
        Self::from_records(decode_rows(rows, config))
    }

    /// Resolves a batch of decoded records
    ///
    /// # Errors
    ///
    /// [`crate::TcrdError::Cycle`] if the records describe a cycle
    pub fn from_records<I: IntoIterator<Item = ClassRecord>>(records: I) -> TcrdResult<Self> {
        let hierarchy = Hierarchy::from_records(records)?;
        let entries = hierarchy.leaves().map(|node| node.index()).collect();
        Ok(Self { hierarchy, entries })
    }

    /// Returns the most specific classes, in first-seen order
    pub fn entries(&self) -> impl Iterator<Item = HierarchyNode<'_>> {
        self.entries
            .iter()
            .filter_map(|index| self.hierarchy.node(*index))
    }

    /// Returns every node of the batch, including intermediate classes
    pub fn nodes(&self) -> crate::hierarchy::Iter<'_> {
        self.hierarchy.iter()
    }

    /// Returns the node with the public id `id`
    pub fn get(&self, id: &str) -> Option<HierarchyNode<'_>> {
        self.hierarchy.get(id)
    }

    /// Returns the number of nodes in the batch
    pub fn len(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hierarchy.is_empty()
    }

    /// Returns owned upward paths of all entries
    pub fn to_paths(&self) -> Vec<NodePath> {
        self.entries().map(|node| node.to_path()).collect()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }
}

/// Flat edge list view of a batch: every row with its unresolved ancestors
///
/// No node is filtered and no id is resolved
pub fn flat_edge_list<I: IntoIterator<Item = ClassRow>>(
    rows: I,
    config: &DecoderConfig,
) -> Vec<ClassRecord> {
    decode_rows(rows, config)
}
