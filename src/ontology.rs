use core::fmt::Debug;
use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::{decode_rows, ClassRow};
use crate::hierarchy::{Hierarchy, HierarchyNode, Iter, NodeGroup, NodeId};
use crate::{DecoderConfig, TcrdError, TcrdResult};

/// The ontologies that are stored as flat ancestor-chain tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OntologyKind {
    /// PANTHER protein classes
    Panther,
    /// Disease Ontology
    Disease,
    /// Drug Target Ontology
    Dto,
}

impl Display for OntologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OntologyKind::Panther => "PANTHER",
            OntologyKind::Disease => "DO",
            OntologyKind::Dto => "DTO",
        };
        write!(f, "{name}")
    }
}

impl TryFrom<&str> for OntologyKind {
    type Error = TcrdError;
    fn try_from(s: &str) -> TcrdResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "panther" => Ok(OntologyKind::Panther),
            "disease" | "do" => Ok(OntologyKind::Disease),
            "dto" => Ok(OntologyKind::Dto),
            _ => Err(TcrdError::InvalidInput(format!("unknown ontology {s}"))),
        }
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// A complete ontology, built once at startup and read-only afterwards
///
/// The [`Ontology`] is `Send + Sync` and is shared between all requests,
/// usually wrapped in an [`std::sync::Arc`].
///
/// ```mermaid
/// erDiagram
///     ONTOLOGY ||--|{ NODE : contains
///     NODE }o--o{ NODE : is_a
///     NODE {
///         str id
///         str name
///         AncestorChain parent_ids
///         NodeIds parents
///         NodeIds children
///     }
/// ```
///
/// # Examples
///
/// ```
/// use tcrd::{ClassRow, DecoderConfig, Ontology, OntologyKind};
///
/// let rows = vec![
///     ClassRow::new("DOID:4", "disease", ""),
///     ClassRow::new("DOID:162", "cancer", "DOID:14566|DOID:4"),
///     ClassRow::new("DOID:14566", "disease of cellular proliferation", "DOID:4"),
/// ];
/// let ontology = Ontology::from_rows(
///     OntologyKind::Disease,
///     rows,
///     &DecoderConfig::without_sentinel(),
/// ).unwrap();
///
/// let roots: Vec<&str> = ontology.roots().map(|n| n.id()).collect();
/// assert_eq!(roots, vec!["DOID:4"]);
///
/// let cancer = ontology.lookup("Cancer").unwrap();
/// assert_eq!(cancer.id(), "DOID:162");
/// assert_eq!(cancer.all_parents().count(), 2);
/// ```
pub struct Ontology {
    kind: OntologyKind,
    hierarchy: Hierarchy,
    names: HashMap<String, NodeId>,
}

impl Debug for Ontology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ontology with {} nodes", self.kind, self.hierarchy.len())
    }
}

impl Ontology {
    /// Builds the ontology from all rows of its table
    ///
    /// # Errors
    ///
    /// [`TcrdError::Cycle`] if the rows describe a cycle
    pub fn from_rows<I: IntoIterator<Item = ClassRow>>(
        kind: OntologyKind,
        rows: I,
        config: &DecoderConfig,
    ) -> TcrdResult<Self> {
        let hierarchy = Hierarchy::from_records(decode_rows(rows, config))?;
        Ok(Self::new(kind, hierarchy))
    }

    pub fn new(kind: OntologyKind, hierarchy: Hierarchy) -> Self {
        let mut names = HashMap::with_capacity(hierarchy.len());
        for node in &hierarchy {
            names
                .entry(node.name().to_lowercase())
                .or_insert(node.index());
        }
        debug!("Loaded {} ontology with {} nodes", kind, hierarchy.len());
        Self {
            kind,
            hierarchy,
            names,
        }
    }

    pub fn kind(&self) -> OntologyKind {
        self.kind
    }

    /// Returns the number of nodes in the ontology
    pub fn len(&self) -> usize {
        self.hierarchy.len()
    }

    /// Returns `true` if the ontology does not contain any node
    pub fn is_empty(&self) -> bool {
        self.hierarchy.is_empty()
    }

    /// Returns all nodes without parents
    pub fn roots(&self) -> impl Iterator<Item = HierarchyNode<'_>> {
        self.hierarchy.roots()
    }

    /// Returns the node with the id `id`
    pub fn node(&self, id: &str) -> Option<HierarchyNode<'_>> {
        self.hierarchy.get(id)
    }

    /// Returns the node with the name `name`
    ///
    /// Names are matched case-insensitive. If several nodes share the same
    /// name, the first one is returned.
    pub fn node_by_name(&self, name: &str) -> Option<HierarchyNode<'_>> {
        let index = self.names.get(&name.to_lowercase())?;
        self.hierarchy.node(*index)
    }

    /// Returns the node with the given id or, if there is none, the given name
    pub fn lookup(&self, id_or_name: &str) -> Option<HierarchyNode<'_>> {
        self.node(id_or_name)
            .or_else(|| self.node_by_name(id_or_name))
    }

    /// Returns the ids of all direct and indirect children of `id`
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if there is no node `id`
    pub fn descendants(&self, id: &str) -> TcrdResult<NodeGroup> {
        let node = self.node(id).ok_or(TcrdError::DoesNotExist)?;
        Ok(self.hierarchy.descendants(node.index()))
    }

    /// Returns all direct and indirect parents of `id`
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if there is no node `id`
    pub fn all_parents(&self, id: &str) -> TcrdResult<Vec<HierarchyNode<'_>>> {
        let node = self.node(id).ok_or(TcrdError::DoesNotExist)?;
        Ok(node.all_parents().collect())
    }

    /// Returns every path from a root down to `id`
    ///
    /// Each path starts with a root and ends with the node itself
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if there is no node `id`
    pub fn path_to_root(&self, id: &str) -> TcrdResult<Vec<Vec<HierarchyNode<'_>>>> {
        let node = self.node(id).ok_or(TcrdError::DoesNotExist)?;
        Ok(node.paths())
    }

    /// Returns an iterator of all nodes
    pub fn iter(&self) -> Iter<'_> {
        self.hierarchy.iter()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Returns the code to create a `Mermaid` flow diagram
    ///
    /// This is meant to be used with smaller ontologies
    pub fn as_mermaid(&self) -> String {
        let mut code = String::new();
        code.push_str("graph TD\n");
        for node in self {
            code.push_str(&format!(
                "{}[\"{}<br>\n{}\"]\n",
                node.id(),
                node.id(),
                node.name()
            ));
            for child in node.children() {
                code.push_str(&format!("{} --> {}\n", node.id(), child.id()));
            }
        }
        code
    }
}

impl<'a> IntoIterator for &'a Ontology {
    type Item = HierarchyNode<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.hierarchy.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rayon::prelude::*;
    use std::sync::Arc;

    fn dto() -> Ontology {
        let rows = vec![
            ClassRow::new("DTO:01", "Protein", ""),
            ClassRow::new("DTO:02", "Kinase", "DTO:01"),
            ClassRow::new("DTO:03", "Ion channel", "DTO:01"),
            ClassRow::new("DTO:04", "Protein kinase", "DTO:02|DTO:01"),
            ClassRow::new("DTO:05", "Tyrosine kinase", "DTO:04|DTO:02|DTO:01"),
            ClassRow::new("DTO:06", "Orphan", ""),
            ClassRow::new("DTO:07", "kinase", "DTO:06"),
        ];
        Ontology::from_rows(OntologyKind::Dto, rows, &DecoderConfig::without_sentinel()).unwrap()
    }

    #[test]
    fn roots_have_no_parents() {
        let ontology = dto();
        let roots: Vec<&str> = ontology.roots().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["DTO:01", "DTO:06"]);

        let expected: Vec<&str> = ontology
            .iter()
            .filter(|n| n.parents().count() == 0)
            .map(|n| n.id())
            .collect();
        assert_eq!(roots, expected);
    }

    #[test]
    fn lookup_by_id_and_name() {
        let ontology = dto();
        assert_eq!(ontology.lookup("DTO:03").unwrap().name(), "Ion channel");
        assert_eq!(ontology.lookup("ion CHANNEL").unwrap().id(), "DTO:03");
        // first node with that name wins
        assert_eq!(ontology.lookup("KINASE").unwrap().id(), "DTO:02");
        assert!(ontology.lookup("GPCR").is_none());
    }

    #[test]
    fn descendants() {
        let ontology = dto();
        assert_eq!(ontology.descendants("DTO:02").unwrap().len(), 2);
        assert!(ontology.descendants("DTO:99").is_err());
    }

    #[test]
    fn ancestors_and_paths() {
        let ontology = dto();
        let parents: Vec<&str> = ontology
            .all_parents("DTO:05")
            .unwrap()
            .iter()
            .map(|n| n.id())
            .collect();
        assert_eq!(parents, vec!["DTO:01", "DTO:02", "DTO:04"]);

        let paths = ontology.path_to_root("DTO:04").unwrap();
        let ids: Vec<Vec<&str>> = paths
            .iter()
            .map(|path| path.iter().map(|n| n.id()).collect())
            .collect();
        assert!(ids.contains(&vec!["DTO:01", "DTO:02", "DTO:04"]));
        assert!(ids.contains(&vec!["DTO:01", "DTO:04"]));
        assert!(ontology.path_to_root("DTO:99").is_err());
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(OntologyKind::try_from("DO").unwrap(), OntologyKind::Disease);
        assert_eq!(OntologyKind::try_from("panther").unwrap(), OntologyKind::Panther);
        assert!(OntologyKind::try_from("hpo").is_err());
    }

    #[test]
    fn mermaid() {
        let code = dto().as_mermaid();
        assert!(code.starts_with("graph TD\n"));
        assert!(code.contains("DTO:01 --> DTO:02"));
    }

    #[test]
    fn shared_read_only_between_threads() {
        let ontology = Arc::new(dto());
        let counts: Vec<usize> = (0..64)
            .into_par_iter()
            .map(|_| {
                let ontology = Arc::clone(&ontology);
                ontology.lookup("Tyrosine kinase").unwrap().all_parents().count()
            })
            .collect();
        assert!(counts.iter().all(|c| *c == 3));
    }
}
