//! Query core of the TCRD target knowledge base
//!
//! The crate sits between the relational store and the API layer. It turns
//! flat ontology rows into navigable graphs, aggregates facet counts for
//! search endpoints and folds ligand rows from several source tables into
//! one canonical ligand.
//!
//! - [`decoder`]: parses delimited ancestor chains into [`AncestorChain`]s
//! - [`Ontology`] and [`ClassificationForest`]: hierarchies built from rows
//! - [`facet`]: facet catalog, concurrent aggregation and value pagination
//! - [`ligand`]: merging of drug and compound rows
//! - [`store`]: the async store collaborator
//! - [`Tcrd`]: the service façade used by the API layer
use thiserror::Error;

pub mod config;
pub mod decoder;
pub mod facet;
pub mod forest;
pub mod hierarchy;
pub mod ligand;
pub mod ontology;
mod service;
pub mod store;

pub use config::{Config, DecoderConfig};
pub use decoder::{AncestorChain, ClassRecord, ClassRow};
pub use facet::{FacetResult, FacetValue, Filter, ResultEnvelope};
pub use forest::ClassificationForest;
pub use hierarchy::{HierarchyNode, NodeId};
pub use ligand::{CanonicalLigand, LigandRow, LigandSources};
pub use ontology::{Ontology, OntologyKind};
pub use service::Tcrd;
pub use store::Store;

/// Delimiter between ancestor ids in a stored ancestor chain
const DEFAULT_DELIMITER: char = '|';
/// Universal root of the PANTHER protein class tree
const PANTHER_ROOT: &str = "PC00000";
/// Number of direct parents stored inline before spilling to the heap
const DEFAULT_NUM_PARENTS: usize = 4;
const DEFAULT_NUM_CHILDREN: usize = 8;
/// Number of facet values returned when the caller does not ask for a page size
const DEFAULT_FACET_TOP: usize = 10;

/// Facets returned when a caller does not request any by name
const DEFAULT_FACETS: [&str; 7] = [
    "Target Development Level",
    "Family",
    "IMPC Phenotype",
    "GWAS",
    "Expression: Consensus",
    "Ortholog",
    "Disease Category",
];

#[derive(Error, Debug)]
pub enum TcrdError {
    #[error("entity does not exist")]
    DoesNotExist,
    #[error("cycle in hierarchy: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("facet {0} is already registered")]
    DuplicateFacet(String),
    #[error("unknown facet {0}")]
    UnknownFacet(String),
    #[error("facet {facet} failed")]
    Producer {
        facet: String,
        #[source]
        source: Box<TcrdError>,
    },
    #[error("store error: {0}")]
    Store(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Shortcut for `Result<T, TcrdError>`
pub type TcrdResult<T> = Result<T, TcrdError>;
