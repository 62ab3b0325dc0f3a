use std::sync::Arc;

use tracing::debug;

use crate::facet::{FacetDefinition, FacetSort, Filter, Patterns};
use crate::store::{Store, StoreFacet};
use crate::{TcrdError, TcrdResult, DEFAULT_FACETS};

/// Facets of the target search, in declaration order
///
/// `(name, aliases, sort)`
const TARGET_FACETS: [(&str, &[&str], FacetSort); 19] = [
    ("Target Development Level", &["tdl"], FacetSort::Producer),
    ("Family", &["fam"], FacetSort::Producer),
    ("IDG Target Lists", &[], FacetSort::Producer),
    ("UniProt Keyword", &[], FacetSort::Producer),
    ("PANTHER Class", &[], FacetSort::Producer),
    ("DTO Class", &[], FacetSort::Producer),
    ("GO Process", &[], FacetSort::Producer),
    ("GO Function", &[], FacetSort::Producer),
    ("GO Component", &[], FacetSort::Producer),
    ("Reactome Pathway", &[], FacetSort::Producer),
    ("IMPC Phenotype", &[], FacetSort::Producer),
    ("JAX/MGI Phenotype", &[], FacetSort::Producer),
    ("GWAS", &[], FacetSort::Producer),
    ("Expression: Consensus", &["Consensus"], FacetSort::Producer),
    ("Expression: HPA", &[], FacetSort::Producer),
    ("Ortholog", &[], FacetSort::Producer),
    ("Disease Category", &[], FacetSort::Producer),
    ("Ligand Activity", &["Activity Type"], FacetSort::CountDesc),
    ("Novelty", &[], FacetSort::Producer),
];

/// Registry of all facets an endpoint can compute
///
/// The catalog keeps the declaration order of its facets. Every selection
/// of facets, see [`FacetCatalog::resolve`], follows this order.
///
/// One facet can be designated as the *total source*: a facet that
/// partitions the complete result set, so that the sum of its value counts
/// is the total number of matching entities.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tcrd::facet::{FacetCatalog, FacetDefinition, FacetValue, Filter, FnProducer};
///
/// let producer = Arc::new(FnProducer::new(|_f: Filter| async {
///     Ok::<Vec<FacetValue>, tcrd::TcrdError>(vec![])
/// }));
///
/// let mut catalog = FacetCatalog::new();
/// catalog.register(FacetDefinition::new("Family", producer.clone())).unwrap();
/// catalog.register(FacetDefinition::new("GWAS", producer)).unwrap();
///
/// let resolved = catalog.resolve(&["family"], None, false);
/// assert_eq!(resolved.names().collect::<Vec<_>>(), vec!["Family"]);
/// ```
#[derive(Debug, Clone)]
pub struct FacetCatalog {
    definitions: Vec<FacetDefinition>,
    defaults: Vec<String>,
    total_source: Option<String>,
}

impl Default for FacetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetCatalog {
    /// Constructs an empty catalog with the standard default facets
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            defaults: DEFAULT_FACETS.iter().map(|s| s.to_string()).collect(),
            total_source: None,
        }
    }

    /// Constructs the catalog of the target search, backed by `store`
    ///
    /// `Target Development Level` is the total source
    pub fn targets(store: Arc<dyn Store>) -> Self {
        let mut catalog = Self::new();
        for (name, aliases, sort) in TARGET_FACETS {
            let mut definition =
                FacetDefinition::new(name, Arc::new(StoreFacet::new(Arc::clone(&store), name)))
                    .with_sort(sort);
            for alias in aliases {
                definition = definition.with_alias(*alias);
            }
            catalog.definitions.push(definition);
        }
        catalog.total_source = Some(TARGET_FACETS[0].0.to_string());
        catalog
    }

    /// Adds a facet at the end of the catalog
    ///
    /// # Errors
    ///
    /// [`TcrdError::DuplicateFacet`] if the name or an alias is already in use
    pub fn register(&mut self, definition: FacetDefinition) -> TcrdResult<()> {
        let names = std::iter::once(definition.name()).chain(definition.aliases().iter().map(String::as_str));
        for name in names {
            if self.get(name).is_some() {
                return Err(TcrdError::DuplicateFacet(name.to_string()));
            }
        }
        self.definitions.push(definition);
        Ok(())
    }

    /// Replaces the facets used when a request does not name any
    pub fn set_defaults<S: AsRef<str>>(&mut self, names: &[S]) {
        self.defaults = names.iter().map(|s| s.as_ref().to_string()).collect();
    }

    /// Designates the facet whose value counts sum up to the total
    ///
    /// # Errors
    ///
    /// [`TcrdError::UnknownFacet`] if no facet `name` is registered
    pub fn set_total_source(&mut self, name: &str) -> TcrdResult<()> {
        let definition = self
            .get(name)
            .ok_or_else(|| TcrdError::UnknownFacet(name.to_string()))?;
        self.total_source = Some(definition.name().to_string());
        Ok(())
    }

    pub fn total_source(&self) -> Option<&str> {
        self.total_source.as_deref()
    }

    /// Returns the facet with the name or alias `name`, ignoring case
    pub fn get(&self, name: &str) -> Option<&FacetDefinition> {
        self.definitions.iter().find(|d| d.is_named(name))
    }

    /// Returns the names of all facets in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(FacetDefinition::name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Selects the facets to compute for a request
    ///
    /// - `include_all` selects the whole catalog
    /// - otherwise, every facet whose name or alias matches one of
    ///   `requested` (see [`crate::facet::Pattern`]) is selected
    /// - if nothing is requested, the default facets are selected
    ///
    /// Facets restricted by `filter` are always selected. The result follows
    /// the declaration order of the catalog.
    pub fn resolve<S: AsRef<str>>(
        &self,
        requested: &[S],
        filter: Option<&Filter>,
        include_all: bool,
    ) -> ResolvedFacets {
        let mut selected: Vec<bool> = if include_all {
            vec![true; self.definitions.len()]
        } else if !requested.is_empty() {
            let patterns = Patterns::new(requested);
            self.definitions.iter().map(|d| d.matches(&patterns)).collect()
        } else {
            self.definitions
                .iter()
                .map(|d| self.defaults.iter().any(|name| d.is_named(name)))
                .collect()
        };

        if let Some(filter) = filter {
            for name in filter.facet_names() {
                match self.definitions.iter().position(|d| d.is_named(name)) {
                    Some(idx) => selected[idx] = true,
                    None => debug!("Filter uses unknown facet {}", name),
                }
            }
        }

        let facets: Vec<FacetDefinition> = self
            .definitions
            .iter()
            .zip(selected)
            .filter_map(|(definition, selected)| selected.then(|| definition.clone()))
            .collect();
        let total_source = self
            .total_source
            .as_deref()
            .and_then(|name| facets.iter().position(|d| d.name() == name));

        ResolvedFacets {
            facets,
            total_source,
        }
    }
}

/// The facets selected for one request, in catalog order
#[derive(Debug, Clone, Default)]
pub struct ResolvedFacets {
    facets: Vec<FacetDefinition>,
    total_source: Option<usize>,
}

impl ResolvedFacets {
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FacetDefinition> {
        self.facets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facets.iter().map(FacetDefinition::name)
    }

    /// Position of the facet that defines the total count
    ///
    /// This is the designated total source of the catalog if it was
    /// selected, otherwise the first facet.
    pub fn total_index(&self) -> Option<usize> {
        match self.total_source {
            Some(idx) => Some(idx),
            None if self.facets.is_empty() => None,
            None => Some(0),
        }
    }
}

impl<'a> IntoIterator for &'a ResolvedFacets {
    type Item = &'a FacetDefinition;
    type IntoIter = std::slice::Iter<'a, FacetDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.facets.iter()
    }
}
