use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::decoder::ClassRecord;
use crate::facet::{self, FacetCatalog, FacetValue, Filter, ResultEnvelope};
use crate::forest::{self, ClassificationForest};
use crate::hierarchy::HierarchyNode;
use crate::ligand::{self, CanonicalLigand, EntityMerger, LigandRow, LigandSources};
use crate::ontology::{Ontology, OntologyKind};
use crate::store::{Store, TargetRow};
use crate::{Config, TcrdError, TcrdResult};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// The query core as used by the API layer
///
/// `Tcrd` owns the connection to the [`Store`], the facet catalog of the
/// target search and the global ontologies. The ontologies are built once in
/// [`Tcrd::start`] and shared read-only between all requests.
///
/// ```mermaid
/// sequenceDiagram
///     participant API
///     participant Tcrd
///     participant Store
///     API->>Tcrd: start(store, config)
///     Tcrd->>Store: ontology_rows(kind)
///     Store-->>Tcrd: rows
///     Note over Tcrd: build Ontology, read-only from now on
///     API->>Tcrd: aggregate_facets(filter, names)
///     par every resolved facet
///         Tcrd->>Store: facet_counts(facet, filter)
///     end
///     Tcrd-->>API: ResultEnvelope
/// ```
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tcrd::store::{MemoryStore, TargetRow};
/// use tcrd::{ClassRow, Config, Filter, OntologyKind, Tcrd};
///
/// let mut store = MemoryStore::new();
/// store.add_target(TargetRow { tdl: Some("Tclin".into()), ..TargetRow::new(1, "P00533", "EGFR") });
/// store.add_ontology_row(OntologyKind::Disease, ClassRow::new("DOID:4", "disease", ""));
///
/// let tcrd = futures::executor::block_on(
///     Tcrd::start(Arc::new(store), Config::default())
/// ).unwrap();
///
/// let roots = tcrd.ontology_roots(OntologyKind::Disease).unwrap();
/// assert_eq!(roots[0].id(), "DOID:4");
///
/// let envelope = futures::executor::block_on(
///     tcrd.aggregate_facets::<&str>(&Filter::new(), &[])
/// ).unwrap();
/// assert_eq!(envelope.total, 1);
/// ```
pub struct Tcrd {
    store: Arc<dyn Store>,
    config: Config,
    catalog: FacetCatalog,
    ontologies: HashMap<OntologyKind, Arc<Ontology>>,
}

impl std::fmt::Debug for Tcrd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tcrd")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("ontologies", &self.ontologies)
            .finish()
    }
}

impl Tcrd {
    /// Loads the global ontologies and sets up the target facet catalog
    ///
    /// All configured ontologies are loaded concurrently. The service is
    /// ready once this function returns.
    ///
    /// # Errors
    ///
    /// - any error of the store
    /// - [`TcrdError::Cycle`] if an ontology table contains a cycle
    /// - [`TcrdError::UnknownFacet`] if the configured total facet does not exist
    pub async fn start(store: Arc<dyn Store>, config: Config) -> TcrdResult<Self> {
        let mut catalog = FacetCatalog::targets(Arc::clone(&store));
        catalog.set_defaults(&config.default_facets);
        catalog.set_total_source(&config.total_facet)?;

        let loaded = try_join_all(config.ontologies.iter().map(|kind| {
            let store = Arc::clone(&store);
            let decoder = config.decoder(*kind).clone();
            async move {
                let rows = store.ontology_rows(*kind).await?;
                let ontology = Ontology::from_rows(*kind, rows, &decoder)?;
                Ok::<_, TcrdError>((*kind, Arc::new(ontology)))
            }
        }))
        .await?;

        debug!("Started with {} ontologies", loaded.len());
        Ok(Self {
            store,
            config,
            catalog,
            ontologies: loaded.into_iter().collect(),
        })
    }

    /// Replaces the facet catalog of the target search
    #[must_use]
    pub fn with_catalog(mut self, catalog: FacetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &FacetCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Returns a shared handle of a global ontology
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if the ontology was not loaded at startup
    pub fn ontology(&self, kind: OntologyKind) -> TcrdResult<Arc<Ontology>> {
        self.ontologies
            .get(&kind)
            .map(Arc::clone)
            .ok_or(TcrdError::DoesNotExist)
    }

    fn ontology_ref(&self, kind: OntologyKind) -> TcrdResult<&Ontology> {
        self.ontologies
            .get(&kind)
            .map(|ontology| &**ontology)
            .ok_or(TcrdError::DoesNotExist)
    }

    /// Builds the PANTHER classification paths of a target
    ///
    /// # Errors
    ///
    /// - any error of the store
    /// - [`TcrdError::Cycle`] if the classes of the target contain a cycle
    pub async fn classification_forest(&self, target: &str) -> TcrdResult<ClassificationForest> {
        let rows = self.store.panther_classes(target).await?;
        ClassificationForest::from_rows(rows, &self.config.panther)
    }

    /// Returns all PANTHER classes of a target with their unresolved parents
    ///
    /// # Errors
    ///
    /// Any error of the store
    pub async fn flat_edge_list(&self, target: &str) -> TcrdResult<Vec<ClassRecord>> {
        let rows = self.store.panther_classes(target).await?;
        Ok(forest::flat_edge_list(rows, &self.config.panther))
    }

    /// Returns the roots of a global ontology
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if the ontology was not loaded at startup
    pub fn ontology_roots(&self, kind: OntologyKind) -> TcrdResult<Vec<HierarchyNode<'_>>> {
        Ok(self.ontology_ref(kind)?.roots().collect())
    }

    /// Returns the node of a global ontology with the given id or name
    ///
    /// # Errors
    ///
    /// [`TcrdError::DoesNotExist`] if the ontology was not loaded at startup
    pub fn lookup_ontology_node(
        &self,
        kind: OntologyKind,
        id_or_name: &str,
    ) -> TcrdResult<Option<HierarchyNode<'_>>> {
        Ok(self.ontology_ref(kind)?.lookup(id_or_name))
    }

    /// Computes the requested facets of the target search
    ///
    /// An empty `requested` list selects the default facets. Facets used in
    /// `filter` are always computed.
    ///
    /// # Errors
    ///
    /// [`TcrdError::Producer`] if any facet fails
    pub async fn aggregate_facets<S: AsRef<str>>(
        &self,
        filter: &Filter,
        requested: &[S],
    ) -> TcrdResult<ResultEnvelope> {
        let resolved = self.catalog.resolve(requested, Some(filter), false);
        facet::aggregate(&resolved, filter).await
    }

    /// Computes every facet of the catalog
    ///
    /// # Errors
    ///
    /// [`TcrdError::Producer`] if any facet fails
    pub async fn aggregate_all_facets(&self, filter: &Filter) -> TcrdResult<ResultEnvelope> {
        let resolved = self.catalog.resolve::<&str>(&[], Some(filter), true);
        facet::aggregate(&resolved, filter).await
    }

    /// Returns one page of the values of a facet of `envelope`
    ///
    /// `top` defaults to [`Config::facet_top`]
    ///
    /// # Errors
    ///
    /// [`TcrdError::UnknownFacet`] if `envelope` does not contain the facet
    pub fn paginate_facet_values(
        &self,
        envelope: &ResultEnvelope,
        name: &str,
        name_filter: Option<&str>,
        skip: usize,
        top: Option<usize>,
    ) -> TcrdResult<Vec<FacetValue>> {
        let result = envelope
            .facet(name)
            .ok_or_else(|| TcrdError::UnknownFacet(name.to_string()))?;
        Ok(facet::paginate_facet_values(
            result,
            name_filter,
            skip,
            top.unwrap_or(self.config.facet_top),
        ))
    }

    /// Fetches one page of the targets of a search result
    ///
    /// # Errors
    ///
    /// Any error of the store
    pub async fn targets(&self, envelope: &ResultEnvelope, skip: usize, top: usize) -> TcrdResult<Vec<TargetRow>> {
        envelope.entities(self.store.as_ref(), skip, top).await
    }

    /// Merges rows of both ligand tables
    pub fn merge_ligand_rows(&self, rows: &[LigandRow]) -> Option<CanonicalLigand> {
        ligand::merge_ligand_rows(rows)
    }

    /// Fetches and merges all rows of the queried ligand tables matching `key`
    ///
    /// Returns `None` if no row matches
    ///
    /// # Errors
    ///
    /// Any error of the store
    pub async fn ligand(&self, key: &str, sources: LigandSources) -> TcrdResult<Option<CanonicalLigand>> {
        let rows = self.store.ligand_rows(key, sources).await?;
        Ok(EntityMerger::new(sources).merge(&rows))
    }

    /// Returns the names of all facets of the target search
    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.names()
    }
}
