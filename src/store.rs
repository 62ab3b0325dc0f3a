//! The relational store as seen by the query core
//!
//! All data access goes through the async [`Store`] trait. The production
//! implementation lives in the host service and runs SQL against TCRD;
//! [`MemoryStore`] keeps everything in memory and is used for tests,
//! benchmarks and demos.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decoder::ClassRow;
use crate::facet::{FacetProducer, FacetValue, Filter};
use crate::ligand::{LigandRow, LigandSources};
use crate::ontology::OntologyKind;
use crate::TcrdResult;

/// Facet backed by the development level column of a target
pub const TDL_FACET: &str = "Target Development Level";
/// Facet backed by the family column of a target
pub const FAMILY_FACET: &str = "Family";
/// Range filter on the novelty score of a target
pub const NOVELTY_RANGE: &str = "Novelty";

/// One row of the target table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetRow {
    /// Internal TCRD id
    pub tcrdid: u32,
    /// UniProt accession
    pub uniprot: String,
    pub name: String,
    /// Gene symbol
    pub sym: Option<String>,
    /// Target development level, e.g. `Tclin`
    pub tdl: Option<String>,
    /// Target family, e.g. `Kinase`
    pub fam: Option<String>,
    pub novelty: Option<f64>,
}

impl TargetRow {
    pub fn new<U: Into<String>, N: Into<String>>(tcrdid: u32, uniprot: U, name: N) -> Self {
        Self {
            tcrdid,
            uniprot: uniprot.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Async access to the TCRD tables
///
/// Every method maps to one query of the host service. Errors are reported
/// as [`crate::TcrdError::Store`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns all PANTHER classes of a target, including intermediate classes
    async fn panther_classes(&self, target: &str) -> TcrdResult<Vec<ClassRow>>;

    /// Returns every row of an ontology table
    async fn ontology_rows(&self, kind: OntologyKind) -> TcrdResult<Vec<ClassRow>>;

    /// Returns the number of matching targets per value of `facet`
    ///
    /// Values are ordered by descending count
    async fn facet_counts(&self, facet: &str, filter: &Filter) -> TcrdResult<Vec<FacetValue>>;

    /// Returns one page of the targets matching `filter`
    async fn targets(&self, filter: &Filter, skip: usize, top: usize) -> TcrdResult<Vec<TargetRow>>;

    /// Returns the rows of the queried ligand tables that match `key`
    async fn ligand_rows(&self, key: &str, sources: LigandSources) -> TcrdResult<Vec<LigandRow>>;
}

/// A [`FacetProducer`] that runs the count query of one facet in the store
pub struct StoreFacet {
    store: Arc<dyn Store>,
    facet: String,
}

impl StoreFacet {
    pub fn new<S: Into<String>>(store: Arc<dyn Store>, facet: S) -> Self {
        Self {
            store,
            facet: facet.into(),
        }
    }
}

#[async_trait]
impl FacetProducer for StoreFacet {
    async fn produce(&self, filter: &Filter) -> TcrdResult<Vec<FacetValue>> {
        self.store.facet_counts(&self.facet, filter).await
    }
}

/// A [`Store`] that keeps all tables in memory
///
/// Facet counts are computed from the target rows: the development level
/// and family columns back the [`TDL_FACET`] and [`FAMILY_FACET`] facets,
/// every other facet is backed by the annotations added with
/// [`MemoryStore::add_annotation`]. Fixed counts can be set per facet with
/// [`MemoryStore::set_facet_counts`]; they ignore the filter.
///
/// # Examples
///
/// ```
/// use tcrd::store::{MemoryStore, Store, TargetRow};
/// use tcrd::Filter;
///
/// let mut store = MemoryStore::new();
/// store.add_target(TargetRow { tdl: Some("Tclin".into()), ..TargetRow::new(1, "P00533", "EGFR") });
/// store.add_target(TargetRow { tdl: Some("Tdark".into()), ..TargetRow::new(2, "Q8N3J9", "ZNF664") });
///
/// let counts = futures::executor::block_on(
///     store.facet_counts("Target Development Level", &Filter::new())
/// ).unwrap();
/// assert_eq!(counts.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    targets: Vec<TargetRow>,
    annotations: HashMap<u32, Vec<(String, String)>>,
    panther: HashMap<String, Vec<ClassRow>>,
    ontologies: HashMap<OntologyKind, Vec<ClassRow>>,
    fixed_counts: HashMap<String, Vec<FacetValue>>,
    ligands: Vec<LigandRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: TargetRow) {
        self.targets.push(target);
    }

    /// Annotates the target `tcrdid` with `value` of `facet`
    pub fn add_annotation<F: Into<String>, V: Into<String>>(&mut self, tcrdid: u32, facet: F, value: V) {
        self.annotations
            .entry(tcrdid)
            .or_default()
            .push((facet.into(), value.into()));
    }

    /// Adds a PANTHER class row of a target, identified by its UniProt accession
    pub fn add_panther_class<S: Into<String>>(&mut self, target: S, row: ClassRow) {
        self.panther.entry(target.into()).or_default().push(row);
    }

    pub fn add_ontology_row(&mut self, kind: OntologyKind, row: ClassRow) {
        self.ontologies.entry(kind).or_default().push(row);
    }

    /// Replaces the computed counts of `facet` by fixed values
    pub fn set_facet_counts<S: AsRef<str>>(&mut self, facet: S, values: Vec<FacetValue>) {
        self.fixed_counts
            .insert(facet.as_ref().to_lowercase(), values);
    }

    pub fn add_ligand(&mut self, row: LigandRow) {
        self.ligands.push(row);
    }

    /// Returns the values of `facet` for one target
    fn values_of<'a>(&'a self, target: &'a TargetRow, facet: &str) -> Vec<&'a str> {
        if facet.eq_ignore_ascii_case(TDL_FACET) {
            return target.tdl.as_deref().into_iter().collect();
        }
        if facet.eq_ignore_ascii_case(FAMILY_FACET) {
            return target.fam.as_deref().into_iter().collect();
        }
        self.annotations
            .get(&target.tcrdid)
            .map(|annotations| {
                annotations
                    .iter()
                    .filter(|(name, _)| name.eq_ignore_ascii_case(facet))
                    .map(|(_, value)| value.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn matches(&self, target: &TargetRow, filter: &Filter) -> bool {
        if let Some(term) = filter.term.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = target.name.to_lowercase().contains(&term)
                || target.uniprot.to_lowercase() == term
                || target
                    .sym
                    .as_deref()
                    .map_or(false, |sym| sym.to_lowercase() == term);
            if !hit {
                return false;
            }
        }

        for facet in &filter.facets {
            if facet.values.is_empty() {
                continue;
            }
            let values = self.values_of(target, &facet.name);
            if !values.iter().any(|v| facet.values.iter().any(|f| f.as_str() == *v)) {
                return false;
            }
        }

        for range in &filter.ranges {
            if !range.name.eq_ignore_ascii_case(NOVELTY_RANGE) {
                trace!("Ignoring range filter on {}", range.name);
                continue;
            }
            let inside = target
                .novelty
                .map_or(false, |novelty| range.range.contains(novelty.floor() as i64));
            if !inside {
                return false;
            }
        }
        true
    }

    fn matching_targets<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a TargetRow> {
        self.targets.iter().filter(move |target| self.matches(target, filter))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn panther_classes(&self, target: &str) -> TcrdResult<Vec<ClassRow>> {
        Ok(self.panther.get(target).cloned().unwrap_or_default())
    }

    async fn ontology_rows(&self, kind: OntologyKind) -> TcrdResult<Vec<ClassRow>> {
        Ok(self.ontologies.get(&kind).cloned().unwrap_or_default())
    }

    async fn facet_counts(&self, facet: &str, filter: &Filter) -> TcrdResult<Vec<FacetValue>> {
        if let Some(values) = self.fixed_counts.get(&facet.to_lowercase()) {
            return Ok(values.clone());
        }

        let mut counts: Vec<FacetValue> = Vec::new();
        for target in self.matching_targets(filter) {
            for value in self.values_of(target, facet) {
                match counts.iter_mut().find(|v| v.label == value) {
                    Some(existing) => existing.count += 1,
                    None => counts.push(FacetValue::new(value, 1)),
                }
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        Ok(counts)
    }

    async fn targets(&self, filter: &Filter, skip: usize, top: usize) -> TcrdResult<Vec<TargetRow>> {
        Ok(self
            .matching_targets(filter)
            .skip(skip)
            .take(top)
            .cloned()
            .collect())
    }

    async fn ligand_rows(&self, key: &str, sources: LigandSources) -> TcrdResult<Vec<LigandRow>> {
        let matches = |value: &Option<String>| {
            value
                .as_deref()
                .map_or(false, |value| value.eq_ignore_ascii_case(key))
        };
        Ok(self
            .ligands
            .iter()
            .filter(|row| sources.contains(row.source))
            .filter(|row| {
                matches(&row.lychi_h4)
                    || matches(&row.drug)
                    || matches(&row.cmpd_id_in_src)
                    || matches(&row.cmpd_name_in_src)
            })
            .cloned()
            .collect())
    }
}
