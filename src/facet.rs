//! Faceted aggregation for search and listing endpoints
//!
//! A facet is a named count breakdown over the entities matching a
//! [`Filter`], e.g. the number of targets per development level. The
//! [`FacetCatalog`] knows all facets and resolves which of them a request
//! asks for. [`aggregate`] runs the resolved facets concurrently and packs
//! the counts into a [`ResultEnvelope`].
//!
//! ```mermaid
//! graph LR
//!     Request -- "filter + facet names" --> FacetCatalog
//!     FacetCatalog -- ResolvedFacets --> aggregate
//!     aggregate -- "concurrent count queries" --> Store
//!     aggregate --> ResultEnvelope
//!     ResultEnvelope -. "entities(), on demand" .-> Store
//! ```
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::TcrdResult;

mod aggregator;
mod catalog;
mod pattern;

pub use aggregator::{aggregate, filter_result_facets, paginate_facet_values, ResultEnvelope};
pub use catalog::{FacetCatalog, ResolvedFacets};
pub use pattern::{Pattern, Patterns};

/// Restricts a facet to a set of values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFilter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Restricts a numeric facet to the half-open range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value < self.end
    }
}

/// A named [`IntRange`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub name: String,
    #[serde(flatten)]
    pub range: IntRange,
}

/// Selects the entities of a search or listing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Free-text search term
    pub term: Option<String>,
    pub facets: Vec<FacetFilter>,
    #[serde(rename = "irange")]
    pub ranges: Vec<RangeFilter>,
    pub order: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_term<S: Into<String>>(mut self, term: S) -> Self {
        self.term = Some(term.into());
        self
    }

    #[must_use]
    pub fn with_facet<S: Into<String>, V: Into<String>>(mut self, name: S, values: Vec<V>) -> Self {
        self.facets.push(FacetFilter {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_range<S: Into<String>>(mut self, name: S, start: i64, end: i64) -> Self {
        self.ranges.push(RangeFilter {
            name: name.into(),
            range: IntRange { start, end },
        });
        self
    }

    /// Returns `true` if the filter does not restrict anything
    pub fn is_empty(&self) -> bool {
        self.term.as_deref().map_or(true, str::is_empty)
            && self.facets.is_empty()
            && self.ranges.is_empty()
    }

    /// Returns the names of all facets the filter restricts
    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.facets
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.ranges.iter().map(|r| r.name.as_str()))
    }

    /// Returns the values the filter allows for facet `name`, if restricted
    pub fn values_of(&self, name: &str) -> Option<&[String]> {
        self.facets
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.values.as_slice())
    }

    /// Returns the range the filter allows for facet `name`, if restricted
    pub fn range_of(&self, name: &str) -> Option<IntRange> {
        self.ranges
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.range)
    }
}

/// The count of one value of a facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub label: String,
    pub count: u64,
}

impl FacetValue {
    pub fn new<S: Into<String>>(label: S, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Order in which facet values are paginated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetSort {
    /// Keep the order of the producer
    #[default]
    Producer,
    /// Stable sort by descending count before slicing
    CountDesc,
}

/// The computed values of one facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetResult {
    pub facet: String,
    /// Number of distinct values
    pub count: usize,
    /// Sum of the counts of all values
    pub total: u64,
    pub values: Vec<FacetValue>,
    #[serde(skip)]
    pub sort: FacetSort,
}

impl FacetResult {
    pub fn new<S: Into<String>>(facet: S, values: Vec<FacetValue>) -> Self {
        Self {
            facet: facet.into(),
            count: values.len(),
            total: values.iter().map(|v| v.count).sum(),
            values,
            sort: FacetSort::default(),
        }
    }

    #[must_use]
    pub fn with_sort(mut self, sort: FacetSort) -> Self {
        self.sort = sort;
        self
    }
}

/// Produces the value counts of one facet for a filter
///
/// Implementations usually run a grouped count query against the store
#[async_trait]
pub trait FacetProducer: Send + Sync {
    async fn produce(&self, filter: &Filter) -> TcrdResult<Vec<FacetValue>>;
}

/// A [`FacetProducer`] backed by an async closure
///
/// # Examples
///
/// ```
/// use tcrd::facet::{FacetProducer, FacetValue, Filter, FnProducer};
///
/// let producer = FnProducer::new(|_filter: Filter| async {
///     Ok::<_, tcrd::TcrdError>(vec![FacetValue::new("Tclin", 3), FacetValue::new("Tdark", 7)])
/// });
/// let values = futures::executor::block_on(producer.produce(&Filter::new())).unwrap();
/// assert_eq!(values.len(), 2);
/// ```
pub struct FnProducer<F> {
    inner: F,
}

impl<F> FnProducer<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<F, Fut> FacetProducer for FnProducer<F>
where
    F: Fn(Filter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TcrdResult<Vec<FacetValue>>> + Send + 'static,
{
    async fn produce(&self, filter: &Filter) -> TcrdResult<Vec<FacetValue>> {
        (self.inner)(filter.clone()).await
    }
}

/// A facet of the catalog: its public name, aliases and producer
#[derive(Clone)]
pub struct FacetDefinition {
    name: String,
    aliases: Vec<String>,
    producer: Arc<dyn FacetProducer>,
    sort: FacetSort,
}

impl std::fmt::Debug for FacetDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetDefinition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("sort", &self.sort)
            .finish()
    }
}

impl FacetDefinition {
    pub fn new<S: Into<String>>(name: S, producer: Arc<dyn FacetProducer>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            producer,
            sort: FacetSort::default(),
        }
    }

    #[must_use]
    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: FacetSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn sort(&self) -> FacetSort {
        self.sort
    }

    pub fn producer(&self) -> &Arc<dyn FacetProducer> {
        &self.producer
    }

    /// Returns `true` if the name or an alias equals `name`, ignoring case
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Returns `true` if the name or an alias matches any of `patterns`
    pub fn matches(&self, patterns: &Patterns) -> bool {
        patterns.is_match(&self.name) || self.aliases.iter().any(|a| patterns.is_match(a))
    }
}
