use std::time::Instant;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, debug_span, Instrument};

use crate::facet::{FacetResult, FacetSort, FacetValue, Filter, Pattern, Patterns, ResolvedFacets};
use crate::store::{Store, TargetRow};
use crate::{TcrdError, TcrdResult};

/// The result of a faceted search
///
/// The envelope holds the facet counts only. The matching entities are
/// fetched on demand with [`ResultEnvelope::entities`], using the same filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEnvelope {
    pub filter: Filter,
    /// Number of entities matching the filter
    pub total: u64,
    pub facets: Vec<FacetResult>,
}

impl ResultEnvelope {
    /// Returns the facet with the name `name`, ignoring case
    pub fn facet(&self, name: &str) -> Option<&FacetResult> {
        self.facets
            .iter()
            .find(|f| f.facet.eq_ignore_ascii_case(name))
    }

    /// Keeps only the facets selected by `include` and not by `exclude`
    ///
    /// See [`filter_result_facets`]
    pub fn retain_facets<S: AsRef<str>>(&mut self, include: &[S], exclude: &[S]) {
        let facets = std::mem::take(&mut self.facets);
        self.facets = filter_result_facets(facets, include, exclude);
    }

    /// Fetches one page of the entities that match the filter
    ///
    /// # Errors
    ///
    /// Any error of the store
    pub async fn entities(&self, store: &dyn Store, skip: usize, top: usize) -> TcrdResult<Vec<TargetRow>> {
        store.targets(&self.filter, skip, top).await
    }
}

/// Computes all `resolved` facets concurrently
///
/// The facets are returned in the order of `resolved`. The total of the
/// envelope is the sum of the value counts of the total source facet
/// (see [`ResolvedFacets::total_index`]), or `0` if no facet was resolved.
///
/// # Errors
///
/// If any producer fails, the whole aggregation fails with
/// [`TcrdError::Producer`]. Producers that are still running are dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tcrd::facet::{aggregate, FacetCatalog, FacetDefinition, FacetValue, Filter, FnProducer};
///
/// let tdl = Arc::new(FnProducer::new(|_f: Filter| async {
///     Ok::<_, tcrd::TcrdError>(vec![FacetValue::new("Tclin", 3), FacetValue::new("Tdark", 7)])
/// }));
/// let mut catalog = FacetCatalog::new();
/// catalog.register(FacetDefinition::new("Target Development Level", tdl)).unwrap();
///
/// let resolved = catalog.resolve::<&str>(&[], None, false);
/// let envelope = futures::executor::block_on(aggregate(&resolved, &Filter::new())).unwrap();
/// assert_eq!(envelope.total, 10);
/// ```
pub async fn aggregate(resolved: &ResolvedFacets, filter: &Filter) -> TcrdResult<ResultEnvelope> {
    let span = debug_span!("aggregate", facets = resolved.len());
    async move {
        let start = Instant::now();
        let facets = try_join_all(resolved.iter().map(|definition| async move {
            match definition.producer().produce(filter).await {
                Ok(values) => Ok(FacetResult::new(definition.name(), values).with_sort(definition.sort())),
                Err(err) => Err(TcrdError::Producer {
                    facet: definition.name().to_string(),
                    source: Box::new(err),
                }),
            }
        }))
        .await?;

        let total = resolved
            .total_index()
            .and_then(|idx| facets.get(idx))
            .map_or(0, |facet| facet.total);
        debug!(
            "Computed {} facets in {} ms",
            facets.len(),
            start.elapsed().as_millis()
        );

        Ok(ResultEnvelope {
            filter: filter.clone(),
            total,
            facets,
        })
    }
    .instrument(span)
    .await
}

/// Keeps the facets whose name matches `include` and does not match `exclude`
///
/// An empty `include` keeps all facets. Names are matched as [`Pattern`]s.
pub fn filter_result_facets<S: AsRef<str>>(
    facets: Vec<FacetResult>,
    include: &[S],
    exclude: &[S],
) -> Vec<FacetResult> {
    let include = Patterns::new(include);
    let exclude = Patterns::new(exclude);
    facets
        .into_iter()
        .filter(|facet| include.is_empty() || include.is_match(&facet.facet))
        .filter(|facet| !exclude.is_match(&facet.facet))
        .collect()
}

/// Returns one page of the values of `facet`
///
/// If `name_filter` is given, only values whose label matches it are
/// considered. Facets with [`FacetSort::CountDesc`] are sorted by descending
/// count first; values with equal counts keep their order.
///
/// # Examples
///
/// ```
/// use tcrd::facet::{paginate_facet_values, FacetResult, FacetValue};
///
/// let facet = FacetResult::new(
///     "Family",
///     (0..6).map(|i| FacetValue::new(format!("v{i}"), 1)).collect(),
/// );
/// let page = paginate_facet_values(&facet, None, 2, 3);
/// let labels: Vec<&str> = page.iter().map(|v| v.label.as_str()).collect();
/// assert_eq!(labels, vec!["v2", "v3", "v4"]);
/// ```
pub fn paginate_facet_values(
    facet: &FacetResult,
    name_filter: Option<&str>,
    skip: usize,
    top: usize,
) -> Vec<FacetValue> {
    let pattern = name_filter.filter(|name| !name.is_empty()).map(Pattern::new);
    let mut values: Vec<&FacetValue> = facet
        .values
        .iter()
        .filter(|value| pattern.as_ref().map_or(true, |p| p.is_match(&value.label)))
        .collect();

    if facet.sort == FacetSort::CountDesc {
        values.sort_by(|a, b| b.count.cmp(&a.count));
    }

    values.into_iter().skip(skip).take(top).cloned().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::facet::{FacetCatalog, FacetDefinition, FnProducer};
    use std::sync::Arc;
    use std::time::Duration;

    fn values(counts: &[(&str, u64)]) -> Vec<FacetValue> {
        counts
            .iter()
            .map(|(label, count)| FacetValue::new(*label, *count))
            .collect()
    }

    fn definition(name: &str, counts: &'static [(&'static str, u64)]) -> FacetDefinition {
        let producer = FnProducer::new(move |_f: Filter| async move {
            Ok::<Vec<FacetValue>, TcrdError>(values(counts))
        });
        FacetDefinition::new(name, Arc::new(producer))
    }

    fn sleeping(name: &str, millis: u64) -> FacetDefinition {
        let producer = FnProducer::new(move |_f: Filter| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<Vec<FacetValue>, TcrdError>(vec![FacetValue::new("x", millis)])
        });
        FacetDefinition::new(name, Arc::new(producer))
    }

    fn failing(name: &str) -> FacetDefinition {
        let producer = FnProducer::new(|_f: Filter| async {
            Err::<Vec<FacetValue>, TcrdError>(TcrdError::Store("connection lost".to_string()))
        });
        FacetDefinition::new(name, Arc::new(producer))
    }

    #[tokio::test]
    async fn total_from_first_facet() {
        let mut catalog = FacetCatalog::new();
        catalog.register(definition("Family", &[("A", 3), ("B", 7)])).unwrap();
        catalog.register(definition("GWAS", &[("C", 100)])).unwrap();

        let resolved = catalog.resolve(&["Family", "GWAS"], None, false);
        let envelope = aggregate(&resolved, &Filter::new()).await.unwrap();
        assert_eq!(envelope.total, 10);
        assert_eq!(envelope.facets.len(), 2);
        assert_eq!(envelope.facets[0].facet, "Family");
        assert_eq!(envelope.facets[0].count, 2);
        assert_eq!(envelope.facet("gwas").unwrap().total, 100);
    }

    #[tokio::test]
    async fn total_from_designated_facet() {
        let mut catalog = FacetCatalog::new();
        catalog.register(definition("Family", &[("A", 3), ("B", 7)])).unwrap();
        catalog
            .register(definition("Target Development Level", &[("Tclin", 5), ("Tdark", 20)]))
            .unwrap();
        catalog.set_total_source("Target Development Level").unwrap();

        let resolved = catalog.resolve(&["Family", "Target Development Level"], None, false);
        let envelope = aggregate(&resolved, &Filter::new()).await.unwrap();
        assert_eq!(envelope.facets[0].facet, "Family");
        assert_eq!(envelope.total, 25);
    }

    #[tokio::test]
    async fn no_facets() {
        let catalog = FacetCatalog::new();
        let resolved = catalog.resolve::<&str>(&[], None, false);
        let envelope = aggregate(&resolved, &Filter::new().with_term("kinase")).await.unwrap();
        assert_eq!(envelope.total, 0);
        assert!(envelope.facets.is_empty());
        assert_eq!(envelope.filter.term.as_deref(), Some("kinase"));
    }

    #[tokio::test]
    async fn failing_producer_fails_aggregation() {
        let mut catalog = FacetCatalog::new();
        catalog.register(definition("Family", &[("A", 3)])).unwrap();
        catalog.register(failing("GWAS")).unwrap();
        catalog.register(definition("Ortholog", &[("Mouse", 1)])).unwrap();

        let resolved = catalog.resolve(&["Family", "GWAS", "Ortholog"], None, false);
        match aggregate(&resolved, &Filter::new()).await {
            Err(TcrdError::Producer { facet, source }) => {
                assert_eq!(facet, "GWAS");
                assert!(matches!(*source, TcrdError::Store(_)));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn producers_run_concurrently() {
        let mut catalog = FacetCatalog::new();
        catalog.register(sleeping("Family", 100)).unwrap();
        catalog.register(sleeping("GWAS", 200)).unwrap();
        catalog.register(sleeping("Ortholog", 300)).unwrap();

        let resolved = catalog.resolve::<&str>(&[], None, true);
        let start = tokio::time::Instant::now();
        let envelope = aggregate(&resolved, &Filter::new()).await.unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(600));
        assert_eq!(envelope.total, 100);
        let names: Vec<&str> = envelope.facets.iter().map(|f| f.facet.as_str()).collect();
        assert_eq!(names, vec!["Family", "GWAS", "Ortholog"]);
    }

    #[test]
    fn include_and_exclude() {
        let facets = vec![
            FacetResult::new("Target Development Level", vec![]),
            FacetResult::new("Family", vec![]),
            FacetResult::new("Expression: Consensus", vec![]),
            FacetResult::new("Expression: HPA", vec![]),
        ];

        let kept = filter_result_facets(facets.clone(), &["Family"], &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].facet, "Family");

        let kept = filter_result_facets(facets.clone(), &[], &["^expression"]);
        assert_eq!(kept.len(), 2);

        let kept = filter_result_facets(facets.clone(), &["^expression"], &["hpa"]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].facet, "Expression: Consensus");

        let kept = filter_result_facets::<&str>(facets, &[], &[]);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn retain_envelope_facets() {
        let mut envelope = ResultEnvelope {
            filter: Filter::new(),
            total: 10,
            facets: vec![
                FacetResult::new("Family", vec![]),
                FacetResult::new("GWAS", vec![]),
            ],
        };
        envelope.retain_facets(&["gwas"], &[]);
        assert_eq!(envelope.facets.len(), 1);
        assert_eq!(envelope.total, 10);
    }

    #[test]
    fn pagination() {
        let facet = FacetResult::new(
            "Family",
            (0..6).map(|i| FacetValue::new(format!("v{i}"), i)).collect(),
        );
        let labels = |page: Vec<FacetValue>| page.into_iter().map(|v| v.label).collect::<Vec<_>>();

        assert_eq!(labels(paginate_facet_values(&facet, None, 2, 3)), vec!["v2", "v3", "v4"]);
        assert_eq!(labels(paginate_facet_values(&facet, None, 4, 10)), vec!["v4", "v5"]);
        assert!(paginate_facet_values(&facet, None, 6, 3).is_empty());
        assert!(paginate_facet_values(&facet, None, 100, 3).is_empty());
        assert_eq!(labels(paginate_facet_values(&facet, Some("V3"), 0, 10)), vec!["v3"]);
        assert_eq!(labels(paginate_facet_values(&facet, Some("v[01]"), 0, 10)), vec!["v0", "v1"]);
        assert_eq!(paginate_facet_values(&facet, Some(""), 0, 10).len(), 6);
    }

    #[test]
    fn pagination_by_descending_count() {
        let facet = FacetResult::new(
            "Ligand Activity",
            values(&[("IC50", 5), ("Ki", 12), ("EC50", 5), ("Kd", 30)]),
        )
        .with_sort(FacetSort::CountDesc);
        let page = paginate_facet_values(&facet, None, 0, 3);
        let labels: Vec<&str> = page.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["Kd", "Ki", "IC50"]);

        let page = paginate_facet_values(&facet, None, 3, 3);
        assert_eq!(page[0].label, "EC50");
    }
}
