use complexity_config::ComplexityConfig;
use indexmap::IndexMap;

use crate::{
    builder::{FieldEdge, QueryId, ScopeBuilder},
    merge::{Algorithm, FieldComplexity, Merger},
    scope::ScopeTree,
    ComplexityControl, ComplexityError, ComplexitySchema, CostCalculationMode, CostMismatch, SelectionNode,
};

type FieldHook<'h, S, N> = Box<dyn FnMut(FieldComplexity<'_, S, N>) + 'h>;
type MismatchHook<'h> = Box<dyn FnMut(CostMismatch) -> Result<usize, CostMismatch> + 'h>;

/// The outcome of an analysis pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexityReport {
    /// Summed across every query of the pass.
    pub complexity: usize,
    /// Cost of each query, computed with the primary algorithm of `mode`: the future one in
    /// compare mode.
    pub queries: IndexMap<QueryId, usize>,
    /// `None` when no calculation mode was configured.
    pub mode: Option<CostCalculationMode>,
}

impl ComplexityReport {
    pub fn query(&self, query: QueryId) -> Option<usize> {
        self.queries.get(&query).copied()
    }
}

/// A single analysis pass: receives the traversal events of one or more queries, then computes
/// their cost once with [`ComplexityAnalysis::finish`].
///
/// Hooks run synchronously during `finish`. A panicking hook unwinds through the analysis.
pub struct ComplexityAnalysis<'s, 'h, S: ComplexitySchema<N>, N> {
    schema: &'s S,
    builder: ScopeBuilder<'s, S, N>,
    calculation_mode: Option<String>,
    control: ComplexityControl,
    on_field: Option<FieldHook<'h, S, N>>,
    on_mismatch: MismatchHook<'h>,
}

impl<'s, 'h, S, N> ComplexityAnalysis<'s, 'h, S, N>
where
    S: ComplexitySchema<N>,
    N: SelectionNode,
{
    pub fn new(schema: &'s S, config: &ComplexityConfig) -> Self {
        ComplexityAnalysis {
            schema,
            builder: ScopeBuilder::new(schema, config.count_introspection_fields),
            calculation_mode: config.calculation_mode.clone(),
            control: ComplexityControl::from(&config.control),
            on_field: None,
            on_mismatch: Box::new(prefer_legacy),
        }
    }

    /// Called with the retained cost of every priced field.
    pub fn on_field_complexity(mut self, hook: impl FnMut(FieldComplexity<'_, S, N>) + 'h) -> Self {
        self.on_field = Some(Box::new(hook));
        self
    }

    /// Decides the final cost when the future and legacy totals differ in compare mode. Returning
    /// an error aborts the pass with [`ComplexityError::CostMismatch`].
    ///
    /// By default the legacy total is kept and a warning is logged.
    pub fn on_mismatch(mut self, hook: impl FnMut(CostMismatch) -> Result<usize, CostMismatch> + 'h) -> Self {
        self.on_mismatch = Box::new(hook);
        self
    }

    pub fn schema(&self) -> &'s S {
        self.schema
    }

    pub fn control(&self) -> &ComplexityControl {
        &self.control
    }

    pub fn builder(&self) -> &ScopeBuilder<'s, S, N> {
        &self.builder
    }

    pub fn enter_field(&mut self, query: QueryId, edge: FieldEdge<N, S::Type, S::Field>) {
        self.builder.enter_field(query, edge);
    }

    pub fn leave_field(&mut self, query: QueryId, edge: FieldEdge<N, S::Type, S::Field>) -> Result<(), ComplexityError> {
        self.builder.leave_field(query, edge)
    }

    /// Computes the cost of every tracked query and checks the total against the configured
    /// budget.
    ///
    /// Fails with [`ComplexityError::UnfinishedTraversal`] if a field was entered and never left.
    pub fn finish(self) -> Result<ComplexityReport, ComplexityError> {
        let ComplexityAnalysis {
            schema,
            builder,
            calculation_mode,
            control,
            mut on_field,
            mut on_mismatch,
        } = self;

        let mode = CostCalculationMode::from_setting(calculation_mode.as_deref())?;

        if let Some((query, response_key)) = builder.open_field() {
            return Err(ComplexityError::UnfinishedTraversal {
                query,
                response_key: response_key.to_owned(),
            });
        }

        let trees = builder.into_trees();
        let pricing = Pricing {
            schema,
            trees: &trees,
            default_list_size: control.list_size(),
        };

        let mut ignore = ignore_field::<S, N>;
        let on_field: &mut dyn FnMut(FieldComplexity<'_, S, N>) = match on_field.as_mut() {
            Some(hook) => &mut **hook,
            None => &mut ignore,
        };

        let (queries, complexity) = match mode {
            Some(CostCalculationMode::Future) => {
                let queries = pricing.query_complexities(Algorithm::Future, &mut *on_field);
                let complexity = total(&queries);
                (queries, complexity)
            }
            Some(CostCalculationMode::Legacy) => {
                let queries = pricing.query_complexities(Algorithm::Legacy, &mut *on_field);
                let complexity = total(&queries);
                (queries, complexity)
            }
            Some(CostCalculationMode::Compare) => {
                let future = pricing.query_complexities(Algorithm::Future, &mut *on_field);
                let legacy = pricing.query_complexities(Algorithm::Legacy, &mut *on_field);

                let (future_total, legacy_total) = (total(&future), total(&legacy));
                let complexity = if future_total == legacy_total {
                    future_total
                } else {
                    on_mismatch(CostMismatch {
                        future: future_total,
                        legacy: legacy_total,
                    })?
                };

                (future, complexity)
            }
            None => {
                tracing::warn!(
                    "No complexity cost calculation mode is configured, falling back to the legacy calculation. \
                     Set `calculation_mode` to `future`, `legacy` or `compare`, the legacy default is deprecated"
                );
                let queries = pricing.query_complexities(Algorithm::Legacy, &mut *on_field);
                let complexity = total(&queries);
                (queries, complexity)
            }
        };

        tracing::debug!(
            complexity,
            queries = queries.len(),
            mode = ?mode,
            "Computed query complexity"
        );

        control.check(complexity)?;

        Ok(ComplexityReport {
            complexity,
            queries,
            mode,
        })
    }
}

struct Pricing<'a, S: ComplexitySchema<N>, N> {
    schema: &'a S,
    trees: &'a IndexMap<QueryId, ScopeTree<S, N>>,
    default_list_size: Option<usize>,
}

impl<S: ComplexitySchema<N>, N> Pricing<'_, S, N> {
    fn query_complexities(
        &self,
        algorithm: Algorithm,
        observer: &mut dyn FnMut(FieldComplexity<'_, S, N>),
    ) -> IndexMap<QueryId, usize> {
        let mut complexities = IndexMap::with_capacity(self.trees.len());

        for (query, tree) in self.trees {
            let complexity = Merger::new(self.schema, tree, algorithm, &mut *observer)
                .with_default_list_size(self.default_list_size)
                .query_complexity();
            complexities.insert(*query, complexity);
        }

        complexities
    }
}

fn total(complexities: &IndexMap<QueryId, usize>) -> usize {
    complexities
        .values()
        .fold(0, |total, complexity| total.saturating_add(*complexity))
}

fn ignore_field<S: ComplexitySchema<N>, N>(_: FieldComplexity<'_, S, N>) {}

fn prefer_legacy(CostMismatch { future, legacy }: CostMismatch) -> Result<usize, CostMismatch> {
    tracing::warn!(
        future,
        legacy,
        "Future and legacy complexity cost calculations disagree, keeping the legacy cost"
    );
    Ok(legacy)
}
