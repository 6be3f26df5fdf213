pub mod callable;
pub mod connector;
pub mod context;
pub mod error;
pub mod plan;

use std::{collections::BTreeSet, sync::Arc};

use moka::sync::Cache;
use tracing::{debug, instrument};

use crate::{
    config::PlannerConfig,
    metamodel::MaterializationMetamodel,
    planner::{
        connector::connect_components, context::PlannerContext, error::PlanningError,
        plan::MaterializationPlan,
    },
    request::{RequestInputs, TabularSpec},
    tabular::{
        compose,
        composition::{match_domain_arguments, DomainArgumentMatches},
        synthesize_components,
    },
    traverser::{traverse_document, OperationDocument},
    utils::matching::NameMatcher,
};

type VariableMatchKey = (u64, BTreeSet<String>);

/// Entry point: plans documents and tabular requests against one metamodel.
///
/// Safe to share between threads, the variable-match cache is the only state
/// planning runs have in common.
pub struct Planner {
    metamodel: Arc<MaterializationMetamodel>,
    config: PlannerConfig,
    matcher: NameMatcher,
    variable_match_cache: Cache<VariableMatchKey, Arc<DomainArgumentMatches>>,
}

impl Planner {
    pub fn new(metamodel: Arc<MaterializationMetamodel>, config: PlannerConfig) -> Self {
        let cache_config = &config.variable_match_cache;
        debug!(
            "variable match cache holds up to {} entries, idle for at most {}",
            cache_config.max_capacity,
            humantime::format_duration(cache_config.time_to_idle)
        );

        let variable_match_cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_idle(cache_config.time_to_idle)
            .build();

        Self {
            matcher: config.name_matcher(),
            metamodel,
            config,
            variable_match_cache,
        }
    }

    pub fn metamodel(&self) -> &Arc<MaterializationMetamodel> {
        &self.metamodel
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    #[instrument(level = "debug", skip(self, document, inputs))]
    pub fn plan_document(
        &self,
        document: &OperationDocument,
        operation_name: Option<&str>,
        inputs: RequestInputs,
    ) -> Result<MaterializationPlan, PlanningError> {
        let components = traverse_document(&self.metamodel, document, operation_name)?;
        let context = PlannerContext::new(self.metamodel.clone(), inputs, self.matcher);
        let context = connect_components(context, components)?;
        ensure_fully_connected(&context)?;

        Ok(MaterializationPlan::from_context(&context))
    }

    #[instrument(level = "debug", skip_all)]
    pub fn plan_tabular(&self, spec: &TabularSpec) -> Result<MaterializationPlan, PlanningError> {
        let domain_arguments = self.domain_argument_matches(&spec.variable_keys);
        let composition = compose(&self.metamodel, spec, self.matcher, &domain_arguments)?;

        let inputs = spec.request_inputs();
        let components =
            synthesize_components(&self.metamodel, &inputs, &composition, self.matcher)?;
        let context = PlannerContext::new(self.metamodel.clone(), inputs, self.matcher);
        let context = connect_components(context, components)?;
        ensure_fully_connected(&context)?;

        let output_columns = composition
            .output_columns
            .iter()
            .map(|(column, canonical_paths)| {
                let paths = canonical_paths
                    .iter()
                    .filter_map(|canonical| context.first_materialized(canonical).cloned())
                    .collect();
                (column.clone(), paths)
            })
            .collect();

        Ok(MaterializationPlan::from_context(&context)
            .with_output_columns(output_columns, composition.passthrough_columns))
    }

    #[cfg(test)]
    pub(crate) fn cached_variable_matches(&self) -> u64 {
        self.variable_match_cache.run_pending_tasks();
        self.variable_match_cache.entry_count()
    }

    fn domain_argument_matches(&self, variable_keys: &BTreeSet<String>) -> Arc<DomainArgumentMatches> {
        let key = (self.metamodel.version(), variable_keys.clone());

        self.variable_match_cache.get_with(key, || {
            debug!("matching {} variable key(s) to domain arguments", variable_keys.len());
            Arc::new(match_domain_arguments(
                &self.metamodel,
                variable_keys,
                self.matcher,
            ))
        })
    }
}

/// Every vertex but the root must depend on something once planning is done.
fn ensure_fully_connected(context: &PlannerContext) -> Result<(), PlanningError> {
    let graph = context.graph();

    match graph
        .points()
        .into_iter()
        .find(|(path, _)| !path.is_root() && graph.successors(path).is_empty())
    {
        Some((path, _)) => Err(PlanningError::UnconnectedVertex(path.clone())),
        None => Ok(()),
    }
}
