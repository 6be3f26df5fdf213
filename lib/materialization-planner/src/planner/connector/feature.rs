use graphql_parser::query::Value;
use tracing::{debug, instrument, trace};

use crate::{
    context::{ArgumentComponentContext, ComponentContext, FieldComponentContext},
    graph::edge::MaterializationEdge,
    metamodel::namespace::Namespace,
    path::OperationPath,
    planner::{
        callable::FeatureCalculatorCallableBuilder,
        connector::{require_composite, PendingConnection},
        context::PlannerContext,
        error::PlanningError,
    },
    traverser::synthesis::ComponentSynthesizer,
    utils::value::values_equivalent,
};

pub(super) fn connect_field(
    context: PlannerContext,
    field: &FieldComponentContext,
) -> Result<PlannerContext, PlanningError> {
    let Some(calculator) = context
        .metamodel()
        .feature_calculator(&field.coordinates)
        .cloned()
    else {
        return require_composite(context, field);
    };

    let transformer_source = context
        .metamodel()
        .transformer_source(&calculator.transformer_source)
        .cloned();
    let transformer_path = context
        .transformer_path_for(&calculator.transformer_source)
        .cloned();

    debug!(
        "feature calculator '{}' selected at {}",
        calculator.name, field.path
    );

    Ok(context.with_feature_builder(
        FeatureCalculatorCallableBuilder::new(calculator, field.path.clone())
            .with_transformer(transformer_source, transformer_path),
    ))
}

pub(super) fn connect_argument(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
    retried: bool,
    upcoming: &[ComponentContext],
    pending: &mut Vec<PendingConnection>,
) -> Result<PlannerContext, PlanningError> {
    let value = &argument.argument.value;

    if let Value::Variable(_) = value {
        return connect_to_owner(context, argument, MaterializationEdge::VariableValueProvided);
    }

    let default_value = context
        .metamodel()
        .argument_definition(&argument.field_coordinates, &argument.argument.name)
        .and_then(|definition| definition.default_value.clone());

    match default_value {
        Some(default_value) if values_equivalent(value, &default_value) => {
            connect_to_source(context, argument, &default_value, retried, upcoming, pending)
        }
        _ => connect_to_owner(
            context,
            argument,
            MaterializationEdge::DirectArgumentValueProvided,
        ),
    }
}

fn connect_to_owner(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
    edge: MaterializationEdge,
) -> Result<PlannerContext, PlanningError> {
    let owner_path = argument.field_path();
    trace!("argument {} is {}", argument.path, edge);

    let builder = context.feature_builder(&owner_path).cloned();
    let mut context = context
        .with_point(argument.clone().into())
        .with_edge(&argument.path, &owner_path, edge)?;

    if let Some(builder) = builder {
        context = context.with_feature_builder(
            builder.with_argument(&argument.argument.name, argument.argument.value.clone()),
        );
    }

    Ok(context)
}

/// Resolves an argument left at its declared default by looking for a field
/// of the same name (or alias) to read it from:
///
/// 1. data-element or feature fields already connected,
/// 2. a feature field not selected yet,
/// 3. a data-element field under a domain that is already connected,
/// 4. a data-element field under a domain supplied by the raw input context.
///
/// Cases 2 to 4 queue the missing fields and a retry of the argument. A source
/// the document selects further down is queued with the caller's own
/// arguments, anything else is synthesized with defaults. Without any source
/// a non-null default still applies.
#[instrument(level = "trace", skip_all, fields(argument = %argument.path))]
fn connect_to_source(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
    default_value: &Value<'static, String>,
    retried: bool,
    upcoming: &[ComponentContext],
    pending: &mut Vec<PendingConnection>,
) -> Result<PlannerContext, PlanningError> {
    let owner_path = argument.field_path();
    let owner_canonical = argument.field_canonical_path();
    let metamodel = context.metamodel();
    let matcher = context.matcher();

    let names: Vec<String> = metamodel
        .aliases()
        .argument_names(&argument.field_coordinates, &argument.argument.name)
        .into_iter()
        .map(String::from)
        .collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let candidates = |namespace: Namespace| -> Vec<OperationPath> {
        metamodel
            .field_paths_matching(namespace, &name_refs, matcher)
            .into_iter()
            .filter(|candidate| !candidate.is_ancestor_of(&owner_canonical))
            .cloned()
            .collect()
    };
    let data_element_candidates = candidates(Namespace::DataElement);
    let feature_candidates = candidates(Namespace::Feature);

    let connected: Vec<OperationPath> = data_element_candidates
        .iter()
        .chain(feature_candidates.iter())
        .flat_map(|candidate| context.materialized_paths(candidate).iter())
        .filter(|source| {
            context.graph().is_connected(source) && !context.graph().depends_on(source, &owner_path)
        })
        .cloned()
        .collect();

    if !connected.is_empty() {
        return extract_from(context, argument, connected);
    }

    if !retried {
        let unconnected_feature = feature_candidates
            .iter()
            .find(|candidate| context.materialized_paths(candidate).is_empty());

        let under_connected_domain = || {
            data_element_candidates.iter().find(|candidate| {
                metamodel
                    .domain_root_of(candidate)
                    .is_some_and(|(domain_path, _)| {
                        !context.materialized_paths(&domain_path).is_empty()
                    })
            })
        };

        let under_raw_domain = || {
            data_element_candidates.iter().find(|candidate| {
                metamodel.domain_root_of(candidate).is_some_and(|(_, domain)| {
                    context.raw_input_supplies(metamodel.domain_names(domain))
                })
            })
        };

        if let Some(source) = unconnected_feature
            .or_else(under_connected_domain)
            .or_else(under_raw_domain)
        {
            debug!("pulling in {} as the source of {}", source, argument.path);
            let selected = selected_later(upcoming, source);
            let chain = if selected.is_empty() {
                ComponentSynthesizer::new(metamodel, context.inputs(), matcher).synthesize(
                    [source.clone()],
                    |canonical| context.first_materialized(canonical).cloned(),
                )?
            } else {
                trace!("{} is selected further down the document", source);
                selected
            };

            if !chain.is_empty() {
                pending.push(PendingConnection::Retry(argument.clone()));
                pending.extend(chain.into_iter().rev().map(PendingConnection::Connect));
                return Ok(context);
            }
        }
    }

    if !matches!(default_value, Value::Null) {
        return connect_to_owner(
            context,
            argument,
            MaterializationEdge::DefaultArgumentValueProvided,
        );
    }

    Err(PlanningError::UnresolvedFeatureArgument {
        path: argument.path.clone(),
        candidates: names,
    })
}

fn extract_from(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
    sources: Vec<OperationPath>,
) -> Result<PlannerContext, PlanningError> {
    let owner_path = argument.field_path();
    let mut builder = context.feature_builder(&owner_path).cloned();
    let mut context = context.with_point(ComponentContext::Argument(argument.clone()));

    for source in sources {
        trace!("argument {} extracts from {}", argument.path, source);
        context = context.with_edge(
            &argument.path,
            &source,
            MaterializationEdge::ExtractFromSource,
        )?;
        builder = builder.map(|b| b.with_extracted_argument(&argument.argument.name, source));
    }

    if let Some(builder) = builder {
        context = context.with_feature_builder(builder);
    }

    Ok(context)
}

/// The document's own selection of `source`: the fields leading to it and
/// their arguments, in traversal order. Empty when `source` is not selected.
fn selected_later(upcoming: &[ComponentContext], source: &OperationPath) -> Vec<ComponentContext> {
    let mut selected = vec![];
    let mut fields: Vec<OperationPath> = vec![];
    let mut found = false;

    for component in upcoming {
        match component {
            ComponentContext::Field(field) if field.canonical_path.is_ancestor_of(source) => {
                found |= field.canonical_path == *source;
                fields.push(field.path.clone());
                selected.push(component.clone());
            }
            ComponentContext::Argument(argument) if fields.contains(&argument.field_path()) => {
                selected.push(component.clone());
            }
            _ => {}
        }
    }

    if found {
        selected
    } else {
        vec![]
    }
}
