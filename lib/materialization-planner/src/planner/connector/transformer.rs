use graphql_parser::query::Value;
use tracing::{debug, trace};

use crate::{
    context::{ArgumentComponentContext, FieldComponentContext},
    graph::edge::MaterializationEdge,
    planner::{
        callable::TransformerCallableBuilder,
        connector::require_composite,
        context::PlannerContext,
        error::PlanningError,
    },
    utils::value::render_value,
};

pub(super) fn connect_field(
    context: PlannerContext,
    field: &FieldComponentContext,
) -> Result<PlannerContext, PlanningError> {
    let source = context
        .metamodel()
        .transformer_source(&field.coordinates)
        .cloned();

    match source {
        Some(source) => {
            debug!("transformer '{}' selected at {}", source.name, field.path);
            Ok(context.with_transformer_builder(TransformerCallableBuilder::new(
                source,
                field.path.clone(),
            )))
        }
        None => require_composite(context, field),
    }
}

pub(super) fn connect_argument(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
) -> Result<PlannerContext, PlanningError> {
    let owner_path = argument.field_path();
    let value = &argument.argument.value;

    let has_default = context
        .metamodel()
        .transformer_source(&argument.field_coordinates)
        .and_then(|source| source.default_value(&argument.argument.name))
        .is_some();

    let supplied = match value {
        Value::Variable(name) if context.variable_key(name).is_some() => {
            Some(MaterializationEdge::VariableValueProvided)
        }
        Value::Variable(_) | Value::Null => None,
        // a default filled in by the traverser is not a caller literal
        _ if !argument.argument.fabricated => Some(MaterializationEdge::DirectArgumentValueProvided),
        _ => None,
    };

    let edge = supplied
        .or(has_default.then_some(MaterializationEdge::DefaultArgumentValueProvided))
    .ok_or_else(|| PlanningError::UnhandledArgumentProvenance {
        path: argument.path.clone(),
        coordinates: argument.field_coordinates.clone(),
        value: render_value(value),
    })?;
    trace!("argument {} is {}", argument.path, edge);

    let builder = context.transformer_builder(&owner_path).cloned();
    let mut context = context
        .with_point(argument.clone().into())
        .with_edge(&argument.path, &owner_path, edge)?;

    if let Some(builder) = builder {
        context = context.with_transformer_builder(
            builder.with_argument(&argument.argument.name, value.clone()),
        );
    }

    Ok(context)
}
