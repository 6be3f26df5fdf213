use graphql_parser::query::Value;
use tracing::{debug, trace};

use crate::{
    context::{ArgumentComponentContext, ComponentContext, FieldComponentContext, FieldNode},
    graph::edge::MaterializationEdge,
    metamodel::{coordinates::FieldCoordinates, namespace::Namespace, schema::ConstValue},
    planner::{
        callable::DataElementCallableBuilder,
        connector::PendingConnection,
        context::PlannerContext,
        error::PlanningError,
    },
    utils::value::{render_value, values_equivalent},
};

pub(super) fn connect_field(
    context: PlannerContext,
    field: &FieldComponentContext,
    pending: &mut Vec<PendingConnection>,
) -> Result<PlannerContext, PlanningError> {
    let domain = context
        .metamodel()
        .domain_source(&field.coordinates)
        .cloned();

    if let Some(domain) = domain {
        debug!("domain source '{}' selected at {}", domain.name, field.path);
        return Ok(context.with_data_element_builder(DataElementCallableBuilder::new(
            domain,
            field.path.clone(),
        )));
    }

    let Some(builder) = context
        .nearest_data_element_builder(&field.path)
        .and_then(|domain_path| context.data_element_builder(&domain_path))
        .cloned()
    else {
        trace!("{} is not selected under a domain source", field.path);
        if context.metamodel().is_composite_output(&field.coordinates) {
            return Ok(context);
        }
        return Err(PlanningError::MissingDomainSource {
            path: field.path.clone(),
        });
    };

    let domain = builder.domain.clone();
    let domain_path = builder.domain_path.clone();
    let context = context.with_data_element_builder(builder.with_selection(field.path.clone()));

    let Some(companion_name) = context.metamodel().last_updated_field(&domain.coordinates) else {
        return Ok(context);
    };

    let companion_canonical = domain_path.to_canonical().with_field(companion_name);
    let already_selected = context
        .materialized_paths(&companion_canonical)
        .iter()
        .any(|path| domain_path.is_ancestor_of(path));
    let coordinates = FieldCoordinates::new(&domain.output_type, companion_name);

    if !already_selected && context.metamodel().field_definition(&coordinates).is_some() {
        trace!("queueing last-updated companion of domain '{}'", domain.name);
        pending.push(PendingConnection::Connect(ComponentContext::Field(
            FieldComponentContext {
                field: FieldNode::new(companion_name),
                coordinates,
                path: domain_path.with_field(companion_name),
                canonical_path: companion_canonical,
            },
        )));
    }

    Ok(context)
}

pub(super) fn connect_argument(
    context: PlannerContext,
    argument: &ArgumentComponentContext,
) -> Result<PlannerContext, PlanningError> {
    let owner_path = argument.field_path();
    let default_value = context
        .metamodel()
        .argument_definition(&argument.field_coordinates, &argument.argument.name)
        .and_then(|definition| definition.default_value.as_ref());

    let edge = argument_provenance(&context, argument, default_value).ok_or_else(|| {
        PlanningError::UnhandledArgumentProvenance {
            path: argument.path.clone(),
            coordinates: argument.field_coordinates.clone(),
            value: render_value(&argument.argument.value),
        }
    })?;
    trace!("argument {} is {}", argument.path, edge);

    let element_type = context.element_type_path(Namespace::DataElement)?.clone();
    let builder = context
        .nearest_data_element_builder(&owner_path)
        .and_then(|domain_path| context.data_element_builder(&domain_path))
        .cloned();

    let mut context = context
        .with_point(argument.clone().into())
        .with_edge(&argument.path, &owner_path, edge)?
        .with_edge(&argument.path, &element_type, MaterializationEdge::ElementType)?;

    if let Some(builder) = builder {
        context = context.with_data_element_builder(
            builder.with_argument(&argument.argument.name, argument.argument.value.clone()),
        );
    }

    Ok(context)
}

/// First matching rule wins, raw input context beats everything else.
fn argument_provenance(
    context: &PlannerContext,
    argument: &ArgumentComponentContext,
    default_value: Option<&ConstValue>,
) -> Option<MaterializationEdge> {
    let metamodel = context.metamodel();
    let owner = context.field_at(&argument.field_path())?;

    let mut owner_names = metamodel.aliases().field_names(&owner.coordinates);
    owner_names.extend(owner.field.alias.as_deref());
    if let Some(domain) = metamodel.domain_source(&owner.coordinates) {
        owner_names.push(&domain.name);
    }

    if context.raw_input_supplies(owner_names) {
        return Some(MaterializationEdge::RawInputValueProvided);
    }

    let value = &argument.argument.value;
    if let Value::Variable(name) = value {
        return context
            .variable_key(name)
            .map(|_| MaterializationEdge::VariableValueProvided);
    }

    let equals_default = default_value.is_some_and(|default| values_equivalent(value, default));
    let argument_names = metamodel
        .aliases()
        .argument_names(&argument.field_coordinates, &argument.argument.name);

    if equals_default && context.raw_input_supplies(argument_names) {
        return Some(MaterializationEdge::RawInputValueProvided);
    }

    match default_value {
        None => Some(MaterializationEdge::DirectArgumentValueProvided),
        Some(_) if !equals_default => Some(MaterializationEdge::DirectArgumentValueProvided),
        Some(_) => Some(MaterializationEdge::DefaultArgumentValueProvided),
    }
}
