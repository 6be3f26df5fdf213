mod data_element;
mod feature;
mod transformer;

use tracing::{debug, instrument, trace};

use crate::{
    context::{ArgumentComponentContext, ComponentContext, FieldComponentContext},
    graph::edge::MaterializationEdge,
    metamodel::namespace::Namespace,
    path::OperationPath,
    planner::{context::PlannerContext, error::PlanningError},
};

/// Unit of work of the connector loop.
///
/// Connecting a feature argument may require fields that were never selected;
/// those are queued on top of a retry of the argument instead of being
/// connected recursively.
#[derive(Debug)]
pub(crate) enum PendingConnection {
    Connect(ComponentContext),
    /// Second (and last) attempt at a feature argument whose source has just
    /// been queued
    Retry(ArgumentComponentContext),
}

/// Folds component contexts, in order, into the planner context.
#[instrument(level = "trace", skip_all)]
pub fn connect_components(
    mut context: PlannerContext,
    components: impl IntoIterator<Item = ComponentContext>,
) -> Result<PlannerContext, PlanningError> {
    let components: Vec<ComponentContext> = components.into_iter().collect();
    let mut pending: Vec<PendingConnection> = vec![];

    for (index, component) in components.iter().enumerate() {
        let upcoming = &components[index + 1..];
        pending.push(PendingConnection::Connect(component.clone()));

        while let Some(next) = pending.pop() {
            context = match next {
                PendingConnection::Connect(ComponentContext::Field(field)) => {
                    connect_field(context, field, &mut pending)?
                }
                PendingConnection::Connect(ComponentContext::Argument(argument)) => {
                    connect_argument(context, argument, false, upcoming, &mut pending)?
                }
                PendingConnection::Retry(argument) => {
                    connect_argument(context, argument, true, upcoming, &mut pending)?
                }
            };
        }
    }

    debug!(
        "connected graph has {} vertices and {} edges",
        context.graph().vertex_count(),
        context.graph().edge_count()
    );

    Ok(context)
}

fn connect_field(
    context: PlannerContext,
    field: FieldComponentContext,
    pending: &mut Vec<PendingConnection>,
) -> Result<PlannerContext, PlanningError> {
    if context.graph().is_connected(&field.path) {
        trace!("field {} is already connected", field.path);
        return Ok(context);
    }

    if context
        .metamodel()
        .element_type_namespace(&field.coordinates)
        .is_some()
    {
        trace!("element type {} connects to the root", field.path);
        let path = field.path.clone();
        return context.with_point(field.into()).with_edge(
            &path,
            &OperationPath::root(),
            MaterializationEdge::ElementType,
        );
    }

    let namespace = namespace_of(&context, &field.canonical_path)?;
    let parent = field.path.selection_parent().unwrap_or_default();
    if !context.graph().contains_point(&parent) {
        return Err(PlanningError::MissingPrerequisite {
            path: field.path.clone(),
            parent,
        });
    }

    let context = context.with_point(field.clone().into()).with_edge(
        &field.path,
        &parent,
        MaterializationEdge::ExtractFromSource,
    )?;

    match namespace {
        Namespace::DataElement => data_element::connect_field(context, &field, pending),
        Namespace::Transformer => transformer::connect_field(context, &field),
        Namespace::Feature => feature::connect_field(context, &field),
    }
}

fn connect_argument(
    context: PlannerContext,
    argument: ArgumentComponentContext,
    retried: bool,
    upcoming: &[ComponentContext],
    pending: &mut Vec<PendingConnection>,
) -> Result<PlannerContext, PlanningError> {
    if context.graph().is_connected(&argument.path) {
        trace!("argument {} is already connected", argument.path);
        return Ok(context);
    }

    let owner = argument.field_path();
    if context.field_at(&owner).is_none() {
        return Err(PlanningError::MissingPrerequisite {
            path: argument.path.clone(),
            parent: owner,
        });
    }

    match namespace_of(&context, &argument.canonical_path)? {
        Namespace::DataElement => data_element::connect_argument(context, &argument),
        Namespace::Transformer => transformer::connect_argument(context, &argument),
        Namespace::Feature => {
            feature::connect_argument(context, &argument, retried, upcoming, pending)
        }
    }
}

fn namespace_of(
    context: &PlannerContext,
    canonical_path: &OperationPath,
) -> Result<Namespace, PlanningError> {
    context
        .metamodel()
        .namespace_of(canonical_path)
        .ok_or_else(|| PlanningError::OutsideElementTypeNamespaces {
            path: canonical_path.clone(),
        })
}

/// Container fields need no callable, but must at least be composite.
fn require_composite(
    context: PlannerContext,
    field: &FieldComponentContext,
) -> Result<PlannerContext, PlanningError> {
    if context.metamodel().is_composite_output(&field.coordinates) {
        return Ok(context);
    }

    Err(PlanningError::SchemaShapeViolation {
        path: field.path.clone(),
        coordinates: field.coordinates.clone(),
        output_type: context
            .metamodel()
            .output_type_name(&field.coordinates)
            .unwrap_or_default()
            .to_string(),
    })
}
