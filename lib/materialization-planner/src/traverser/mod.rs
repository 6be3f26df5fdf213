pub mod error;
pub mod synthesis;

use graphql_parser::query::{
    Definition, Document, Field, FragmentDefinition, OperationDefinition, Selection,
    SelectionSet, TypeCondition,
};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::{
    context::{
        ArgumentComponentContext, ArgumentNode, ComponentContext, FieldComponentContext,
        FieldNode,
    },
    metamodel::{coordinates::FieldCoordinates, namespace::Namespace, MaterializationMetamodel},
    path::OperationPath,
    traverser::error::TraversalError,
};

pub type OperationDocument = Document<'static, String>;

/// Walks one operation of a document into the ordered list of component
/// contexts the connector folds into a graph.
///
/// Root selections are visited by namespace priority (transformer, data
/// element, feature, anything else); below the root, selections keep document
/// order, every field is followed by its arguments and then by its children.
#[instrument(level = "trace", skip(metamodel, document))]
pub fn traverse_document(
    metamodel: &MaterializationMetamodel,
    document: &OperationDocument,
    operation_name: Option<&str>,
) -> Result<Vec<ComponentContext>, TraversalError> {
    let selection_set = find_operation(document, operation_name)?;
    let fragments: FxHashMap<&str, &FragmentDefinition<'static, String>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect();

    let traverser = DocumentTraverser {
        metamodel,
        fragments,
    };

    let mut root_fields = vec![];
    traverser.flatten_root_selections(
        selection_set,
        metamodel.query_type(),
        &OperationPath::root(),
        &mut vec![],
        &mut root_fields,
    )?;

    // stable: document order is kept within a namespace
    root_fields.sort_by_key(|root| {
        Namespace::priority(metamodel.element_type_namespace(&FieldCoordinates::new(
            &root.type_name,
            &root.field.name,
        )))
    });

    let mut components = vec![];
    for root in root_fields {
        traverser.visit_field(
            root.field,
            &root.type_name,
            &root.materialized_parent,
            &OperationPath::root(),
            &mut vec![],
            &mut components,
        )?;
    }

    debug!(
        "traversed operation into {} component contexts",
        components.len()
    );

    Ok(components)
}

fn find_operation<'d>(
    document: &'d OperationDocument,
    operation_name: Option<&str>,
) -> Result<&'d SelectionSet<'static, String>, TraversalError> {
    let operations: Vec<&OperationDefinition<'static, String>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .collect();

    let name_of = |operation: &OperationDefinition<'static, String>| -> Option<String> {
        match operation {
            OperationDefinition::SelectionSet(_) => None,
            OperationDefinition::Query(query) => query.name.clone(),
            OperationDefinition::Mutation(mutation) => mutation.name.clone(),
            OperationDefinition::Subscription(subscription) => subscription.name.clone(),
        }
    };

    let operation = match operation_name {
        Some(operation_name) => operations
            .into_iter()
            .find(|operation| name_of(operation).as_deref() == Some(operation_name))
            .ok_or_else(|| TraversalError::OperationNotFound(operation_name.to_string()))?,
        None => match operations.len() {
            0 => return Err(TraversalError::MissingOperation),
            1 => operations[0],
            count => return Err(TraversalError::AmbiguousOperation(count)),
        },
    };

    match operation {
        OperationDefinition::SelectionSet(selection_set) => Ok(selection_set),
        OperationDefinition::Query(query) => Ok(&query.selection_set),
        OperationDefinition::Mutation(_) => Err(TraversalError::UnsupportedOperationKind("mutation")),
        OperationDefinition::Subscription(_) => {
            Err(TraversalError::UnsupportedOperationKind("subscription"))
        }
    }
}

struct RootField<'d> {
    field: &'d Field<'static, String>,
    type_name: String,
    materialized_parent: OperationPath,
}

struct DocumentTraverser<'m, 'd> {
    metamodel: &'m MaterializationMetamodel,
    fragments: FxHashMap<&'d str, &'d FragmentDefinition<'static, String>>,
}

impl<'d> DocumentTraverser<'_, 'd> {
    /// Inlines fragments found directly under the operation root so that root
    /// fields can be reordered by namespace.
    fn flatten_root_selections(
        &self,
        selection_set: &'d SelectionSet<'static, String>,
        type_name: &str,
        materialized_parent: &OperationPath,
        spread_stack: &mut Vec<&'d str>,
        root_fields: &mut Vec<RootField<'d>>,
    ) -> Result<(), TraversalError> {
        for selection in selection_set.items.iter() {
            match selection {
                Selection::Field(field) => root_fields.push(RootField {
                    field,
                    type_name: type_name.to_string(),
                    materialized_parent: materialized_parent.clone(),
                }),
                Selection::InlineFragment(inline_fragment) => {
                    let (fragment_type, materialized) = self.enter_inline_fragment(
                        inline_fragment.type_condition.as_ref(),
                        type_name,
                        materialized_parent,
                    )?;
                    self.flatten_root_selections(
                        &inline_fragment.selection_set,
                        &fragment_type,
                        &materialized,
                        spread_stack,
                        root_fields,
                    )?;
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = self.enter_fragment_spread(&spread.fragment_name, spread_stack)?;
                    let TypeCondition::On(fragment_type) = &fragment.type_condition;
                    let materialized =
                        materialized_parent.with_fragment_spread(&fragment.name, fragment_type);

                    spread_stack.push(fragment.name.as_str());
                    self.flatten_root_selections(
                        &fragment.selection_set,
                        fragment_type,
                        &materialized,
                        spread_stack,
                        root_fields,
                    )?;
                    spread_stack.pop();
                }
            }
        }

        Ok(())
    }

    fn enter_inline_fragment(
        &self,
        type_condition: Option<&TypeCondition<'static, String>>,
        type_name: &str,
        materialized_parent: &OperationPath,
    ) -> Result<(String, OperationPath), TraversalError> {
        match type_condition {
            Some(TypeCondition::On(fragment_type)) => {
                if !self.metamodel.schema().is_composite(fragment_type) {
                    return Err(TraversalError::TypeNotFound(fragment_type.clone()));
                }
                if fragment_type == type_name {
                    trace!("fragment on '{}' does not narrow the type", fragment_type);
                }

                Ok((
                    fragment_type.clone(),
                    materialized_parent.with_inline_fragment(fragment_type),
                ))
            }
            // without a type condition the fragment only groups selections
            None => Ok((type_name.to_string(), materialized_parent.clone())),
        }
    }

    fn enter_fragment_spread(
        &self,
        fragment_name: &str,
        spread_stack: &[&'d str],
    ) -> Result<&'d FragmentDefinition<'static, String>, TraversalError> {
        if spread_stack.iter().any(|name| *name == fragment_name) {
            return Err(TraversalError::CyclicFragmentSpread(
                fragment_name.to_string(),
            ));
        }

        let fragment = self
            .fragments
            .get(fragment_name)
            .copied()
            .ok_or_else(|| TraversalError::FragmentNotFound(fragment_name.to_string()))?;

        let TypeCondition::On(fragment_type) = &fragment.type_condition;
        if !self.metamodel.schema().is_composite(fragment_type) {
            return Err(TraversalError::TypeNotFound(fragment_type.clone()));
        }

        Ok(fragment)
    }

    fn visit_field(
        &self,
        field: &'d Field<'static, String>,
        parent_type: &str,
        materialized_parent: &OperationPath,
        canonical_parent: &OperationPath,
        spread_stack: &mut Vec<&'d str>,
        components: &mut Vec<ComponentContext>,
    ) -> Result<(), TraversalError> {
        if field.name.starts_with("__") {
            trace!("skipping introspection field '{}'", field.name);
            return Ok(());
        }

        let coordinates = FieldCoordinates::new(parent_type, &field.name);
        let field_definition = self
            .metamodel
            .field_definition(&coordinates)
            .ok_or_else(|| TraversalError::FieldNotFound {
                type_name: parent_type.to_string(),
                field_name: field.name.clone(),
            })?;

        let path = materialized_parent.with_aliased_field(&field.name, field.alias.as_deref());
        let canonical_path = canonical_parent.with_field(&field.name);
        trace!("visiting field {} as {}", canonical_path, path);

        components.push(ComponentContext::Field(FieldComponentContext {
            field: FieldNode {
                name: field.name.clone(),
                alias: field.alias.clone(),
            },
            coordinates: coordinates.clone(),
            path: path.clone(),
            canonical_path: canonical_path.clone(),
        }));

        if let Some((unknown, _)) = field
            .arguments
            .iter()
            .find(|(name, _)| field_definition.argument(name).is_none())
        {
            return Err(TraversalError::ArgumentNotFound(
                coordinates,
                unknown.clone(),
            ));
        }

        for argument_definition in field_definition.arguments.iter() {
            let supplied = field
                .arguments
                .iter()
                .find(|(name, _)| *name == argument_definition.name)
                .map(|(_, value)| value);

            let argument = match (supplied, &argument_definition.default_value) {
                (Some(value), _) => ArgumentNode {
                    name: argument_definition.name.clone(),
                    value: value.clone(),
                    fabricated: false,
                },
                (None, Some(default_value)) => ArgumentNode {
                    name: argument_definition.name.clone(),
                    value: default_value.clone(),
                    fabricated: true,
                },
                (None, None) => continue,
            };

            components.push(ComponentContext::Argument(ArgumentComponentContext {
                path: path.with_argument(&argument.name),
                canonical_path: canonical_path.with_argument(&argument.name),
                field_coordinates: coordinates.clone(),
                argument,
            }));
        }

        self.visit_selection_set(
            &field.selection_set,
            field_definition.output_type_name(),
            &path,
            &canonical_path,
            spread_stack,
            components,
        )
    }

    fn visit_selection_set(
        &self,
        selection_set: &'d SelectionSet<'static, String>,
        type_name: &str,
        materialized_parent: &OperationPath,
        canonical_parent: &OperationPath,
        spread_stack: &mut Vec<&'d str>,
        components: &mut Vec<ComponentContext>,
    ) -> Result<(), TraversalError> {
        for selection in selection_set.items.iter() {
            match selection {
                Selection::Field(field) => self.visit_field(
                    field,
                    type_name,
                    materialized_parent,
                    canonical_parent,
                    spread_stack,
                    components,
                )?,
                Selection::InlineFragment(inline_fragment) => {
                    let (fragment_type, materialized) = self.enter_inline_fragment(
                        inline_fragment.type_condition.as_ref(),
                        type_name,
                        materialized_parent,
                    )?;
                    self.visit_selection_set(
                        &inline_fragment.selection_set,
                        &fragment_type,
                        &materialized,
                        canonical_parent,
                        spread_stack,
                        components,
                    )?;
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = self.enter_fragment_spread(&spread.fragment_name, spread_stack)?;
                    let TypeCondition::On(fragment_type) = &fragment.type_condition;
                    let materialized =
                        materialized_parent.with_fragment_spread(&fragment.name, fragment_type);

                    spread_stack.push(fragment.name.as_str());
                    self.visit_selection_set(
                        &fragment.selection_set,
                        fragment_type,
                        &materialized,
                        canonical_parent,
                        spread_stack,
                        components,
                    )?;
                    spread_stack.pop();
                }
            }
        }

        Ok(())
    }
}
