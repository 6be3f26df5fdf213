use std::collections::{BTreeMap, BTreeSet};

use graphql_parser::query::Value;
use tracing::{instrument, trace};

use crate::{
    context::{
        ArgumentComponentContext, ArgumentNode, ComponentContext, FieldComponentContext,
        FieldNode,
    },
    metamodel::{
        coordinates::FieldCoordinates, namespace::Namespace, schema::SchemaArgument,
        MaterializationMetamodel,
    },
    path::OperationPath,
    request::RequestInputs,
    traverser::error::TraversalError,
    utils::matching::NameMatcher,
};

/// Builds component contexts from the metamodel instead of from a document.
///
/// Given a set of canonical field paths, emits every field needed to reach
/// them (ancestors first), each immediately followed by its arguments, in the
/// same order the document traverser would produce.
pub struct ComponentSynthesizer<'a> {
    metamodel: &'a MaterializationMetamodel,
    inputs: &'a RequestInputs,
    matcher: NameMatcher,
    /// Argument canonical path to the variable key bound to it. When present
    /// it replaces name matching against the variable keys.
    variable_bindings: Option<&'a BTreeMap<OperationPath, String>>,
}

impl<'a> ComponentSynthesizer<'a> {
    pub fn new(
        metamodel: &'a MaterializationMetamodel,
        inputs: &'a RequestInputs,
        matcher: NameMatcher,
    ) -> Self {
        Self {
            metamodel,
            inputs,
            matcher,
            variable_bindings: None,
        }
    }

    pub fn with_variable_bindings(mut self, bindings: &'a BTreeMap<OperationPath, String>) -> Self {
        self.variable_bindings = Some(bindings);
        self
    }

    /// `existing` maps a canonical path to the materialized path it already
    /// has in the plan; such fields are reused instead of emitted again.
    #[instrument(level = "trace", skip_all)]
    pub fn synthesize<F>(
        &self,
        targets: impl IntoIterator<Item = OperationPath>,
        existing: F,
    ) -> Result<Vec<ComponentContext>, TraversalError>
    where
        F: Fn(&OperationPath) -> Option<OperationPath>,
    {
        let mut needed: BTreeSet<OperationPath> = BTreeSet::new();
        for target in targets {
            needed.extend(target.ancestors().filter(|p| !p.is_root()));
        }

        let mut children: BTreeMap<OperationPath, Vec<OperationPath>> = BTreeMap::new();
        for path in needed.iter() {
            if let Some(parent) = path.parent() {
                children.entry(parent).or_default().push(path.clone());
            }
        }

        let mut roots = children.remove(&OperationPath::root()).unwrap_or_default();
        roots.sort_by_key(|root| (Namespace::priority(self.metamodel.namespace_of(root)), root.clone()));

        let mut components = vec![];
        // (canonical, materialized parent), consumed depth first
        let mut stack: Vec<(OperationPath, OperationPath)> = roots
            .into_iter()
            .rev()
            .map(|root| (root, OperationPath::root()))
            .collect();

        while let Some((canonical, materialized_parent)) = stack.pop() {
            let materialized = match existing(&canonical) {
                Some(materialized) => {
                    trace!("reusing {} for {}", materialized, canonical);
                    materialized
                }
                None => self.emit_field(&canonical, &materialized_parent, &mut components)?,
            };

            if let Some(nested) = children.get(&canonical) {
                stack.extend(
                    nested
                        .iter()
                        .rev()
                        .map(|child| (child.clone(), materialized.clone())),
                );
            }
        }

        Ok(components)
    }

    fn emit_field(
        &self,
        canonical: &OperationPath,
        materialized_parent: &OperationPath,
        components: &mut Vec<ComponentContext>,
    ) -> Result<OperationPath, TraversalError> {
        let field_name = canonical
            .field_name()
            .ok_or_else(|| TraversalError::UnknownCanonicalPath(canonical.clone()))?;
        let coordinates = self
            .metamodel
            .field_coordinates(canonical)
            .and_then(|coordinates| coordinates.first())
            .ok_or_else(|| TraversalError::UnknownCanonicalPath(canonical.clone()))?;
        let definition = self
            .metamodel
            .field_definition(coordinates)
            .ok_or_else(|| TraversalError::FieldNotFound {
                type_name: coordinates.type_name.clone(),
                field_name: coordinates.field_name.clone(),
            })?;

        let materialized = materialized_parent.with_field(field_name);
        trace!("synthesized field {}", materialized);

        components.push(ComponentContext::Field(FieldComponentContext {
            field: FieldNode::new(field_name),
            coordinates: coordinates.clone(),
            path: materialized.clone(),
            canonical_path: canonical.clone(),
        }));

        for argument_definition in definition.arguments.iter() {
            let Some(argument) = self.argument_node(coordinates, canonical, argument_definition)
            else {
                trace!(
                    "no value available for argument '{}' of {}",
                    argument_definition.name,
                    coordinates
                );
                continue;
            };

            components.push(ComponentContext::Argument(ArgumentComponentContext {
                path: materialized.with_argument(&argument.name),
                canonical_path: canonical.with_argument(&argument.name),
                field_coordinates: coordinates.clone(),
                argument,
            }));
        }

        Ok(materialized)
    }

    /// Value of a synthesized argument: a bound variable, else the schema
    /// default, else null when the whole domain comes from the raw input.
    fn argument_node(
        &self,
        coordinates: &FieldCoordinates,
        canonical: &OperationPath,
        definition: &SchemaArgument,
    ) -> Option<ArgumentNode> {
        if let Some(variable) = self.bound_variable(coordinates, canonical, &definition.name) {
            return Some(ArgumentNode {
                name: definition.name.clone(),
                value: Value::Variable(variable),
                fabricated: false,
            });
        }

        if let Some(default_value) = &definition.default_value {
            return Some(ArgumentNode {
                name: definition.name.clone(),
                value: default_value.clone(),
                fabricated: true,
            });
        }

        let raw_supplied_domain = self.metamodel.domain_source(coordinates).is_some_and(|domain| {
            self.matcher.any_in(
                self.metamodel.domain_names(domain),
                &self.inputs.raw_input_context_keys,
            )
        });

        raw_supplied_domain.then(|| ArgumentNode {
            name: definition.name.clone(),
            value: Value::Null,
            fabricated: true,
        })
    }

    fn bound_variable(
        &self,
        coordinates: &FieldCoordinates,
        canonical: &OperationPath,
        argument_name: &str,
    ) -> Option<String> {
        match self.variable_bindings {
            Some(bindings) => bindings.get(&canonical.with_argument(argument_name)).cloned(),
            None => self
                .metamodel
                .aliases()
                .argument_names(coordinates, argument_name)
                .into_iter()
                .find_map(|name| self.matcher.find_in(name, &self.inputs.variable_keys))
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, error::Error};

    use crate::{
        context::ComponentContext,
        path::OperationPath,
        request::RequestInputs,
        tests::testkit::build_metamodel,
        traverser::synthesis::ComponentSynthesizer,
        utils::matching::NameMatcher,
    };

    fn rendered(components: &[ComponentContext]) -> Vec<String> {
        components.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn emits_ancestors_before_descendants() -> Result<(), Box<dyn Error>> {
        let metamodel = build_metamodel();
        let inputs = RequestInputs::new(Vec::<String>::new(), ["person"]);
        let synthesizer = ComponentSynthesizer::new(&metamodel, &inputs, NameMatcher::default());

        let components = synthesizer.synthesize(
            [
                OperationPath::of_fields(["feature", "score"]),
                OperationPath::of_fields(["dataElement", "person", "age"]),
            ],
            |_| None,
        )?;

        assert_eq!(
            rendered(&components),
            vec![
                "/dataElement [Query.dataElement]",
                "/dataElement/person [DataElement.person]",
                "/dataElement/person?id = \"1\" (default)",
                "/dataElement/person/age [Person.age]",
                "/feature [Query.feature]",
                "/feature/score [Feature.score]",
                "/feature/score?threshold = 0.5 (default)",
            ]
        );

        Ok(())
    }

    #[test]
    fn binds_variables_and_reuses_existing_fields() -> Result<(), Box<dyn Error>> {
        let metamodel = build_metamodel();
        let inputs = RequestInputs::new(["acct"], ["account"]);
        let bindings = BTreeMap::from([(
            OperationPath::of_fields(["dataElement", "account"]).with_argument("accountId"),
            "acct".to_string(),
        )]);
        let synthesizer = ComponentSynthesizer::new(&metamodel, &inputs, NameMatcher::default())
            .with_variable_bindings(&bindings);

        let existing = OperationPath::root().with_aliased_field("dataElement", Some("de"));
        let components = synthesizer.synthesize(
            [OperationPath::of_fields(["dataElement", "account", "balance"])],
            |canonical| {
                (canonical == &OperationPath::of_fields(["dataElement"])).then(|| existing.clone())
            },
        )?;

        assert_eq!(
            rendered(&components),
            vec![
                "/de:dataElement/account [DataElement.account]",
                "/de:dataElement/account?accountId = $acct",
                "/de:dataElement/account?region = \"eu\" (default)",
                "/de:dataElement/account/balance [Account.balance]",
            ]
        );

        Ok(())
    }

    #[test]
    fn raw_supplied_domains_get_null_required_arguments() -> Result<(), Box<dyn Error>> {
        let metamodel = build_metamodel();
        let inputs = RequestInputs::new(Vec::<String>::new(), ["ACCOUNT"]);
        let synthesizer = ComponentSynthesizer::new(&metamodel, &inputs, NameMatcher::default());

        let components =
            synthesizer.synthesize([OperationPath::of_fields(["dataElement", "account"])], |_| None)?;

        assert!(rendered(&components).contains(&"/dataElement/account?accountId = null (default)".to_string()));
        Ok(())
    }
}
