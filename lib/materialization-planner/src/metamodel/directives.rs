use graphql_parser::schema::{Directive, Value};
use tracing::{trace, warn};

use crate::{
    metamodel::{
        coordinates::FieldCoordinates,
        schema::{SchemaIndex, TypeKind},
    },
    utils::value::render_value,
};

pub static ALIAS_DIRECTIVE: &str = "alias";
pub static LAST_UPDATED_DIRECTIVE: &str = "lastUpdated";

/// Supplementary metadata read from schema directives.
#[derive(Debug, Default)]
pub struct DirectiveMetadata {
    pub field_aliases: Vec<(FieldCoordinates, String)>,
    pub argument_aliases: Vec<(FieldCoordinates, String, String)>,
    /// Fields flagged as the staleness companion of their parent type
    pub last_updated_fields: Vec<FieldCoordinates>,
}

/// Collects `@alias(name:)` and `@lastUpdated` usages.
///
/// Directive metadata is not load-bearing: a malformed usage is logged and
/// skipped instead of failing the whole schema read.
pub fn index_directive_metadata(schema: &SchemaIndex) -> DirectiveMetadata {
    let mut metadata = DirectiveMetadata::default();

    for schema_type in schema
        .types()
        .filter(|t| matches!(t.kind, TypeKind::Object | TypeKind::Interface))
    {
        for field in schema_type.fields.iter() {
            let coordinates = FieldCoordinates::new(&schema_type.name, &field.name);

            for directive in field.directives.iter() {
                if directive.name == ALIAS_DIRECTIVE {
                    for alias in alias_names(directive, &coordinates.to_string()) {
                        trace!("indexed field alias '{}' for {}", alias, coordinates);
                        metadata.field_aliases.push((coordinates.clone(), alias));
                    }
                } else if directive.name == LAST_UPDATED_DIRECTIVE {
                    if schema.is_composite(field.output_type_name()) {
                        warn!(
                            "@{} on {} must decorate a leaf field, ignoring it",
                            LAST_UPDATED_DIRECTIVE, coordinates
                        );
                        continue;
                    }
                    metadata.last_updated_fields.push(coordinates.clone());
                }
            }

            for argument in field.arguments.iter() {
                for directive in argument
                    .directives
                    .iter()
                    .filter(|d| d.name == ALIAS_DIRECTIVE)
                {
                    let location = format!("{}({}:)", coordinates, argument.name);
                    for alias in alias_names(directive, &location) {
                        trace!("indexed argument alias '{}' for {}", alias, location);
                        metadata.argument_aliases.push((
                            coordinates.clone(),
                            argument.name.clone(),
                            alias,
                        ));
                    }
                }
            }
        }
    }

    metadata
}

fn alias_names(directive: &Directive<'static, String>, location: &str) -> Vec<String> {
    let Some((_, value)) = directive.arguments.iter().find(|(name, _)| name == "name") else {
        warn!(
            "@{} on {} is missing its 'name' argument, ignoring it",
            ALIAS_DIRECTIVE, location
        );
        return vec![];
    };

    match value {
        Value::String(alias) => vec![alias.clone()],
        Value::List(values) => values
            .iter()
            .filter_map(|value| match value {
                Value::String(alias) => Some(alias.clone()),
                other => {
                    warn!(
                        "@{} on {} lists a non-string name '{}', skipping it",
                        ALIAS_DIRECTIVE, location, render_value(other)
                    );
                    None
                }
            })
            .collect(),
        other => {
            warn!(
                "@{} on {} expects a string name, got '{}', ignoring it",
                ALIAS_DIRECTIVE, location, render_value(other)
            );
            vec![]
        }
    }
}
