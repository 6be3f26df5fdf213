use std::fmt::Display;

use graphql_parser::query::Value;

use crate::{
    metamodel::coordinates::FieldCoordinates, path::OperationPath, utils::value::render_value,
};

/// The syntax of a selected field, detached from its selection set.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub alias: Option<String>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentNode {
    pub name: String,
    pub value: Value<'static, String>,
    /// Produced from a schema default rather than written by the caller
    pub fabricated: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldComponentContext {
    pub field: FieldNode,
    pub coordinates: FieldCoordinates,
    pub path: OperationPath,
    pub canonical_path: OperationPath,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentComponentContext {
    pub argument: ArgumentNode,
    /// Coordinates of the field owning the argument
    pub field_coordinates: FieldCoordinates,
    pub path: OperationPath,
    pub canonical_path: OperationPath,
}

impl ArgumentComponentContext {
    /// Materialized path of the owning field.
    pub fn field_path(&self) -> OperationPath {
        self.path.without_last()
    }

    pub fn field_canonical_path(&self) -> OperationPath {
        self.canonical_path.without_last()
    }
}

/// A vertex payload of the materialization graph.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentContext {
    Field(FieldComponentContext),
    Argument(ArgumentComponentContext),
}

impl ComponentContext {
    pub fn path(&self) -> &OperationPath {
        match self {
            ComponentContext::Field(field) => &field.path,
            ComponentContext::Argument(argument) => &argument.path,
        }
    }

    pub fn canonical_path(&self) -> &OperationPath {
        match self {
            ComponentContext::Field(field) => &field.canonical_path,
            ComponentContext::Argument(argument) => &argument.canonical_path,
        }
    }

    /// The field's own coordinates, or the owning field's for an argument.
    pub fn field_coordinates(&self) -> &FieldCoordinates {
        match self {
            ComponentContext::Field(field) => &field.coordinates,
            ComponentContext::Argument(argument) => &argument.field_coordinates,
        }
    }

    pub fn as_field(&self) -> Option<&FieldComponentContext> {
        match self {
            ComponentContext::Field(field) => Some(field),
            ComponentContext::Argument(_) => None,
        }
    }

    pub fn as_argument(&self) -> Option<&ArgumentComponentContext> {
        match self {
            ComponentContext::Field(_) => None,
            ComponentContext::Argument(argument) => Some(argument),
        }
    }
}

impl Display for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentContext::Field(field) => {
                write!(f, "{} [{}]", field.path, field.coordinates)
            }
            ComponentContext::Argument(argument) => {
                write!(
                    f,
                    "{} = {}{}",
                    argument.path,
                    render_value(&argument.argument.value),
                    if argument.argument.fabricated {
                        " (default)"
                    } else {
                        ""
                    }
                )
            }
        }
    }
}

impl From<FieldComponentContext> for ComponentContext {
    fn from(value: FieldComponentContext) -> Self {
        ComponentContext::Field(value)
    }
}

impl From<ArgumentComponentContext> for ComponentContext {
    fn from(value: ArgumentComponentContext) -> Self {
        ComponentContext::Argument(value)
    }
}
