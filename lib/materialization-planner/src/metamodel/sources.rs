use std::fmt::Display;

use crate::{
    metamodel::{
        coordinates::FieldCoordinates,
        schema::{ConstValue, SchemaArgument},
    },
    path::OperationPath,
};

/// Root field of a data-element subtree, bound to a concrete backing callable.
#[derive(Clone, Debug)]
pub struct DomainSource {
    pub name: String,
    pub coordinates: FieldCoordinates,
    /// Shortest canonical path realising the source
    pub path: OperationPath,
    pub output_type: String,
    pub arguments: Vec<SchemaArgument>,
}

impl DomainSource {
    pub fn argument(&self, name: &str) -> Option<&SchemaArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Arguments that have to be supplied because the schema declares no default.
    pub fn required_arguments(&self) -> impl Iterator<Item = &SchemaArgument> {
        self.arguments.iter().filter(|a| !a.has_default())
    }
}

#[derive(Clone, Debug)]
pub struct TransformerSource {
    pub name: String,
    pub coordinates: FieldCoordinates,
    pub path: OperationPath,
    pub arguments: Vec<SchemaArgument>,
}

impl TransformerSource {
    pub fn default_value(&self, argument_name: &str) -> Option<&ConstValue> {
        self.arguments
            .iter()
            .find(|a| a.name == argument_name)
            .and_then(|a| a.default_value.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct FeatureCalculator {
    pub name: String,
    pub coordinates: FieldCoordinates,
    pub path: OperationPath,
    pub arguments: Vec<SchemaArgument>,
    /// The transformer the calculator delegates to
    pub transformer_source: FieldCoordinates,
}

impl FeatureCalculator {
    pub fn argument(&self, name: &str) -> Option<&SchemaArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    pub fn default_value(&self, argument_name: &str) -> Option<&ConstValue> {
        self.argument(argument_name)
            .and_then(|a| a.default_value.as_ref())
    }
}

impl Display for DomainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.coordinates)
    }
}

impl Display for TransformerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.coordinates)
    }
}

impl Display for FeatureCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.coordinates)
    }
}
