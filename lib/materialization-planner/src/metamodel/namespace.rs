use std::fmt::Display;

use crate::{metamodel::coordinates::FieldCoordinates, path::OperationPath};

/// The three top-level partitions of the schema.
///
/// Declaration order is the planning priority: transformers and data elements
/// are always connected before any feature that could depend on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Transformer,
    DataElement,
    Feature,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [
        Namespace::Transformer,
        Namespace::DataElement,
        Namespace::Feature,
    ];

    pub fn default_field_name(&self) -> &'static str {
        match self {
            Namespace::Transformer => "transformer",
            Namespace::DataElement => "dataElement",
            Namespace::Feature => "feature",
        }
    }

    /// Sort key for root selections, unrecognized fields go last.
    pub fn priority(namespace: Option<Namespace>) -> u8 {
        namespace.map_or(Self::ALL.len() as u8, |namespace| namespace as u8)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Transformer => write!(f, "transformer"),
            Namespace::DataElement => write!(f, "data-element"),
            Namespace::Feature => write!(f, "feature"),
        }
    }
}

/// The reserved umbrella field of a namespace on the query root type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementType {
    pub namespace: Namespace,
    pub coordinates: FieldCoordinates,
    pub path: OperationPath,
    /// Name of the composite type the umbrella field resolves to
    pub output_type: String,
}

#[cfg(test)]
mod tests {
    use super::Namespace;

    #[test]
    fn priority_follows_declaration_order() {
        assert_eq!(Namespace::priority(Some(Namespace::Transformer)), 0);
        assert_eq!(Namespace::priority(Some(Namespace::DataElement)), 1);
        assert_eq!(Namespace::priority(Some(Namespace::Feature)), 2);
        assert_eq!(Namespace::priority(None), 3);
    }
}
