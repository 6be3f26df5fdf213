use crate::{metamodel::coordinates::FieldCoordinates, path::OperationPath};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TraversalError {
    #[error("Operation '{0}' was not found in the document")]
    OperationNotFound(String),
    #[error("Document does not contain any operation")]
    MissingOperation,
    #[error("Document contains {0} operations, an operation name is required")]
    AmbiguousOperation(usize),
    #[error("Only query operations can be materialized, got a {0}")]
    UnsupportedOperationKind(&'static str),
    #[error("Fragment '{0}' was not found in the document")]
    FragmentNotFound(String),
    #[error("Fragment '{0}' spreads itself")]
    CyclicFragmentSpread(String),
    #[error("Type '{0}' was not found in the schema")]
    TypeNotFound(String),
    #[error("Field '{field_name}' was not found on type '{type_name}'")]
    FieldNotFound {
        type_name: String,
        field_name: String,
    },
    #[error("Argument '{1}' was not found on field '{0}'")]
    ArgumentNotFound(FieldCoordinates, String),
    #[error("No schema field is reachable at canonical path {0}")]
    UnknownCanonicalPath(OperationPath),
}
