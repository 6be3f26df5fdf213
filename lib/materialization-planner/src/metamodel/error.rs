use crate::metamodel::{coordinates::FieldCoordinates, namespace::Namespace};

#[derive(Debug, Clone, thiserror::Error)]
pub enum MetamodelError {
    #[error("failed to parse schema: {0}")]
    SchemaParse(String),
    #[error("schema does not define a query root type '{0}'")]
    MissingQueryType(String),
    #[error("element type field '{1}' for the {0} namespace is missing on the query root")]
    MissingElementType(Namespace, String),
    #[error("element type field '{0}' does not resolve to a composite type")]
    ElementTypeNotComposite(FieldCoordinates),
    #[error("type '{0}' was not found in the schema")]
    TypeNotFound(String),
    #[error("field '{0}' was not found in the schema")]
    FieldNotFound(FieldCoordinates),
    #[error("field '{0}' is not reachable from the {1} element type")]
    UnreachableSource(FieldCoordinates, Namespace),
    #[error("argument '{1}' was not found on field '{0}'")]
    ArgumentNotFound(FieldCoordinates, String),
}
