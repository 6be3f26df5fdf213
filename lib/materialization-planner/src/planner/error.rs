use crate::{
    graph::error::GraphError,
    metamodel::{coordinates::FieldCoordinates, namespace::Namespace},
    path::OperationPath,
    tabular::error::CompositionError,
    traverser::error::TraversalError,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanningError {
    #[error("Traversal error: {0}")]
    TraversalFailure(Box<TraversalError>),
    #[error("Graph error: {0}")]
    GraphFailure(Box<GraphError>),
    #[error(transparent)]
    CompositionFailure(#[from] CompositionError),
    /// The parent of a component has not been connected yet. Points at an
    /// ordering defect rather than bad input.
    #[error("Cannot connect '{path}': its parent '{parent}' is not in the graph")]
    MissingPrerequisite {
        path: OperationPath,
        parent: OperationPath,
    },
    #[error("The {0} element type has not been selected")]
    MissingElementType(Namespace),
    #[error("No provenance rule applies to argument '{path}' of '{coordinates}' with value {value}")]
    UnhandledArgumentProvenance {
        path: OperationPath,
        coordinates: FieldCoordinates,
        value: String,
    },
    #[error("Feature argument '{path}' has no default and no source among [{}]", .candidates.join(", "))]
    UnresolvedFeatureArgument {
        path: OperationPath,
        candidates: Vec<String>,
    },
    #[error("Field '{path}' ({coordinates}) resolves to '{output_type}', a composite type was expected")]
    SchemaShapeViolation {
        path: OperationPath,
        coordinates: FieldCoordinates,
        output_type: String,
    },
    #[error("'{path}' is not located under any element type")]
    OutsideElementTypeNamespaces { path: OperationPath },
    #[error("Data element '{path}' is not selected under any domain source")]
    MissingDomainSource { path: OperationPath },
    #[error("Vertex '{0}' has no dependency after planning")]
    UnconnectedVertex(OperationPath),
}

impl From<TraversalError> for PlanningError {
    fn from(error: TraversalError) -> Self {
        PlanningError::TraversalFailure(Box::new(error))
    }
}

impl From<GraphError> for PlanningError {
    fn from(error: GraphError) -> Self {
        PlanningError::GraphFailure(Box::new(error))
    }
}
