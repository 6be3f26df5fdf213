use crate::{graph::edge::MaterializationEdge, path::OperationPath};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("Vertex '{0}' was not found")]
    VertexNotFound(OperationPath),
    #[error("Edge {0} -[{2}]-> {1} would close a dependency cycle")]
    CycleDetected(OperationPath, OperationPath, MaterializationEdge),
    #[error("Graph contains a dependency cycle through '{0}'")]
    Cyclic(OperationPath),
}
