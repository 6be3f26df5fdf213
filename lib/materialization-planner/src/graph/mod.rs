pub mod edge;
pub mod error;

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

use petgraph::{
    algo::{has_path_connecting, is_cyclic_directed, toposort},
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::{
    context::ComponentContext,
    graph::{edge::MaterializationEdge, error::GraphError},
    path::OperationPath,
};

type InnerGraph = DiGraph<OperationPath, MaterializationEdge>;

#[derive(Clone, Debug)]
struct Vertex {
    index: NodeIndex,
    /// `None` only for the root vertex
    context: Option<ComponentContext>,
}

#[derive(Clone, Debug)]
struct GraphState {
    arena: InnerGraph,
    vertices: FxHashMap<OperationPath, Vertex>,
}

/// Directed dependency graph of a request, keyed by materialized path.
///
/// Values are snapshots: cloning is O(1) and every insertion returns a new
/// graph, copying the shared state only when an older snapshot still holds it.
/// Vertices and edges are never removed.
#[derive(Clone)]
pub struct MaterializationGraph {
    state: Arc<GraphState>,
}

impl Default for MaterializationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterializationGraph {
    /// A graph holding only the root vertex.
    pub fn new() -> Self {
        let mut arena = InnerGraph::new();
        let root = OperationPath::root();
        let index = arena.add_node(root.clone());
        let mut vertices = FxHashMap::default();
        vertices.insert(
            root,
            Vertex {
                index,
                context: None,
            },
        );

        Self {
            state: Arc::new(GraphState { arena, vertices }),
        }
    }

    /// Adds (or refreshes the payload of) the vertex at the context's
    /// materialized path.
    pub fn with_point(mut self, context: ComponentContext) -> Self {
        let state = Arc::make_mut(&mut self.state);
        let path = context.path().clone();

        match state.vertices.get_mut(&path) {
            Some(vertex) => vertex.context = Some(context),
            None => {
                let index = state.arena.add_node(path.clone());
                state.vertices.insert(
                    path,
                    Vertex {
                        index,
                        context: Some(context),
                    },
                );
            }
        }

        self
    }

    /// Adds `from -[edge]-> to`. Both vertices must exist; an identical edge
    /// is not added twice and an edge closing a cycle is rejected.
    pub fn with_edge(
        mut self,
        from: &OperationPath,
        to: &OperationPath,
        edge: MaterializationEdge,
    ) -> Result<Self, GraphError> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;

        if self
            .state
            .arena
            .edges_connecting(from_index, to_index)
            .any(|e| *e.weight() == edge)
        {
            return Ok(self);
        }

        if from_index == to_index || has_path_connecting(&self.state.arena, to_index, from_index, None)
        {
            return Err(GraphError::CycleDetected(from.clone(), to.clone(), edge));
        }

        trace!("edge {} -[{}]-> {}", from, edge, to);
        Arc::make_mut(&mut self.state)
            .arena
            .add_edge(from_index, to_index, edge);

        Ok(self)
    }

    fn index_of(&self, path: &OperationPath) -> Result<NodeIndex, GraphError> {
        self.state
            .vertices
            .get(path)
            .map(|v| v.index)
            .ok_or_else(|| GraphError::VertexNotFound(path.clone()))
    }

    pub fn contains_point(&self, path: &OperationPath) -> bool {
        self.state.vertices.contains_key(path)
    }

    pub fn get_point(&self, path: &OperationPath) -> Option<&ComponentContext> {
        self.state
            .vertices
            .get(path)
            .and_then(|v| v.context.as_ref())
    }

    /// Whether the vertex exists and has at least one edge in either direction.
    pub fn is_connected(&self, path: &OperationPath) -> bool {
        self.state.vertices.get(path).is_some_and(|v| {
            self.state
                .arena
                .edges_directed(v.index, Direction::Outgoing)
                .next()
                .is_some()
                || self
                    .state
                    .arena
                    .edges_directed(v.index, Direction::Incoming)
                    .next()
                    .is_some()
        })
    }

    /// Vertices `path` depends on.
    pub fn successors(&self, path: &OperationPath) -> Vec<(&OperationPath, MaterializationEdge)> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Vertices depending on `path`.
    pub fn predecessors(&self, path: &OperationPath) -> Vec<(&OperationPath, MaterializationEdge)> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(
        &self,
        path: &OperationPath,
        direction: Direction,
    ) -> Vec<(&OperationPath, MaterializationEdge)> {
        let Some(vertex) = self.state.vertices.get(path) else {
            return vec![];
        };

        let mut neighbors: Vec<(&OperationPath, MaterializationEdge)> = self
            .state
            .arena
            .edges_directed(vertex.index, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (&self.state.arena[other], *e.weight())
            })
            .collect();
        neighbors.sort();
        neighbors
    }

    /// Whether `from` transitively depends on `to`.
    pub fn depends_on(&self, from: &OperationPath, to: &OperationPath) -> bool {
        match (self.state.vertices.get(from), self.state.vertices.get(to)) {
            (Some(from), Some(to)) => {
                has_path_connecting(&self.state.arena, from.index, to.index, None)
            }
            _ => false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.state.arena.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.state.arena.edge_count()
    }

    /// All vertices, sorted by materialized path.
    pub fn points(&self) -> Vec<(&OperationPath, Option<&ComponentContext>)> {
        let mut points: Vec<_> = self
            .state
            .vertices
            .iter()
            .map(|(path, v)| (path, v.context.as_ref()))
            .collect();
        points.sort_by(|a, b| a.0.cmp(b.0));
        points
    }

    /// All edges as `(from, to, label)`, sorted.
    pub fn edges(&self) -> Vec<(&OperationPath, &OperationPath, MaterializationEdge)> {
        let arena = &self.state.arena;
        let mut edges: Vec<_> = arena
            .edge_references()
            .map(|e| (&arena[e.source()], &arena[e.target()], *e.weight()))
            .collect();
        edges.sort();
        edges
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.state.arena)
    }

    /// Vertices ordered so that every dependency comes after its dependents.
    pub fn topological_order(&self) -> Result<Vec<&OperationPath>, GraphError> {
        toposort(&self.state.arena, None)
            .map(|order| order.into_iter().map(|i| &self.state.arena[i]).collect())
            .map_err(|cycle| GraphError::Cyclic(self.state.arena[cycle.node_id()].clone()))
    }
}

impl PartialEq for MaterializationGraph {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
            || (self.points() == other.points() && self.edges() == other.edges())
    }
}

impl Debug for MaterializationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for MaterializationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (from, to, edge) in self.edges() {
            writeln!(f, "{} -[{}]-> {}", from, edge, to)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use graphql_parser::query::Value;

    use crate::{
        context::{ArgumentComponentContext, ArgumentNode, FieldComponentContext, FieldNode},
        graph::{edge::MaterializationEdge, error::GraphError, MaterializationGraph},
        metamodel::coordinates::FieldCoordinates,
        path::OperationPath,
    };

    fn field(path: &[&str], type_name: &str) -> FieldComponentContext {
        let path = OperationPath::of_fields(path.iter().copied());
        FieldComponentContext {
            field: FieldNode::new(path.field_name().unwrap_or_default()),
            coordinates: FieldCoordinates::new(type_name, path.field_name().unwrap_or_default()),
            canonical_path: path.clone(),
            path,
        }
    }

    #[test]
    fn starts_with_the_root_only() {
        let graph = MaterializationGraph::new();
        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.contains_point(&OperationPath::root()));
        assert!(!graph.is_connected(&OperationPath::root()));
    }

    #[test]
    fn previous_snapshots_are_untouched() -> Result<(), GraphError> {
        let feature = field(&["feature"], "Query");
        let before = MaterializationGraph::new().with_point(feature.clone().into());
        let after = before.clone().with_edge(
            &feature.path,
            &OperationPath::root(),
            MaterializationEdge::ElementType,
        )?;

        assert_eq!(before.edge_count(), 0);
        assert_eq!(after.edge_count(), 1);
        assert!(after.is_connected(&feature.path));
        assert!(!before.is_connected(&feature.path));

        Ok(())
    }

    #[test]
    fn rejects_edges_closing_a_cycle() -> Result<(), GraphError> {
        let a = field(&["feature"], "Query");
        let b = field(&["feature", "score"], "Feature");
        let graph = MaterializationGraph::new()
            .with_point(a.clone().into())
            .with_point(b.clone().into())
            .with_edge(&b.path, &a.path, MaterializationEdge::ExtractFromSource)?;

        let result = graph.with_edge(&a.path, &b.path, MaterializationEdge::ExtractFromSource);
        assert!(matches!(result, Err(GraphError::CycleDetected(_, _, _))));

        Ok(())
    }

    #[test]
    fn identical_edges_are_added_once() -> Result<(), GraphError> {
        let a = field(&["feature"], "Query");
        let graph = MaterializationGraph::new().with_point(a.clone().into());
        let once = graph.with_edge(&a.path, &OperationPath::root(), MaterializationEdge::ElementType)?;
        let twice = once.clone().with_edge(
            &a.path,
            &OperationPath::root(),
            MaterializationEdge::ElementType,
        )?;

        assert_eq!(once, twice);
        assert_eq!(twice.edge_count(), 1);
        Ok(())
    }

    #[test]
    fn queries_neighbors_in_both_directions() -> Result<(), GraphError> {
        let owner = field(&["feature", "score"], "Feature");
        let argument = ArgumentComponentContext {
            argument: ArgumentNode {
                name: "threshold".to_string(),
                value: Value::Float(0.5),
                fabricated: true,
            },
            field_coordinates: owner.coordinates.clone(),
            path: owner.path.with_argument("threshold"),
            canonical_path: owner.canonical_path.with_argument("threshold"),
        };

        let graph = MaterializationGraph::new()
            .with_point(owner.clone().into())
            .with_point(argument.clone().into())
            .with_edge(
                &argument.path,
                &owner.path,
                MaterializationEdge::DefaultArgumentValueProvided,
            )?;

        assert_eq!(
            graph.successors(&argument.path),
            vec![(&owner.path, MaterializationEdge::DefaultArgumentValueProvided)]
        );
        assert_eq!(
            graph.predecessors(&owner.path),
            vec![(&argument.path, MaterializationEdge::DefaultArgumentValueProvided)]
        );
        assert!(graph.is_acyclic());
        let order = graph.topological_order()?;
        let position = |path: &OperationPath| order.iter().position(|p| *p == path);
        assert!(position(&argument.path) < position(&owner.path));
        Ok(())
    }

    #[test]
    fn unknown_vertices_are_reported() {
        let result = MaterializationGraph::new().with_edge(
            &OperationPath::of_fields(["missing"]),
            &OperationPath::root(),
            MaterializationEdge::ElementType,
        );
        assert!(matches!(result, Err(GraphError::VertexNotFound(_))));
    }
}
