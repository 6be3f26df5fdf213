use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use rustc_hash::FxHashMap;

use crate::{
    context::{ComponentContext, FieldComponentContext},
    graph::{edge::MaterializationEdge, MaterializationGraph},
    metamodel::{coordinates::FieldCoordinates, namespace::Namespace, MaterializationMetamodel},
    path::OperationPath,
    planner::{
        callable::{
            DataElementCallableBuilder, FeatureCalculatorCallableBuilder,
            TransformerCallableBuilder,
        },
        error::PlanningError,
    },
    request::RequestInputs,
    utils::matching::NameMatcher,
};

#[derive(Clone, Debug, Default)]
struct PlanIndexes {
    /// Materialized paths currently realising a schema coordinate
    paths_by_coordinates: FxHashMap<FieldCoordinates, BTreeSet<OperationPath>>,
    /// First materialized path recorded for a canonical path
    canonical_to_materialized: BTreeMap<OperationPath, OperationPath>,
    /// Every materialized path recorded for a canonical path, in insertion order
    materialized_by_canonical: BTreeMap<OperationPath, Vec<OperationPath>>,
    data_element_builders: BTreeMap<OperationPath, DataElementCallableBuilder>,
    feature_builders: BTreeMap<OperationPath, FeatureCalculatorCallableBuilder>,
    transformer_builders: BTreeMap<OperationPath, TransformerCallableBuilder>,
}

/// Accumulator of the connector fold.
///
/// A persistent value: cloning is cheap, and every `with_*` call returns an
/// updated context while earlier clones keep seeing the state they captured.
#[derive(Clone)]
pub struct PlannerContext {
    metamodel: Arc<MaterializationMetamodel>,
    inputs: Arc<RequestInputs>,
    matcher: NameMatcher,
    graph: MaterializationGraph,
    indexes: Arc<PlanIndexes>,
}

impl PlannerContext {
    pub fn new(
        metamodel: Arc<MaterializationMetamodel>,
        inputs: RequestInputs,
        matcher: NameMatcher,
    ) -> Self {
        Self {
            metamodel,
            inputs: Arc::new(inputs),
            matcher,
            graph: MaterializationGraph::new(),
            indexes: Arc::new(PlanIndexes::default()),
        }
    }

    pub fn metamodel(&self) -> &MaterializationMetamodel {
        &self.metamodel
    }

    pub fn inputs(&self) -> &RequestInputs {
        &self.inputs
    }

    pub fn matcher(&self) -> NameMatcher {
        self.matcher
    }

    pub fn graph(&self) -> &MaterializationGraph {
        &self.graph
    }

    /// Adds the vertex and records the path in the coordinate and canonical
    /// indexes.
    pub fn with_point(mut self, component: ComponentContext) -> Self {
        let indexes = Arc::make_mut(&mut self.indexes);
        let canonical = component.canonical_path().clone();
        let materialized = component.path().clone();

        if let ComponentContext::Field(field) = &component {
            indexes
                .paths_by_coordinates
                .entry(field.coordinates.clone())
                .or_default()
                .insert(materialized.clone());
        }

        indexes
            .canonical_to_materialized
            .entry(canonical.clone())
            .or_insert_with(|| materialized.clone());

        let recorded = indexes.materialized_by_canonical.entry(canonical).or_default();
        if !recorded.contains(&materialized) {
            recorded.push(materialized);
        }

        self.graph = self.graph.with_point(component);
        self
    }

    pub fn with_edge(
        mut self,
        from: &OperationPath,
        to: &OperationPath,
        edge: MaterializationEdge,
    ) -> Result<Self, PlanningError> {
        self.graph = self.graph.with_edge(from, to, edge)?;
        Ok(self)
    }

    pub fn with_data_element_builder(mut self, builder: DataElementCallableBuilder) -> Self {
        Arc::make_mut(&mut self.indexes)
            .data_element_builders
            .insert(builder.domain_path.clone(), builder);
        self
    }

    pub fn with_feature_builder(mut self, builder: FeatureCalculatorCallableBuilder) -> Self {
        Arc::make_mut(&mut self.indexes)
            .feature_builders
            .insert(builder.path.clone(), builder);
        self
    }

    pub fn with_transformer_builder(mut self, builder: TransformerCallableBuilder) -> Self {
        Arc::make_mut(&mut self.indexes)
            .transformer_builders
            .insert(builder.path.clone(), builder);
        self
    }

    pub fn first_materialized(&self, canonical: &OperationPath) -> Option<&OperationPath> {
        self.indexes.canonical_to_materialized.get(canonical)
    }

    pub fn materialized_paths(&self, canonical: &OperationPath) -> &[OperationPath] {
        self.indexes
            .materialized_by_canonical
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn paths_with_coordinates(&self, coordinates: &FieldCoordinates) -> Vec<&OperationPath> {
        self.indexes
            .paths_by_coordinates
            .get(coordinates)
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn canonical_to_materialized(&self) -> &BTreeMap<OperationPath, OperationPath> {
        &self.indexes.canonical_to_materialized
    }

    /// Materialized path of a namespace umbrella in this request.
    pub fn element_type_path(&self, namespace: Namespace) -> Result<&OperationPath, PlanningError> {
        self.first_materialized(&self.metamodel.element_type(namespace).path)
            .ok_or(PlanningError::MissingElementType(namespace))
    }

    pub fn field_at(&self, path: &OperationPath) -> Option<&FieldComponentContext> {
        self.graph.get_point(path).and_then(ComponentContext::as_field)
    }

    pub fn data_element_builder(&self, path: &OperationPath) -> Option<&DataElementCallableBuilder> {
        self.indexes.data_element_builders.get(path)
    }

    /// Path of the closest data-element builder at or above `path`.
    pub fn nearest_data_element_builder(&self, path: &OperationPath) -> Option<OperationPath> {
        let ancestors: Vec<OperationPath> = path.ancestors().collect();
        ancestors
            .into_iter()
            .rev()
            .find(|ancestor| self.indexes.data_element_builders.contains_key(ancestor))
    }

    pub fn feature_builder(&self, path: &OperationPath) -> Option<&FeatureCalculatorCallableBuilder> {
        self.indexes.feature_builders.get(path)
    }

    pub fn transformer_builder(&self, path: &OperationPath) -> Option<&TransformerCallableBuilder> {
        self.indexes.transformer_builders.get(path)
    }

    /// The first selected transformer bound to the given source coordinates.
    pub fn transformer_path_for(&self, coordinates: &FieldCoordinates) -> Option<&OperationPath> {
        self.indexes
            .transformer_builders
            .iter()
            .find(|(_, builder)| &builder.source.coordinates == coordinates)
            .map(|(path, _)| path)
    }

    pub fn data_element_builders(&self) -> &BTreeMap<OperationPath, DataElementCallableBuilder> {
        &self.indexes.data_element_builders
    }

    pub fn feature_builders(&self) -> &BTreeMap<OperationPath, FeatureCalculatorCallableBuilder> {
        &self.indexes.feature_builders
    }

    pub fn transformer_builders(&self) -> &BTreeMap<OperationPath, TransformerCallableBuilder> {
        &self.indexes.transformer_builders
    }

    /// Whether a caller-supplied raw input key matches any of `names`.
    pub fn raw_input_supplies<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        self.matcher
            .any_in(names, &self.inputs.raw_input_context_keys)
    }

    pub fn variable_key(&self, name: &str) -> Option<&String> {
        self.matcher.find_in(name, &self.inputs.variable_keys)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        context::{FieldComponentContext, FieldNode},
        metamodel::coordinates::FieldCoordinates,
        path::OperationPath,
        planner::context::PlannerContext,
        request::RequestInputs,
        tests::testkit::build_metamodel,
        utils::matching::NameMatcher,
    };

    fn field(path: OperationPath, coordinates: FieldCoordinates) -> FieldComponentContext {
        FieldComponentContext {
            field: FieldNode::new(&coordinates.field_name),
            canonical_path: path.to_canonical(),
            coordinates,
            path,
        }
    }

    #[test]
    fn canonical_index_keeps_the_first_writer() {
        let context = PlannerContext::new(
            Arc::new(build_metamodel()),
            RequestInputs::default(),
            NameMatcher::default(),
        );
        let coordinates = FieldCoordinates::new("Query", "dataElement");
        let aliased = OperationPath::root().with_aliased_field("dataElement", Some("de"));
        let plain = OperationPath::of_fields(["dataElement"]);

        let before = context.clone();
        let after = context
            .with_point(field(aliased.clone(), coordinates.clone()).into())
            .with_point(field(plain.clone(), coordinates.clone()).into());

        assert_eq!(after.first_materialized(&plain), Some(&aliased));
        assert_eq!(after.materialized_paths(&plain), &[aliased.clone(), plain.clone()]);
        assert_eq!(after.paths_with_coordinates(&coordinates).len(), 2);
        assert_eq!(before.first_materialized(&plain), None);
        assert_eq!(before.graph().vertex_count(), 1);
    }
}
