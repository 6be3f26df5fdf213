pub mod alias;
pub mod coordinates;
pub mod directives;
pub mod error;
pub mod namespace;
pub mod schema;
pub mod sources;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::{
    metamodel::{
        alias::AliasRegistry,
        coordinates::FieldCoordinates,
        directives::index_directive_metadata,
        error::MetamodelError,
        namespace::{ElementType, Namespace},
        schema::{SchemaArgument, SchemaDocument, SchemaField, SchemaIndex},
        sources::{DomainSource, FeatureCalculator, TransformerSource},
    },
    path::OperationPath,
    utils::{matching::NameMatcher, parsing::safe_parse_schema},
};

static NEXT_METAMODEL_VERSION: AtomicU64 = AtomicU64::new(1);

type CanonicalPathMap = BTreeMap<OperationPath, BTreeSet<FieldCoordinates>>;
type PathsByCoordinates = FxHashMap<FieldCoordinates, BTreeSet<OperationPath>>;

/// Read-only index of the schema, partitioned into the transformer,
/// data-element and feature namespaces.
///
/// Built once and shared (behind an `Arc`) by every planning run.
#[derive(Debug)]
pub struct MaterializationMetamodel {
    version: u64,
    created_at: SystemTime,
    schema: SchemaIndex,
    element_types: Vec<ElementType>,
    canonical_paths: CanonicalPathMap,
    paths_by_coordinates: PathsByCoordinates,
    domain_sources: FxHashMap<FieldCoordinates, Arc<DomainSource>>,
    feature_calculators: FxHashMap<FieldCoordinates, Arc<FeatureCalculator>>,
    transformer_sources: FxHashMap<FieldCoordinates, Arc<TransformerSource>>,
    /// Domain source coordinates to the name of their staleness companion field
    last_updated_fields: FxHashMap<FieldCoordinates, String>,
    aliases: AliasRegistry,
}

pub struct MetamodelBuilder {
    document: SchemaDocument,
    element_type_fields: BTreeMap<Namespace, String>,
    domain_sources: Vec<(FieldCoordinates, String)>,
    feature_calculators: Vec<(FieldCoordinates, String, FieldCoordinates)>,
    transformer_sources: Vec<(FieldCoordinates, String)>,
    last_updated_fields: Vec<(FieldCoordinates, String)>,
    aliases: AliasRegistry,
}

impl MetamodelBuilder {
    pub fn new(document: SchemaDocument) -> Self {
        Self {
            document,
            element_type_fields: Namespace::ALL
                .iter()
                .map(|ns| (*ns, ns.default_field_name().to_string()))
                .collect(),
            domain_sources: vec![],
            feature_calculators: vec![],
            transformer_sources: vec![],
            last_updated_fields: vec![],
            aliases: AliasRegistry::default(),
        }
    }

    pub fn from_sdl(sdl: &str) -> Result<Self, MetamodelError> {
        let document =
            safe_parse_schema(sdl).map_err(|e| MetamodelError::SchemaParse(e.to_string()))?;

        Ok(Self::new(document))
    }

    /// Overrides the name of a namespace's umbrella field on the query root.
    pub fn element_type_field(mut self, namespace: Namespace, field_name: &str) -> Self {
        self.element_type_fields
            .insert(namespace, field_name.to_string());
        self
    }

    pub fn domain_source(mut self, coordinates: FieldCoordinates, name: &str) -> Self {
        self.domain_sources.push((coordinates, name.to_string()));
        self
    }

    pub fn feature_calculator(
        mut self,
        coordinates: FieldCoordinates,
        name: &str,
        transformer_source: FieldCoordinates,
    ) -> Self {
        self.feature_calculators
            .push((coordinates, name.to_string(), transformer_source));
        self
    }

    pub fn transformer_source(mut self, coordinates: FieldCoordinates, name: &str) -> Self {
        self.transformer_sources.push((coordinates, name.to_string()));
        self
    }

    pub fn last_updated_field(mut self, domain: FieldCoordinates, field_name: &str) -> Self {
        self.last_updated_fields.push((domain, field_name.to_string()));
        self
    }

    pub fn field_alias(mut self, coordinates: FieldCoordinates, alias: &str) -> Self {
        self.aliases.register_field_alias(coordinates, alias);
        self
    }

    pub fn argument_alias(
        mut self,
        coordinates: FieldCoordinates,
        argument_name: &str,
        alias: &str,
    ) -> Self {
        self.aliases
            .register_argument_alias(coordinates, argument_name, alias);
        self
    }

    #[instrument(level = "trace", skip(self), name = "build_metamodel")]
    pub fn build(self) -> Result<MaterializationMetamodel, MetamodelError> {
        let schema = SchemaIndex::from_document(&self.document)?;
        let element_types = Self::resolve_element_types(&schema, &self.element_type_fields)?;
        let (canonical_paths, paths_by_coordinates) = index_canonical_paths(&schema);

        debug!(
            "indexed {} canonical field paths from query type '{}'",
            canonical_paths.len(),
            schema.query_type
        );

        let locate = |coordinates: &FieldCoordinates, namespace: Namespace| {
            locate_source(
                &schema,
                &element_types,
                &paths_by_coordinates,
                coordinates,
                namespace,
            )
        };

        let mut domain_sources = FxHashMap::default();
        for (coordinates, name) in self.domain_sources.iter() {
            let (path, field) = locate(coordinates, Namespace::DataElement)?;
            trace!("registered domain source '{}' at {}", name, path);
            domain_sources.insert(
                coordinates.clone(),
                Arc::new(DomainSource {
                    name: name.clone(),
                    coordinates: coordinates.clone(),
                    path,
                    output_type: field.output_type_name().to_string(),
                    arguments: field.arguments.clone(),
                }),
            );
        }

        let mut transformer_sources = FxHashMap::default();
        for (coordinates, name) in self.transformer_sources.iter() {
            let (path, field) = locate(coordinates, Namespace::Transformer)?;
            trace!("registered transformer source '{}' at {}", name, path);
            transformer_sources.insert(
                coordinates.clone(),
                Arc::new(TransformerSource {
                    name: name.clone(),
                    coordinates: coordinates.clone(),
                    path,
                    arguments: field.arguments.clone(),
                }),
            );
        }

        let mut feature_calculators = FxHashMap::default();
        for (coordinates, name, transformer_source) in self.feature_calculators.iter() {
            let (path, field) = locate(coordinates, Namespace::Feature)?;
            if schema.field(transformer_source).is_none() {
                return Err(MetamodelError::FieldNotFound(transformer_source.clone()));
            }
            trace!("registered feature calculator '{}' at {}", name, path);
            feature_calculators.insert(
                coordinates.clone(),
                Arc::new(FeatureCalculator {
                    name: name.clone(),
                    coordinates: coordinates.clone(),
                    path,
                    arguments: field.arguments.clone(),
                    transformer_source: transformer_source.clone(),
                }),
            );
        }

        let mut aliases = self.aliases;
        let mut last_updated_fields: FxHashMap<FieldCoordinates, String> = self
            .last_updated_fields
            .into_iter()
            .collect();

        let directive_metadata = index_directive_metadata(&schema);
        for (coordinates, alias) in directive_metadata.field_aliases {
            aliases.register_field_alias(coordinates, alias);
        }
        for (coordinates, argument_name, alias) in directive_metadata.argument_aliases {
            aliases.register_argument_alias(coordinates, argument_name, alias);
        }
        for flagged in directive_metadata.last_updated_fields {
            for domain in domain_sources
                .values()
                .filter(|d: &&Arc<DomainSource>| d.output_type == flagged.type_name)
            {
                last_updated_fields
                    .entry(domain.coordinates.clone())
                    .or_insert_with(|| flagged.field_name.clone());
            }
        }

        Ok(MaterializationMetamodel {
            version: NEXT_METAMODEL_VERSION.fetch_add(1, Ordering::Relaxed),
            created_at: SystemTime::now(),
            schema,
            element_types,
            canonical_paths,
            paths_by_coordinates,
            domain_sources,
            feature_calculators,
            transformer_sources,
            last_updated_fields,
            aliases,
        })
    }

    fn resolve_element_types(
        schema: &SchemaIndex,
        names: &BTreeMap<Namespace, String>,
    ) -> Result<Vec<ElementType>, MetamodelError> {
        let query_type = schema
            .get_type(&schema.query_type)
            .ok_or_else(|| MetamodelError::MissingQueryType(schema.query_type.clone()))?;

        Namespace::ALL
            .iter()
            .map(|namespace| {
                let field_name = names
                    .get(namespace)
                    .map(String::as_str)
                    .unwrap_or_else(|| namespace.default_field_name());
                let field = query_type.field(field_name).ok_or_else(|| {
                    MetamodelError::MissingElementType(*namespace, field_name.to_string())
                })?;
                let coordinates = FieldCoordinates::new(&query_type.name, field_name);

                if !schema.is_composite(field.output_type_name()) {
                    return Err(MetamodelError::ElementTypeNotComposite(coordinates));
                }

                Ok(ElementType {
                    namespace: *namespace,
                    coordinates,
                    path: OperationPath::of_fields([field_name]),
                    output_type: field.output_type_name().to_string(),
                })
            })
            .collect()
    }
}

fn locate_source<'s>(
    schema: &'s SchemaIndex,
    element_types: &[ElementType],
    paths_by_coordinates: &PathsByCoordinates,
    coordinates: &FieldCoordinates,
    namespace: Namespace,
) -> Result<(OperationPath, &'s SchemaField), MetamodelError> {
    let field = schema
        .field(coordinates)
        .ok_or_else(|| MetamodelError::FieldNotFound(coordinates.clone()))?;
    let root = &element_types[namespace as usize].path;
    let path = shortest_path_under(paths_by_coordinates, coordinates, root)
        .ok_or_else(|| MetamodelError::UnreachableSource(coordinates.clone(), namespace))?;

    Ok((path.clone(), field))
}

fn shortest_path_under<'a>(
    paths_by_coordinates: &'a PathsByCoordinates,
    coordinates: &FieldCoordinates,
    ancestor: &OperationPath,
) -> Option<&'a OperationPath> {
    paths_by_coordinates
        .get(coordinates)?
        .iter()
        .filter(|path| ancestor.is_ancestor_of(path))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

/// Walks the schema from the query root and records every canonical field
/// path. A type already being walked on the current branch is not entered
/// again, so recursive types terminate.
fn index_canonical_paths(schema: &SchemaIndex) -> (CanonicalPathMap, PathsByCoordinates) {
    fn walk(
        schema: &SchemaIndex,
        parent: &OperationPath,
        type_name: &str,
        visiting: &mut Vec<String>,
        canonical_paths: &mut CanonicalPathMap,
        paths_by_coordinates: &mut PathsByCoordinates,
    ) {
        if visiting.iter().any(|t| t == type_name) {
            return;
        }
        visiting.push(type_name.to_string());

        for (field_name, coordinates) in schema.selectable_fields(type_name) {
            let path = parent.with_field(field_name);

            let output_types: BTreeSet<String> = coordinates
                .iter()
                .filter_map(|c| schema.field(c))
                .map(|f| f.output_type_name().to_string())
                .collect();

            for c in coordinates.iter() {
                paths_by_coordinates
                    .entry(c.clone())
                    .or_default()
                    .insert(path.clone());
            }
            canonical_paths
                .entry(path.clone())
                .or_default()
                .extend(coordinates);

            for output_type in output_types.iter() {
                if schema.is_composite(output_type) {
                    walk(
                        schema,
                        &path,
                        output_type,
                        visiting,
                        canonical_paths,
                        paths_by_coordinates,
                    );
                }
            }
        }

        visiting.pop();
    }

    let mut canonical_paths = CanonicalPathMap::new();
    let mut paths_by_coordinates = PathsByCoordinates::default();
    walk(
        schema,
        &OperationPath::root(),
        &schema.query_type,
        &mut vec![],
        &mut canonical_paths,
        &mut paths_by_coordinates,
    );

    (canonical_paths, paths_by_coordinates)
}

impl MaterializationMetamodel {
    pub fn builder(document: SchemaDocument) -> MetamodelBuilder {
        MetamodelBuilder::new(document)
    }

    /// Process-unique, increasing with every metamodel built.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn query_type(&self) -> &str {
        &self.schema.query_type
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    pub fn element_type(&self, namespace: Namespace) -> &ElementType {
        // resolve_element_types produces one entry per namespace, in declaration order
        &self.element_types[namespace as usize]
    }

    pub fn element_types(&self) -> impl Iterator<Item = &ElementType> {
        self.element_types.iter()
    }

    /// The namespace whose umbrella field has these coordinates.
    pub fn element_type_namespace(&self, coordinates: &FieldCoordinates) -> Option<Namespace> {
        self.element_types
            .iter()
            .find(|e| &e.coordinates == coordinates)
            .map(|e| e.namespace)
    }

    /// The namespace whose umbrella path is an ancestor of `canonical_path`.
    pub fn namespace_of(&self, canonical_path: &OperationPath) -> Option<Namespace> {
        self.element_types
            .iter()
            .find(|e| e.path.is_ancestor_of(canonical_path))
            .map(|e| e.namespace)
    }

    pub fn field_definition(&self, coordinates: &FieldCoordinates) -> Option<&SchemaField> {
        self.schema.field(coordinates)
    }

    pub fn argument_definition(
        &self,
        coordinates: &FieldCoordinates,
        argument_name: &str,
    ) -> Option<&SchemaArgument> {
        self.schema
            .field(coordinates)
            .and_then(|f| f.argument(argument_name))
    }

    pub fn output_type_name(&self, coordinates: &FieldCoordinates) -> Option<&str> {
        self.schema
            .field(coordinates)
            .map(|f| f.output_type_name())
    }

    pub fn is_composite_output(&self, coordinates: &FieldCoordinates) -> bool {
        self.output_type_name(coordinates)
            .is_some_and(|t| self.schema.is_composite(t))
    }

    /// Coordinates realising a canonical path. Abstract parents make this a set.
    pub fn field_coordinates(
        &self,
        canonical_path: &OperationPath,
    ) -> Option<&BTreeSet<FieldCoordinates>> {
        self.canonical_paths.get(canonical_path)
    }

    pub fn canonical_paths(&self) -> impl Iterator<Item = &OperationPath> {
        self.canonical_paths.keys()
    }

    /// The shortest canonical path realising `coordinates` at or under `ancestor`.
    pub fn first_path_under(
        &self,
        coordinates: &FieldCoordinates,
        ancestor: &OperationPath,
    ) -> Option<&OperationPath> {
        shortest_path_under(&self.paths_by_coordinates, coordinates, ancestor)
    }

    pub fn domain_source(&self, coordinates: &FieldCoordinates) -> Option<&Arc<DomainSource>> {
        self.domain_sources.get(coordinates)
    }

    pub fn domain_sources(&self) -> impl Iterator<Item = &Arc<DomainSource>> {
        self.domain_sources.values()
    }

    pub fn feature_calculator(
        &self,
        coordinates: &FieldCoordinates,
    ) -> Option<&Arc<FeatureCalculator>> {
        self.feature_calculators.get(coordinates)
    }

    pub fn transformer_source(
        &self,
        coordinates: &FieldCoordinates,
    ) -> Option<&Arc<TransformerSource>> {
        self.transformer_sources.get(coordinates)
    }

    pub fn last_updated_field(&self, domain: &FieldCoordinates) -> Option<&str> {
        self.last_updated_fields.get(domain).map(String::as_str)
    }

    /// Names a caller may use to reference a domain: the field name, its
    /// aliases and the registered source name.
    pub fn domain_names<'a>(&'a self, domain: &'a DomainSource) -> Vec<&'a str> {
        let mut names = self.aliases.field_names(&domain.coordinates);
        if !names.contains(&domain.name.as_str()) {
            names.push(&domain.name);
        }
        names
    }

    /// The most specific domain source at or above `canonical_path`.
    pub fn domain_root_of(
        &self,
        canonical_path: &OperationPath,
    ) -> Option<(OperationPath, &Arc<DomainSource>)> {
        let ancestors: Vec<OperationPath> = canonical_path.ancestors().collect();

        ancestors.into_iter().rev().find_map(|ancestor| {
            let domain = self
                .canonical_paths
                .get(&ancestor)?
                .iter()
                .find_map(|c| self.domain_sources.get(c))?;
            Some((ancestor, domain))
        })
    }

    /// All names a field at `canonical_path` answers to: the field name and
    /// the aliases of every coordinate realising it.
    pub fn field_names<'a>(&'a self, canonical_path: &'a OperationPath) -> Vec<&'a str> {
        let mut names: Vec<&str> = canonical_path.field_name().into_iter().collect();

        for coordinates in self.canonical_paths.get(canonical_path).into_iter().flatten() {
            for alias in self.aliases.field_aliases(coordinates) {
                if !names.contains(&alias) {
                    names.push(alias);
                }
            }
        }

        names
    }

    /// Canonical field paths inside `namespace` (its umbrella excluded) whose
    /// name or one of whose aliases matches any of `names`.
    pub fn field_paths_matching(
        &self,
        namespace: Namespace,
        names: &[&str],
        matcher: NameMatcher,
    ) -> Vec<&OperationPath> {
        let root = &self.element_type(namespace).path;

        self.canonical_paths
            .keys()
            .filter(|path| *path != root && root.is_ancestor_of(path))
            .filter(|path| {
                self.field_names(path)
                    .iter()
                    .any(|candidate| names.iter().any(|name| matcher.matches(name, candidate)))
            })
            .collect()
    }

    /// Canonical argument paths, across all namespaces, whose argument name
    /// or alias matches `name`.
    pub fn argument_paths_matching(&self, name: &str, matcher: NameMatcher) -> Vec<OperationPath> {
        let mut found = BTreeSet::new();

        for (path, coordinates) in self.canonical_paths.iter() {
            for c in coordinates.iter() {
                let Some(field) = self.schema.field(c) else {
                    continue;
                };
                for argument in field.arguments.iter() {
                    if self
                        .aliases
                        .argument_names(c, &argument.name)
                        .iter()
                        .any(|candidate| matcher.matches(name, candidate))
                    {
                        found.insert(path.with_argument(&argument.name));
                    }
                }
            }
        }

        found.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        metamodel::{
            coordinates::FieldCoordinates, error::MetamodelError, namespace::Namespace,
            MetamodelBuilder,
        },
        path::OperationPath,
        tests::testkit::{build_metamodel, init_logger},
        utils::matching::NameMatcher,
    };

    #[test]
    fn element_types_resolve_on_query_root() {
        init_logger();
        let metamodel = build_metamodel();

        let data_element = metamodel.element_type(Namespace::DataElement);
        assert_eq!(data_element.coordinates, FieldCoordinates::new("Query", "dataElement"));
        assert_eq!(data_element.output_type, "DataElement");
        assert_eq!(
            metamodel.namespace_of(&OperationPath::of_fields(["feature", "score"])),
            Some(Namespace::Feature)
        );
        assert_eq!(
            metamodel.element_type_namespace(&FieldCoordinates::new("Query", "transformer")),
            Some(Namespace::Transformer)
        );
    }

    #[test]
    fn canonical_paths_cover_nested_domains() {
        let metamodel = build_metamodel();
        let path = OperationPath::of_fields(["dataElement", "account", "owner", "age"]);

        assert!(metamodel
            .field_coordinates(&path)
            .is_some_and(|c| c.contains(&FieldCoordinates::new("Person", "age"))));

        let (domain_path, domain) = metamodel
            .domain_root_of(&path)
            .expect("domain should be found");
        assert_eq!(domain.name, "account");
        assert_eq!(domain_path, OperationPath::of_fields(["dataElement", "account"]));
    }

    #[test]
    fn first_path_under_prefers_the_shortest() {
        let metamodel = build_metamodel();
        let age = FieldCoordinates::new("Person", "age");

        assert_eq!(
            metamodel.first_path_under(&age, &OperationPath::of_fields(["dataElement"])),
            Some(&OperationPath::of_fields(["dataElement", "person", "age"]))
        );
        assert_eq!(
            metamodel.first_path_under(&age, &OperationPath::of_fields(["dataElement", "account"])),
            Some(&OperationPath::of_fields([
                "dataElement",
                "account",
                "owner",
                "age"
            ]))
        );
    }

    #[test]
    fn directive_metadata_is_indexed() {
        let metamodel = build_metamodel();

        assert_eq!(
            metamodel.last_updated_field(&FieldCoordinates::new("DataElement", "person")),
            Some("lastUpdated")
        );
        assert_eq!(
            metamodel.field_paths_matching(
                Namespace::DataElement,
                &["minimumScore"],
                NameMatcher::default()
            ),
            vec![
                &OperationPath::of_fields(["dataElement", "account", "owner", "minScore"]),
                &OperationPath::of_fields(["dataElement", "person", "minScore"]),
            ]
        );
        assert_eq!(
            metamodel
                .aliases()
                .argument_names(&FieldCoordinates::new("Feature", "score"), "threshold"),
            vec!["threshold", "minScore"]
        );
    }

    #[test]
    fn malformed_directive_metadata_is_skipped() {
        init_logger();
        let metamodel = MetamodelBuilder::from_sdl(
            r#"
            type Query { transformer: T dataElement: D feature: F }
            type T { noop: Int }
            type D { thing: Thing }
            type Thing { value: Int @alias(name: 42) other: Int @alias }
            type F { noop: Int }
            "#,
        )
        .expect("schema should parse")
        .build()
        .expect("metamodel should build");

        assert!(metamodel.aliases().is_empty());
    }

    #[test]
    fn missing_element_type_fails_the_build() {
        let error = MetamodelBuilder::from_sdl("type Query { dataElement: D feature: F } type D { a: Int } type F { b: Int }")
            .expect("schema should parse")
            .build()
            .expect_err("transformer umbrella is missing");

        assert!(matches!(
            error,
            MetamodelError::MissingElementType(Namespace::Transformer, _)
        ));
    }

    #[test]
    fn unknown_registration_fails_the_build() {
        let error = MetamodelBuilder::from_sdl(
            "type Query { transformer: T dataElement: D feature: F } type T { a: Int } type D { a: Int } type F { b: Int }",
        )
        .expect("schema should parse")
        .domain_source(FieldCoordinates::new("D", "missing"), "missing")
        .build()
        .expect_err("registration points at an unknown field");

        assert!(matches!(error, MetamodelError::FieldNotFound(_)));
    }

    #[test]
    fn versions_increase() {
        let first = build_metamodel();
        let second = build_metamodel();
        assert!(second.version() > first.version());
    }

    #[test]
    fn field_names_cover_the_path_and_aliases() {
        let metamodel = build_metamodel();
        let path = OperationPath::of_fields([
            "dataElement",
            "person",
            "minScore",
        ]);
        let names = metamodel.field_names(&path);
        assert_eq!(names, vec!["minScore", "minimumScore"]);

        let path = OperationPath::of_fields(["dataElement", "person", "age"]);
        let names = metamodel.field_names(&path);
        assert_eq!(names, vec!["age"]);
    }
}
