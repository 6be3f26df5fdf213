use std::collections::{BTreeMap, BTreeSet};

use graphql_parser::schema::{self as input, Definition, Directive, Type, TypeDefinition, Value};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::metamodel::{coordinates::FieldCoordinates, error::MetamodelError};

pub type SchemaDocument = input::Document<'static, String>;
pub type ConstValue = Value<'static, String>;

static DEFAULT_QUERY_TYPE: &str = "Query";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    InputObject,
    Object,
    Interface,
    Union,
}

impl TypeKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }
}

pub trait TypeHelpers {
    fn named_type(&self) -> &str;
}

impl TypeHelpers for Type<'static, String> {
    fn named_type(&self) -> &str {
        match self {
            Type::NamedType(name) => name,
            Type::ListType(child) => child.named_type(),
            Type::NonNullType(child) => child.named_type(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SchemaArgument {
    pub name: String,
    pub value_type: Type<'static, String>,
    pub default_value: Option<ConstValue>,
    pub directives: Vec<Directive<'static, String>>,
}

impl SchemaArgument {
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct SchemaField {
    pub name: String,
    pub output_type: Type<'static, String>,
    pub arguments: Vec<SchemaArgument>,
    pub directives: Vec<Directive<'static, String>>,
}

impl SchemaField {
    pub fn output_type_name(&self) -> &str {
        self.output_type.named_type()
    }

    pub fn argument(&self, name: &str) -> Option<&SchemaArgument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct SchemaType {
    pub name: String,
    pub kind: TypeKind,
    pub fields: Vec<SchemaField>,
    /// Interfaces implemented by an object or interface type
    pub interfaces: Vec<String>,
    /// Members of a union type
    pub members: Vec<String>,
}

impl SchemaType {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Owned, lookup-friendly view over a parsed schema document.
#[derive(Debug)]
pub struct SchemaIndex {
    pub query_type: String,
    types: FxHashMap<String, SchemaType>,
    /// Object types that can stand in for an abstract type
    possible_types: FxHashMap<String, BTreeSet<String>>,
}

impl SchemaIndex {
    pub fn from_document(document: &SchemaDocument) -> Result<Self, MetamodelError> {
        let mut query_type = None;
        let mut types: FxHashMap<String, SchemaType> = FxHashMap::default();

        for definition in document.definitions.iter() {
            match definition {
                Definition::SchemaDefinition(schema_definition) => {
                    query_type = schema_definition.query.clone();
                }
                Definition::TypeDefinition(type_definition) => {
                    let schema_type = Self::index_type_definition(type_definition);
                    types.insert(schema_type.name.clone(), schema_type);
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {
                    trace!("skipping definition that does not contribute types");
                }
            }
        }

        let query_type = query_type.unwrap_or_else(|| DEFAULT_QUERY_TYPE.to_string());

        if !types
            .get(&query_type)
            .is_some_and(|t| t.kind == TypeKind::Object)
        {
            return Err(MetamodelError::MissingQueryType(query_type));
        }

        let possible_types = Self::build_possible_types(&types);

        Ok(Self {
            query_type,
            types,
            possible_types,
        })
    }

    fn index_type_definition(type_definition: &TypeDefinition<'static, String>) -> SchemaType {
        let index_fields = |fields: &Vec<input::Field<'static, String>>| {
            fields
                .iter()
                .map(|field| SchemaField {
                    name: field.name.clone(),
                    output_type: field.field_type.clone(),
                    arguments: field
                        .arguments
                        .iter()
                        .map(|argument| SchemaArgument {
                            name: argument.name.clone(),
                            value_type: argument.value_type.clone(),
                            default_value: argument.default_value.clone(),
                            directives: argument.directives.clone(),
                        })
                        .collect(),
                    directives: field.directives.clone(),
                })
                .collect::<Vec<_>>()
        };

        let empty = |name: &String, kind: TypeKind| SchemaType {
            name: name.clone(),
            kind,
            fields: vec![],
            interfaces: vec![],
            members: vec![],
        };

        match type_definition {
            TypeDefinition::Scalar(scalar) => empty(&scalar.name, TypeKind::Scalar),
            TypeDefinition::Enum(enum_type) => empty(&enum_type.name, TypeKind::Enum),
            TypeDefinition::InputObject(input_object) => {
                empty(&input_object.name, TypeKind::InputObject)
            }
            TypeDefinition::Object(object) => SchemaType {
                fields: index_fields(&object.fields),
                interfaces: object.implements_interfaces.clone(),
                ..empty(&object.name, TypeKind::Object)
            },
            TypeDefinition::Interface(interface) => SchemaType {
                fields: index_fields(&interface.fields),
                interfaces: interface.implements_interfaces.clone(),
                ..empty(&interface.name, TypeKind::Interface)
            },
            TypeDefinition::Union(union_type) => SchemaType {
                members: union_type.types.clone(),
                ..empty(&union_type.name, TypeKind::Union)
            },
        }
    }

    fn build_possible_types(
        types: &FxHashMap<String, SchemaType>,
    ) -> FxHashMap<String, BTreeSet<String>> {
        let mut possible_types: FxHashMap<String, BTreeSet<String>> = FxHashMap::default();

        for schema_type in types.values() {
            match schema_type.kind {
                TypeKind::Object => {
                    for interface in schema_type.interfaces.iter() {
                        possible_types
                            .entry(interface.clone())
                            .or_default()
                            .insert(schema_type.name.clone());
                    }
                }
                TypeKind::Union => {
                    possible_types
                        .entry(schema_type.name.clone())
                        .or_default()
                        .extend(schema_type.members.iter().cloned());
                }
                _ => {}
            }
        }

        possible_types
    }

    pub fn get_type(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    pub fn field(&self, coordinates: &FieldCoordinates) -> Option<&SchemaField> {
        self.types
            .get(&coordinates.type_name)
            .and_then(|t| t.field(&coordinates.field_name))
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.kind.is_composite())
    }

    /// Every field selectable on `type_name`, directly or through one of its
    /// possible types, together with the coordinates realising it.
    pub fn selectable_fields(&self, type_name: &str) -> BTreeMap<&str, BTreeSet<FieldCoordinates>> {
        let mut selectable: BTreeMap<&str, BTreeSet<FieldCoordinates>> = BTreeMap::new();

        let own = self.types.get(type_name).into_iter();
        let possible = self
            .possible_types
            .get(type_name)
            .into_iter()
            .flatten()
            .filter_map(|name| self.types.get(name));

        for schema_type in own.chain(possible) {
            for field in schema_type.fields.iter() {
                selectable
                    .entry(field.name.as_str())
                    .or_default()
                    .insert(FieldCoordinates::new(&schema_type.name, &field.name));
            }
        }

        selectable
    }

    pub fn types(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.values()
    }
}
