//! A [`ComplexitySchema`] built from GraphQL SDL.
//!
//! Field costs come from the `@cost(weight:)` directive, 1 by default. The cost of a field's
//! selection set is multiplied by its expected list size: the largest slicing argument declared by
//! `@listSize` and present in the query, then the directive's `assumedSize`, then the default list
//! size for list fields.

mod directives;

use std::{collections::HashMap, ops::Index};

use cynic_parser::{
    common::{OperationType, WrappingType},
    executable::FieldSelection,
    type_system as ast, Value,
};
use indexmap::IndexMap;

use self::directives::{FieldDirectives, ListSize};
use crate::{document::SchemaLookup, ComplexitySchema};

const DEFAULT_FIELD_WEIGHT: usize = 1;
const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Could not parse the schema: {0}")]
    Parse(String),
    #[error("The type '{0}' is defined more than once")]
    DuplicateType(String),
    #[error("Unknown type '{name}' used by {location}")]
    UnknownType { name: String, location: String },
    #[error("'{member}' is a member of the union '{union}' but isn't an object type")]
    InvalidUnionMember { union: String, member: String },
    #[error("'{interface}' is implemented by '{implementor}' but isn't an interface")]
    InvalidInterface { implementor: String, interface: String },
    #[error("Invalid @{directive} directive on {location}: {message}")]
    InvalidDirective {
        directive: &'static str,
        location: String,
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl DefinitionKind {
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            DefinitionKind::Object | DefinitionKind::Interface | DefinitionKind::Union
        )
    }
}

#[derive(Debug)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    fields: IndexMap<String, FieldId>,
    /// Direct interfaces of an object or interface.
    interfaces: Vec<DefinitionId>,
    /// Implementors of an interface, members of a union.
    possible_types: Option<Vec<DefinitionId>>,
}

#[derive(Debug)]
pub struct FieldDefinition {
    pub name: String,
    pub parent: DefinitionId,
    /// The named type, wrappers removed.
    pub ty: DefinitionId,
    pub is_list: bool,
    pub weight: usize,
    pub is_introspection: bool,
    list_size: Option<ListSize>,
    /// For interface fields, the same field on every implementor.
    implementations: Vec<FieldId>,
}

#[derive(Debug, Default)]
pub struct SdlSchema {
    definitions: Vec<Definition>,
    definition_names: HashMap<String, DefinitionId>,
    fields: Vec<FieldDefinition>,
    query_type: Option<DefinitionId>,
    mutation_type: Option<DefinitionId>,
    subscription_type: Option<DefinitionId>,
}

#[derive(Default)]
struct RootTypeNames {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl SdlSchema {
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let document =
            cynic_parser::parse_type_system_document(sdl).map_err(|error| SchemaError::Parse(error.to_string()))?;

        let mut schema = SdlSchema::default();

        for name in BUILTIN_SCALARS {
            schema.insert_definition(name, DefinitionKind::Scalar);
        }

        schema.ingest_definitions(&document)?;
        let root_type_names = schema.ingest_fields(&document)?;
        schema.ingest_root_types(root_type_names)?;
        schema.insert_typename_fields();
        schema.compute_possible_types();
        schema.link_interface_fields();

        tracing::debug!(
            definitions = schema.definitions.len(),
            fields = schema.fields.len(),
            "Loaded schema"
        );

        Ok(schema)
    }

    pub fn definition_id(&self, name: &str) -> Option<DefinitionId> {
        self.definition_names.get(name).copied()
    }

    pub fn field_id(&self, parent: DefinitionId, name: &str) -> Option<FieldId> {
        self[parent].fields.get(name).copied()
    }

    pub fn possible_types(&self, id: DefinitionId) -> Option<&[DefinitionId]> {
        self[id].possible_types.as_deref()
    }

    /// The cost of a field given the cost of its selection set, for the given selections.
    ///
    /// List fields that `@listSize` doesn't cover are assumed to hold `default_list_size` items,
    /// a single one without it.
    pub fn field_complexity(
        &self,
        id: FieldId,
        nodes: &[FieldSelection<'_>],
        child_complexity: usize,
        default_list_size: Option<usize>,
    ) -> usize {
        let field = &self[id];
        let own_complexity = |field: &FieldDefinition| {
            let multiplier = list_multiplier(field, nodes, default_list_size);
            field.weight.saturating_add(multiplier.saturating_mul(child_complexity))
        };

        field
            .implementations
            .iter()
            .map(|id| own_complexity(&self[*id]))
            .fold(own_complexity(field), usize::max)
    }

    fn insert_definition(&mut self, name: &str, kind: DefinitionKind) -> DefinitionId {
        let id = DefinitionId(self.definitions.len());

        self.definitions.push(Definition {
            name: name.to_owned(),
            kind,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            possible_types: match kind {
                DefinitionKind::Interface | DefinitionKind::Union => Some(Vec::new()),
                _ => None,
            },
        });
        self.definition_names.insert(name.to_owned(), id);

        id
    }

    fn ingest_definitions(&mut self, document: &ast::TypeSystemDocument) -> Result<(), SchemaError> {
        for definition in document.definitions() {
            match definition {
                ast::Definition::Type(typedef) => {
                    if self.definition_names.contains_key(typedef.name()) {
                        if BUILTIN_SCALARS.contains(&typedef.name()) {
                            continue;
                        }
                        return Err(SchemaError::DuplicateType(typedef.name().to_owned()));
                    }
                    self.insert_definition(typedef.name(), definition_kind(&typedef));
                }
                ast::Definition::TypeExtension(typedef) => {
                    if !self.definition_names.contains_key(typedef.name()) {
                        self.insert_definition(typedef.name(), definition_kind(&typedef));
                    }
                }
                _ => (),
            }
        }

        Ok(())
    }

    fn ingest_fields(&mut self, document: &ast::TypeSystemDocument) -> Result<RootTypeNames, SchemaError> {
        let mut root_type_names = RootTypeNames::default();

        for definition in document.definitions() {
            match definition {
                ast::Definition::Schema(schema) | ast::Definition::SchemaExtension(schema) => {
                    if let Some(query) = schema.query_type() {
                        root_type_names.query = Some(query.named_type().to_owned());
                    }
                    if let Some(mutation) = schema.mutation_type() {
                        root_type_names.mutation = Some(mutation.named_type().to_owned());
                    }
                    if let Some(subscription) = schema.subscription_type() {
                        root_type_names.subscription = Some(subscription.named_type().to_owned());
                    }
                }
                ast::Definition::Type(typedef) | ast::Definition::TypeExtension(typedef) => {
                    let id = self.definition_names[typedef.name()];

                    match &typedef {
                        ast::TypeDefinition::Object(object) => {
                            self.ingest_interfaces(id, object.implements_interfaces())?;
                            for field in object.fields() {
                                self.ingest_field(id, field)?;
                            }
                        }
                        ast::TypeDefinition::Interface(interface) => {
                            self.ingest_interfaces(id, interface.implements_interfaces())?;
                            for field in interface.fields() {
                                self.ingest_field(id, field)?;
                            }
                        }
                        ast::TypeDefinition::Union(union) => {
                            for member in union.members() {
                                let member_id = self
                                    .definition_id(member.name())
                                    .filter(|member_id| self[*member_id].kind == DefinitionKind::Object)
                                    .ok_or_else(|| SchemaError::InvalidUnionMember {
                                        union: typedef.name().to_owned(),
                                        member: member.name().to_owned(),
                                    })?;

                                if let Some(members) = &mut self.definitions[id.0].possible_types {
                                    members.push(member_id);
                                }
                            }
                        }
                        ast::TypeDefinition::Scalar(_)
                        | ast::TypeDefinition::Enum(_)
                        | ast::TypeDefinition::InputObject(_) => (),
                    }
                }
                _ => (),
            }
        }

        Ok(root_type_names)
    }

    fn ingest_interfaces<'a>(
        &mut self,
        implementor: DefinitionId,
        interfaces: impl Iterator<Item = &'a str>,
    ) -> Result<(), SchemaError> {
        for name in interfaces {
            let interface = self
                .definition_id(name)
                .filter(|id| self[*id].kind == DefinitionKind::Interface)
                .ok_or_else(|| SchemaError::InvalidInterface {
                    implementor: self[implementor].name.clone(),
                    interface: name.to_owned(),
                })?;

            self.definitions[implementor.0].interfaces.push(interface);
        }

        Ok(())
    }

    fn ingest_field(&mut self, parent: DefinitionId, field: ast::FieldDefinition<'_>) -> Result<(), SchemaError> {
        let location = || format!("{}.{}", self[parent].name, field.name());

        let ty = field.ty();
        let type_id = self.definition_id(ty.name()).ok_or_else(|| SchemaError::UnknownType {
            name: ty.name().to_owned(),
            location: location(),
        })?;

        let FieldDirectives { weight, list_size } = directives::ingest_field_directives(field.directives(), location)?;

        self.insert_field(FieldDefinition {
            name: field.name().to_owned(),
            parent,
            ty: type_id,
            is_list: ty.wrappers().any(|wrapper| matches!(wrapper, WrappingType::List)),
            weight: weight.unwrap_or(DEFAULT_FIELD_WEIGHT),
            is_introspection: false,
            list_size,
            implementations: Vec::new(),
        });

        Ok(())
    }

    fn insert_field(&mut self, field: FieldDefinition) {
        let id = FieldId(self.fields.len());
        self.definitions[field.parent.0].fields.insert(field.name.clone(), id);
        self.fields.push(field);
    }

    fn ingest_root_types(&mut self, names: RootTypeNames) -> Result<(), SchemaError> {
        let lookup = |schema: &Self, name: Option<String>, default: &str| match name {
            Some(name) => schema
                .definition_id(&name)
                .map(Some)
                .ok_or_else(|| SchemaError::UnknownType {
                    name,
                    location: "the schema definition".to_owned(),
                }),
            None => Ok(schema.definition_id(default)),
        };

        self.query_type = lookup(self, names.query, "Query")?;
        self.mutation_type = lookup(self, names.mutation, "Mutation")?;
        self.subscription_type = lookup(self, names.subscription, "Subscription")?;

        Ok(())
    }

    fn insert_typename_fields(&mut self) {
        let Some(string) = self.definition_id("String") else {
            return;
        };

        let composite_types = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, definition)| definition.kind.is_composite() && !definition.fields.contains_key("__typename"))
            .map(|(id, _)| DefinitionId(id))
            .collect::<Vec<_>>();

        for parent in composite_types {
            self.insert_field(FieldDefinition {
                name: "__typename".to_owned(),
                parent,
                ty: string,
                is_list: false,
                weight: DEFAULT_FIELD_WEIGHT,
                is_introspection: true,
                list_size: None,
                implementations: Vec::new(),
            });
        }
    }

    /// Objects implementing an interface, directly or through another interface.
    fn compute_possible_types(&mut self) {
        for object in 0..self.definitions.len() {
            if self.definitions[object].kind != DefinitionKind::Object {
                continue;
            }

            let mut interfaces = self.definitions[object].interfaces.clone();
            let mut i = 0;
            while let Some(interface) = interfaces.get(i).copied() {
                for parent in &self[interface].interfaces {
                    if !interfaces.contains(parent) {
                        interfaces.push(*parent);
                    }
                }
                i += 1;
            }

            for interface in interfaces {
                if let Some(implementors) = &mut self.definitions[interface.0].possible_types {
                    implementors.push(DefinitionId(object));
                }
            }
        }
    }

    fn link_interface_fields(&mut self) {
        for field in 0..self.fields.len() {
            let FieldDefinition { parent, ref name, .. } = self.fields[field];
            if self[parent].kind != DefinitionKind::Interface {
                continue;
            }

            let implementations = self[parent]
                .possible_types
                .iter()
                .flatten()
                .filter_map(|implementor| self.field_id(*implementor, name))
                .collect();

            self.fields[field].implementations = implementations;
        }
    }
}

fn definition_kind(typedef: &ast::TypeDefinition<'_>) -> DefinitionKind {
    match typedef {
        ast::TypeDefinition::Scalar(_) => DefinitionKind::Scalar,
        ast::TypeDefinition::Object(_) => DefinitionKind::Object,
        ast::TypeDefinition::Interface(_) => DefinitionKind::Interface,
        ast::TypeDefinition::Union(_) => DefinitionKind::Union,
        ast::TypeDefinition::Enum(_) => DefinitionKind::Enum,
        ast::TypeDefinition::InputObject(_) => DefinitionKind::InputObject,
    }
}

impl Index<DefinitionId> for SdlSchema {
    type Output = Definition;

    fn index(&self, index: DefinitionId) -> &Self::Output {
        &self.definitions[index.0]
    }
}

impl Index<FieldId> for SdlSchema {
    type Output = FieldDefinition;

    fn index(&self, index: FieldId) -> &Self::Output {
        &self.fields[index.0]
    }
}

/// The number of items a list field is assumed to hold: the largest slicing argument passed to it,
/// then its `@listSize(assumedSize:)`, then the default size.
fn list_multiplier(field: &FieldDefinition, nodes: &[FieldSelection<'_>], default_list_size: Option<usize>) -> usize {
    if let Some(list_size) = &field.list_size {
        let sliced = nodes
            .iter()
            .flat_map(|node| node.arguments())
            .filter(|argument| list_size.slicing_arguments.iter().any(|name| name == argument.name()))
            .filter_map(|argument| match argument.value() {
                Value::Int(value) => usize::try_from(value.as_i64()).ok(),
                _ => None,
            })
            .max();

        if let Some(size) = sliced.or(list_size.assumed_size) {
            return size;
        }
    }

    match default_list_size {
        Some(size) if field.is_list => size,
        _ => 1,
    }
}

impl<'doc> ComplexitySchema<FieldSelection<'doc>> for SdlSchema {
    type Type = DefinitionId;
    type Field = FieldId;

    fn possible_types(&self, ty: DefinitionId) -> Option<&[DefinitionId]> {
        SdlSchema::possible_types(self, ty)
    }

    fn own_complexity(
        &self,
        field: FieldId,
        nodes: &[FieldSelection<'doc>],
        child_complexity: usize,
        default_list_size: Option<usize>,
    ) -> usize {
        self.field_complexity(field, nodes, child_complexity, default_list_size)
    }

    fn is_introspection_field(&self, field: FieldId) -> bool {
        self[field].is_introspection
    }
}

impl<'doc> SchemaLookup<FieldSelection<'doc>> for SdlSchema {
    fn root_type(&self, operation_type: OperationType) -> Option<DefinitionId> {
        match operation_type {
            OperationType::Query => self.query_type,
            OperationType::Mutation => self.mutation_type,
            OperationType::Subscription => self.subscription_type,
        }
    }

    fn lookup_type(&self, name: &str) -> Option<DefinitionId> {
        self.definition_id(name)
    }

    fn type_name(&self, ty: DefinitionId) -> &str {
        &self[ty].name
    }

    fn field(&self, parent: DefinitionId, name: &str) -> Option<(FieldId, DefinitionId)> {
        let id = self.field_id(parent, name)?;
        Some((id, self[id].ty))
    }
}
