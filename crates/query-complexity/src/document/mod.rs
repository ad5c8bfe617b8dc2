//! Drives an analysis from a GraphQL document parsed with `cynic-parser`.

mod directives;

use directives::VariableValues;

use std::mem;

use complexity_config::ComplexityConfig;
use cynic_parser::{
    common::OperationType,
    executable::{FieldSelection, FragmentDefinition, FragmentSpread, Iter, Selection},
    ExecutableDocument,
};
use itertools::Itertools;

use crate::{ComplexityAnalysis, ComplexityError, ComplexityReport, ComplexitySchema, FieldEdge, QueryId};

/// Variables of an operation, as received in a GraphQL request.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// An edge as emitted by the document driver.
pub type DocumentFieldEdge<'doc, S> = FieldEdge<
    FieldSelection<'doc>,
    <S as ComplexitySchema<FieldSelection<'doc>>>::Type,
    <S as ComplexitySchema<FieldSelection<'doc>>>::Field,
>;

/// Name resolution the document driver needs on top of [`ComplexitySchema`].
pub trait SchemaLookup<N>: ComplexitySchema<N> {
    fn root_type(&self, operation_type: OperationType) -> Option<Self::Type>;

    fn lookup_type(&self, name: &str) -> Option<Self::Type>;

    fn type_name(&self, ty: Self::Type) -> &str;

    /// The field definition and the type it returns, wrappers removed.
    fn field(&self, parent: Self::Type, name: &str) -> Option<(Self::Field, Self::Type)>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Could not parse the operation: {0}")]
    Parse(String),
    #[error("The document does not contain any operation")]
    MissingOperation,
    #[error("Unknown operation named '{0}'")]
    UnknownOperation(String),
    #[error("The schema does not define a root type for {0} operations")]
    MissingRootType(&'static str),
    #[error("Unknown type named '{0}'")]
    UnknownType(String),
    #[error("Unknown field '{field}' on type '{parent}'")]
    UnknownField { parent: String, field: String },
    #[error("Unknown fragment named '{0}'")]
    UnknownFragment(String),
    #[error("Fragment cycle detected: {}", .0.iter().join(", "))]
    FragmentCycle(Vec<String>),
    #[error("The @{0} directive requires a boolean 'if' argument")]
    InvalidCondition(String),
    #[error("Variable '${variable}' used by @{directive} must be a boolean")]
    InvalidVariable { directive: String, variable: String },
    #[error(transparent)]
    Complexity(#[from] ComplexityError),
}

#[allow(unused_variables)]
pub trait Visitor<'doc, S: ComplexitySchema<FieldSelection<'doc>>> {
    fn enter_field(&mut self, edge: DocumentFieldEdge<'doc, S>) -> Result<(), DocumentError> {
        Ok(())
    }

    fn exit_field(&mut self, edge: DocumentFieldEdge<'doc, S>) -> Result<(), DocumentError> {
        Ok(())
    }
}

/// Walks an operation of `document`, the first one when no name is given.
///
/// Fragment spreads are inlined and every field is reported with the type it was selected on.
/// Fields excluded by `@skip` or `@include` are still visited, flagged as skipped. Variables
/// missing from `variables` take the default value declared by the operation.
pub fn visit_operation<'doc, S, V>(
    schema: &S,
    document: &'doc ExecutableDocument,
    operation_name: Option<&str>,
    variables: &Variables,
    visitor: &mut V,
) -> Result<(), DocumentError>
where
    S: SchemaLookup<FieldSelection<'doc>>,
    V: Visitor<'doc, S>,
{
    let operation = match operation_name {
        Some(name) => document
            .operations()
            .find(|operation| operation.name() == Some(name))
            .ok_or_else(|| DocumentError::UnknownOperation(name.to_owned()))?,
        None => document.operations().next().ok_or(DocumentError::MissingOperation)?,
    };

    let operation_type = operation.operation_type();
    let root = schema
        .root_type(operation_type)
        .ok_or(DocumentError::MissingRootType(operation_type_name(operation_type)))?;

    Walker {
        schema,
        variables: VariableValues {
            request: variables,
            definitions: operation.variable_definitions().collect(),
        },
        visitor,
        in_fragment_definition: false,
        fragments_stack: Vec::new(),
    }
    .visit_selection_set(operation.selection_set(), root, false)
}

/// Walks every fragment definition of `document` on its own, flagging its fields as part of a
/// fragment definition.
pub fn visit_fragment_definitions<'doc, S, V>(
    schema: &S,
    document: &'doc ExecutableDocument,
    variables: &Variables,
    visitor: &mut V,
) -> Result<(), DocumentError>
where
    S: SchemaLookup<FieldSelection<'doc>>,
    V: Visitor<'doc, S>,
{
    let definitions = document
        .operations()
        .flat_map(|operation| operation.variable_definitions())
        .collect::<Vec<_>>();

    for fragment in document.fragments() {
        let mut walker = Walker {
            schema,
            variables: VariableValues {
                request: variables,
                definitions: definitions.clone(),
            },
            visitor: &mut *visitor,
            in_fragment_definition: true,
            fragments_stack: vec![fragment.name()],
        };

        walker.visit_fragment(fragment, false)?;
    }

    Ok(())
}

/// Parses each source as its own query and analyzes all of them in a single pass.
pub fn analyze_document<S>(
    schema: &S,
    config: &ComplexityConfig,
    sources: &[&str],
    variables: &Variables,
) -> Result<ComplexityReport, DocumentError>
where
    S: for<'doc> SchemaLookup<FieldSelection<'doc>>,
{
    let documents = sources
        .iter()
        .map(|source| cynic_parser::parse_executable_document(source))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| DocumentError::Parse(error.to_string()))?;

    let mut analysis = ComplexityAnalysis::new(schema, config);

    for (i, document) in documents.iter().enumerate() {
        analysis.visit_operation(QueryId::from(i), document, None, variables)?;
    }

    Ok(analysis.finish()?)
}

impl<'doc, S> ComplexityAnalysis<'_, '_, S, FieldSelection<'doc>>
where
    S: SchemaLookup<FieldSelection<'doc>>,
{
    /// Feeds the fields of an operation to this analysis as query `query`.
    pub fn visit_operation(
        &mut self,
        query: QueryId,
        document: &'doc ExecutableDocument,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> Result<(), DocumentError> {
        let schema = self.schema();
        visit_operation(
            schema,
            document,
            operation_name,
            variables,
            &mut AnalysisVisitor { analysis: self, query },
        )
    }

    /// Feeds standalone fragment definitions to this analysis. They are never charged.
    pub fn visit_fragment_definitions(
        &mut self,
        query: QueryId,
        document: &'doc ExecutableDocument,
        variables: &Variables,
    ) -> Result<(), DocumentError> {
        let schema = self.schema();
        visit_fragment_definitions(schema, document, variables, &mut AnalysisVisitor { analysis: self, query })
    }
}

struct AnalysisVisitor<'a, 's, 'h, S: ComplexitySchema<N>, N> {
    analysis: &'a mut ComplexityAnalysis<'s, 'h, S, N>,
    query: QueryId,
}

impl<'doc, S> Visitor<'doc, S> for AnalysisVisitor<'_, '_, '_, S, FieldSelection<'doc>>
where
    S: SchemaLookup<FieldSelection<'doc>>,
{
    fn enter_field(&mut self, edge: DocumentFieldEdge<'doc, S>) -> Result<(), DocumentError> {
        self.analysis.enter_field(self.query, edge);
        Ok(())
    }

    fn exit_field(&mut self, edge: DocumentFieldEdge<'doc, S>) -> Result<(), DocumentError> {
        Ok(self.analysis.leave_field(self.query, edge)?)
    }
}

struct Walker<'a, 'doc, S, V> {
    schema: &'a S,
    variables: VariableValues<'a, 'doc>,
    visitor: &'a mut V,
    in_fragment_definition: bool,
    fragments_stack: Vec<&'doc str>,
}

impl<'doc, S, V> Walker<'_, 'doc, S, V>
where
    S: SchemaLookup<FieldSelection<'doc>>,
    V: Visitor<'doc, S>,
{
    fn visit_selection_set(
        &mut self,
        selections: Iter<'doc, Selection<'doc>>,
        parent: S::Type,
        skipped: bool,
    ) -> Result<(), DocumentError> {
        for selection in selections {
            match selection {
                Selection::Field(field) => self.visit_field(field, parent, skipped)?,
                Selection::InlineFragment(fragment) => {
                    let skipped = skipped || directives::is_excluded(fragment.directives(), &self.variables)?;
                    let parent = match fragment.type_condition() {
                        Some(name) => self.lookup_type(name)?,
                        None => parent,
                    };

                    self.visit_selection_set(fragment.selection_set(), parent, skipped)?;
                }
                Selection::FragmentSpread(spread) => self.visit_fragment_spread(spread, skipped)?,
            }
        }

        Ok(())
    }

    fn visit_field(&mut self, field: FieldSelection<'doc>, parent: S::Type, skipped: bool) -> Result<(), DocumentError> {
        let skipped = skipped || directives::is_excluded(field.directives(), &self.variables)?;

        let (definition, field_type) =
            self.schema
                .field(parent, field.name())
                .ok_or_else(|| DocumentError::UnknownField {
                    parent: self.schema.type_name(parent).to_owned(),
                    field: field.name().to_owned(),
                })?;

        let edge = FieldEdge {
            node: field,
            parent_type: parent,
            field: definition,
            is_skipped: skipped,
            in_fragment_definition: self.in_fragment_definition,
        };

        self.visitor.enter_field(edge)?;
        self.visit_selection_set(field.selection_set(), field_type, skipped)?;
        self.visitor.exit_field(edge)
    }

    fn visit_fragment_spread(&mut self, spread: FragmentSpread<'doc>, skipped: bool) -> Result<(), DocumentError> {
        let skipped = skipped || directives::is_excluded(spread.directives(), &self.variables)?;
        let name = spread.fragment_name();

        if self.fragments_stack.contains(&name) {
            self.fragments_stack.push(name);
            return Err(DocumentError::FragmentCycle(
                mem::take(&mut self.fragments_stack)
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            ));
        }

        let fragment = spread
            .fragment()
            .ok_or_else(|| DocumentError::UnknownFragment(name.to_owned()))?;

        self.fragments_stack.push(name);
        self.visit_fragment(fragment, skipped)?;
        self.fragments_stack.pop();

        Ok(())
    }

    fn visit_fragment(&mut self, fragment: FragmentDefinition<'doc>, skipped: bool) -> Result<(), DocumentError> {
        let parent = self.lookup_type(fragment.type_condition())?;
        self.visit_selection_set(fragment.selection_set(), parent, skipped)
    }

    fn lookup_type(&self, name: &str) -> Result<S::Type, DocumentError> {
        self.schema
            .lookup_type(name)
            .ok_or_else(|| DocumentError::UnknownType(name.to_owned()))
    }
}

fn operation_type_name(operation_type: OperationType) -> &'static str {
    match operation_type {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}
