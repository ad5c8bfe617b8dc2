use std::fmt;

use indexmap::IndexMap;

use crate::{
    scope::{ScopeId, ScopeTree},
    ComplexityError, ComplexitySchema, SelectionNode,
};

/// Identifies one query among those analyzed in the same pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(usize);

impl From<usize> for QueryId {
    fn from(value: usize) -> Self {
        QueryId(value)
    }
}

impl From<QueryId> for usize {
    fn from(value: QueryId) -> Self {
        value.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A field selection as seen by the traversal, with its static context.
#[derive(Clone, Copy, Debug)]
pub struct FieldEdge<N, T, F> {
    pub node: N,
    /// The type the field was selected on, which may be abstract.
    pub parent_type: T,
    pub field: F,
    /// Excluded by `@skip` or `@include`, directly or through an ancestor.
    pub is_skipped: bool,
    /// Visited as part of a standalone fragment definition rather than through a spread.
    pub in_fragment_definition: bool,
}

enum Frame {
    Entered(ScopeId),
    /// Keeps the response key so the matching leave event can still be checked.
    Ignored(String),
}

struct QueryScopes<S: ComplexitySchema<N>, N> {
    tree: ScopeTree<S, N>,
    stack: Vec<Frame>,
}

impl<S: ComplexitySchema<N>, N> QueryScopes<S, N> {
    fn new() -> Self {
        QueryScopes {
            tree: ScopeTree::new(),
            stack: Vec::new(),
        }
    }

    /// `None` when the innermost entered field was ignored, in which case its whole subtree is.
    fn current_scope(&self) -> Option<ScopeId> {
        match self.stack.last() {
            None => Some(self.tree.root_id()),
            Some(Frame::Entered(id)) => Some(*id),
            Some(Frame::Ignored(_)) => None,
        }
    }

    fn response_key<'a>(&'a self, frame: &'a Frame) -> &'a str {
        match frame {
            Frame::Entered(id) => self.tree.walk(*id).response_key(),
            Frame::Ignored(response_key) => response_key,
        }
    }
}

/// Builds one scope tree per query out of enter/leave field events.
///
/// The builder never computes costs. Whether a field is ignored is decided once, when it is
/// entered, and that decision is kept on the stack so the matching leave event can't disagree
/// with it.
pub struct ScopeBuilder<'s, S: ComplexitySchema<N>, N> {
    schema: &'s S,
    count_introspection_fields: bool,
    queries: IndexMap<QueryId, QueryScopes<S, N>>,
}

impl<'s, S, N> ScopeBuilder<'s, S, N>
where
    S: ComplexitySchema<N>,
    N: SelectionNode,
{
    pub fn new(schema: &'s S, count_introspection_fields: bool) -> Self {
        ScopeBuilder {
            schema,
            count_introspection_fields,
            queries: IndexMap::new(),
        }
    }

    pub fn enter_field(&mut self, query: QueryId, edge: FieldEdge<N, S::Type, S::Field>) {
        let ignored = self.is_ignored(&edge);
        let scopes = self.queries.entry(query).or_insert_with(QueryScopes::new);

        let parent = match scopes.current_scope() {
            Some(parent) if !ignored => parent,
            _ => {
                scopes.stack.push(Frame::Ignored(edge.node.response_key().to_owned()));
                return;
            }
        };

        let id = scopes
            .tree
            .get_or_create_child(parent, edge.parent_type, edge.node.response_key(), edge.field);
        scopes.tree.push_node(id, edge.node);
        scopes.stack.push(Frame::Entered(id));
    }

    pub fn leave_field(&mut self, query: QueryId, edge: FieldEdge<N, S::Type, S::Field>) -> Result<(), ComplexityError> {
        let Some(scopes) = self.queries.get_mut(&query) else {
            return Err(ComplexityError::UnbalancedTraversal {
                query,
                response_key: edge.node.response_key().to_owned(),
            });
        };

        match scopes.stack.pop() {
            Some(frame) if scopes.response_key(&frame) == edge.node.response_key() => Ok(()),
            Some(_) | None => Err(ComplexityError::UnbalancedTraversal {
                query,
                response_key: edge.node.response_key().to_owned(),
            }),
        }
    }

    /// Whether every entered field of every query has been left.
    pub fn is_balanced(&self) -> bool {
        self.queries.values().all(|scopes| scopes.stack.is_empty())
    }

    /// The first query with fields left open, and the innermost of them.
    pub fn open_field(&self) -> Option<(QueryId, &str)> {
        self.queries.iter().find_map(|(query, scopes)| {
            let frame = scopes.stack.last()?;
            Some((*query, scopes.response_key(frame)))
        })
    }

    pub fn tree(&self, query: QueryId) -> Option<&ScopeTree<S, N>> {
        self.queries.get(&query).map(|scopes| &scopes.tree)
    }

    pub fn into_trees(self) -> IndexMap<QueryId, ScopeTree<S, N>> {
        self.queries
            .into_iter()
            .map(|(query, scopes)| (query, scopes.tree))
            .collect()
    }

    fn is_ignored(&self, edge: &FieldEdge<N, S::Type, S::Field>) -> bool {
        edge.in_fragment_definition
            || edge.is_skipped
            || (!self.count_introspection_fields && self.schema.is_introspection_field(edge.field))
    }
}
