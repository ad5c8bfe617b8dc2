use std::fmt;

use indexmap::IndexMap;

use crate::ComplexitySchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl From<usize> for ScopeId {
    fn from(value: usize) -> Self {
        ScopeId(value)
    }
}

impl From<ScopeId> for usize {
    fn from(value: ScopeId) -> Self {
        value.0
    }
}

/// Child scopes of a single parent type, keyed by response key.
pub(crate) type FieldScopes = IndexMap<String, ScopeId>;

pub(crate) struct ScopeRecord<S: ComplexitySchema<N>, N> {
    response_key: String,
    parent_type: Option<S::Type>,
    field: Option<S::Field>,
    nodes: Vec<N>,
    children: IndexMap<S::Type, FieldScopes>,
}

/// The cost tree of a single query.
///
/// Scopes live in an arena and reference their children by id. The root scope has no parent type
/// nor field and stands for the whole operation. Below any scope, children are partitioned by the
/// parent type they were selected on first, then by response key: selecting the same field twice
/// on the same type (through fragments for example) lands in the same scope.
pub struct ScopeTree<S: ComplexitySchema<N>, N> {
    scopes: Vec<ScopeRecord<S, N>>,
}

impl<S: ComplexitySchema<N>, N> Default for ScopeTree<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ComplexitySchema<N>, N> ScopeTree<S, N> {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![ScopeRecord {
                response_key: String::new(),
                parent_type: None,
                field: None,
                nodes: Vec::new(),
                children: IndexMap::new(),
            }],
        }
    }

    pub fn root_id(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn root(&self) -> Scope<'_, S, N> {
        self.walk(self.root_id())
    }

    pub fn walk(&self, id: ScopeId) -> Scope<'_, S, N> {
        Scope { tree: self, id }
    }

    /// Number of scopes, the root included.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub(crate) fn get_or_create_child(
        &mut self,
        parent: ScopeId,
        parent_type: S::Type,
        response_key: &str,
        field: S::Field,
    ) -> ScopeId {
        let next_id = ScopeId(self.scopes.len());
        let fields = self.scopes[parent.0].children.entry(parent_type).or_default();

        if let Some(id) = fields.get(response_key) {
            return *id;
        }

        fields.insert(response_key.to_owned(), next_id);
        self.scopes.push(ScopeRecord {
            response_key: response_key.to_owned(),
            parent_type: Some(parent_type),
            field: Some(field),
            nodes: Vec::new(),
            children: IndexMap::new(),
        });

        next_id
    }

    pub(crate) fn push_node(&mut self, id: ScopeId, node: N) {
        self.scopes[id.0].nodes.push(node);
    }

    fn record(&self, id: ScopeId) -> &ScopeRecord<S, N> {
        &self.scopes[id.0]
    }
}

/// Read-only view of a scope within its tree.
pub struct Scope<'a, S: ComplexitySchema<N>, N> {
    tree: &'a ScopeTree<S, N>,
    id: ScopeId,
}

impl<S: ComplexitySchema<N>, N> Clone for Scope<'_, S, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ComplexitySchema<N>, N> Copy for Scope<'_, S, N> {}

impl<'a, S, N> Scope<'a, S, N>
where
    S: ComplexitySchema<N> + 'a,
    N: 'a,
{
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.id == self.tree.root_id()
    }

    /// Empty for the root scope.
    pub fn response_key(&self) -> &'a str {
        &self.tree.record(self.id).response_key
    }

    pub fn parent_type(&self) -> Option<S::Type> {
        self.tree.record(self.id).parent_type
    }

    pub fn field_definition(&self) -> Option<S::Field> {
        self.tree.record(self.id).field
    }

    /// Every selection merged into this scope, in traversal order.
    pub fn contributing_nodes(&self) -> &'a [N] {
        &self.tree.record(self.id).nodes
    }

    pub fn is_composite(&self) -> bool {
        !self.tree.record(self.id).children.is_empty()
    }

    /// The parent types under which children were selected.
    pub fn types(&self) -> impl Iterator<Item = S::Type> + 'a {
        self.tree.record(self.id).children.keys().copied()
    }

    pub fn fields(&self, ty: S::Type) -> impl Iterator<Item = Scope<'a, S, N>> + 'a {
        let tree = self.tree;

        tree.record(self.id)
            .children
            .get(&ty)
            .into_iter()
            .flat_map(|fields| fields.values())
            .map(move |id| tree.walk(*id))
    }

    pub fn child(&self, ty: S::Type, response_key: &str) -> Option<Scope<'a, S, N>> {
        let id = self.tree.record(self.id).children.get(&ty)?.get(response_key)?;
        Some(self.tree.walk(*id))
    }

    /// The field's own cost, or zero for the root.
    pub fn own_complexity(&self, schema: &S, child_complexity: usize, default_list_size: Option<usize>) -> usize {
        match self.field_definition() {
            Some(field) => schema.own_complexity(field, self.contributing_nodes(), child_complexity, default_list_size),
            None => 0,
        }
    }

    pub(crate) fn field_scopes(&self) -> impl Iterator<Item = (S::Type, &'a FieldScopes)> + 'a {
        self.tree
            .record(self.id)
            .children
            .iter()
            .map(|(ty, fields)| (*ty, fields))
    }
}

impl<S, N> fmt::Debug for Scope<'_, S, N>
where
    S: ComplexitySchema<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.tree.record(self.id);
        let mut debug = f.debug_struct("Scope");

        if let Some(field) = record.field {
            debug
                .field("response_key", &record.response_key)
                .field("field", &field)
                .field("nodes", &record.nodes.len());
        }

        if !record.children.is_empty() {
            debug.field("children", &ChildrenDebug(*self));
        }

        debug.finish()
    }
}

struct ChildrenDebug<'a, S: ComplexitySchema<N>, N>(Scope<'a, S, N>);

impl<S, N> fmt::Debug for ChildrenDebug<'_, S, N>
where
    S: ComplexitySchema<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.0.tree;

        f.debug_map()
            .entries(tree.record(self.0.id).children.iter().map(|(ty, fields)| {
                let scopes = fields.values().map(|id| tree.walk(*id)).collect::<Vec<_>>();
                (ty, scopes)
            }))
            .finish()
    }
}
