//! Turns a scope tree into a worst-case cost.
//!
//! At every depth, the sibling scopes standing for one position of the query are evaluated once
//! per possible runtime type: only the fields selected on a type overlapping with it are charged,
//! and the most expensive runtime type wins.

mod future;
mod legacy;

use std::fmt;

use crate::{
    possible_types,
    scope::{FieldScopes, ScopeId, ScopeTree},
    ComplexitySchema, Scope,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Future,
    Legacy,
}

/// The cost retained for one field, reported to the observation hook.
pub struct FieldComplexity<'a, S: ComplexitySchema<N>, N> {
    /// The scope whose cost was retained.
    pub scope: Scope<'a, S, N>,
    pub complexity: usize,
    /// `None` for leaf fields.
    pub child_complexity: Option<usize>,
}

impl<S: ComplexitySchema<N>, N> fmt::Debug for FieldComplexity<'_, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldComplexity")
            .field("response_key", &self.scope.response_key())
            .field("parent_type", &self.scope.parent_type())
            .field("complexity", &self.complexity)
            .field("child_complexity", &self.child_complexity)
            .finish()
    }
}

pub(crate) struct Merger<'a, 'o, S: ComplexitySchema<N>, N> {
    schema: &'a S,
    tree: &'a ScopeTree<S, N>,
    algorithm: Algorithm,
    default_list_size: Option<usize>,
    observer: &'o mut dyn FnMut(FieldComplexity<'_, S, N>),
}

impl<'a, 'o, S, N> Merger<'a, 'o, S, N>
where
    S: ComplexitySchema<N> + 'a,
    N: 'a,
{
    pub(crate) fn new(
        schema: &'a S,
        tree: &'a ScopeTree<S, N>,
        algorithm: Algorithm,
        observer: &'o mut dyn FnMut(FieldComplexity<'_, S, N>),
    ) -> Self {
        Merger {
            schema,
            tree,
            algorithm,
            default_list_size: None,
            observer,
        }
    }

    pub(crate) fn with_default_list_size(mut self, default_list_size: Option<usize>) -> Self {
        self.default_list_size = default_list_size;
        self
    }

    pub(crate) fn query_complexity(&mut self) -> usize {
        let root = self.tree.root_id();
        self.max_complexity(&[root])
    }

    /// `scopes` all stand for the same position in the query.
    fn max_complexity(&mut self, scopes: &[ScopeId]) -> usize {
        let tree = self.tree;
        let schema = self.schema;

        let runtime_types = possible_types::expand_and_dedupe::<S, N>(
            schema,
            scopes.iter().flat_map(|id| tree.walk(*id).types()),
        );

        let mut max = 0;
        for runtime_type in runtime_types {
            let field_scopes = scopes
                .iter()
                .flat_map(|id| tree.walk(*id).field_scopes())
                .filter(|(ty, _)| possible_types::intersects::<S, N>(schema, *ty, runtime_type))
                .map(|(_, fields)| fields)
                .collect::<Vec<_>>();

            let complexity = match self.algorithm {
                Algorithm::Future => self.future_field_complexity_sum(&field_scopes),
                Algorithm::Legacy => self.legacy_field_complexity_sum(&field_scopes),
            };

            max = max.max(complexity);
        }

        max
    }

    fn observe(&mut self, scope: Scope<'a, S, N>, complexity: usize, child_complexity: Option<usize>) {
        tracing::trace!(
            response_key = scope.response_key(),
            complexity,
            ?child_complexity,
            "Field complexity"
        );

        (self.observer)(FieldComplexity {
            scope,
            complexity,
            child_complexity,
        });
    }
}

/// Every distinct response key, in first-seen order.
fn response_keys<'a>(field_scopes: &[&'a FieldScopes]) -> indexmap::IndexSet<&'a str> {
    field_scopes
        .iter()
        .copied()
        .flat_map(|fields| fields.keys())
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{FieldEdge, QueryId, ScopeBuilder},
        testing::{FakeNode, FakeSchema, FakeType},
    };

    use super::*;

    /// A tiny traversal driver: `select(ty, key, children)`.
    struct Query<'s> {
        builder: ScopeBuilder<'s, FakeSchema, FakeNode>,
    }

    impl<'s> Query<'s> {
        fn new(schema: &'s FakeSchema) -> Self {
            Query {
                builder: ScopeBuilder::new(schema, true),
            }
        }

        fn select(&mut self, parent_type: FakeType, key: &'static str, children: impl FnOnce(&mut Self)) -> &mut Self {
            self.select_as(parent_type, key, key, children)
        }

        /// `key: field { ... }`
        fn select_as(
            &mut self,
            parent_type: FakeType,
            key: &'static str,
            field: &'static str,
            children: impl FnOnce(&mut Self),
        ) -> &mut Self {
            let edge = FieldEdge {
                node: FakeNode(key),
                parent_type,
                field,
                is_skipped: false,
                in_fragment_definition: false,
            };

            self.builder.enter_field(QueryId::from(0), edge);
            children(self);
            self.builder.leave_field(QueryId::from(0), edge).unwrap();
            self
        }

        fn leaf(&mut self, parent_type: FakeType, key: &'static str) -> &mut Self {
            self.select(parent_type, key, |_| {})
        }

        fn complexity(&self, schema: &FakeSchema, algorithm: Algorithm) -> (usize, Vec<String>) {
            let empty = ScopeTree::new();
            let tree = self.builder.tree(QueryId::from(0)).unwrap_or(&empty);
            let mut observed = Vec::new();
            let mut observer = |field: FieldComplexity<'_, FakeSchema, FakeNode>| {
                observed.push(format!(
                    "{:?}.{} = {}",
                    field.scope.parent_type().unwrap(),
                    field.scope.response_key(),
                    field.complexity
                ));
            };

            let complexity = Merger::new(schema, tree, algorithm, &mut observer).query_complexity();
            (complexity, observed)
        }
    }

    #[test]
    fn empty_query_costs_nothing() {
        let schema = FakeSchema::default();
        let query = Query::new(&schema);

        assert_eq!(query.complexity(&schema, Algorithm::Future), (0, Vec::new()));
        assert_eq!(query.complexity(&schema, Algorithm::Legacy), (0, Vec::new()));
    }

    #[test]
    fn empty_tree_costs_nothing() {
        let schema = FakeSchema::default();
        let tree = ScopeTree::<FakeSchema, FakeNode>::new();
        let mut observer = |_: FieldComplexity<'_, FakeSchema, FakeNode>| {};

        let complexity = Merger::new(&schema, &tree, Algorithm::Future, &mut observer).query_complexity();

        assert_eq!(complexity, 0);
    }

    #[test]
    fn leaf_fields_are_summed() {
        let schema = FakeSchema::default().with_cost("a", 1).with_cost("b", 2);
        let mut query = Query::new(&schema);
        query.leaf(FakeType::Query, "a").leaf(FakeType::Query, "b");

        let (complexity, observed) = query.complexity(&schema, Algorithm::Future);

        assert_eq!(complexity, 3);
        insta::assert_debug_snapshot!(observed, @r###"
        [
            "Query.a = 1",
            "Query.b = 2",
        ]
        "###);
    }

    #[test]
    fn interface_selections_cost_the_most_expensive_implementor() {
        // `node { ... on X { f } ... on Y { g } ... on Node { id } }`
        let schema = FakeSchema::default().with_cost("f", 5).with_cost("g", 3);
        let mut query = Query::new(&schema);
        query.select(FakeType::Query, "node", |node| {
            node.leaf(FakeType::X, "f")
                .leaf(FakeType::Y, "g")
                .leaf(FakeType::Node, "id");
        });

        let (complexity, observed) = query.complexity(&schema, Algorithm::Future);

        // node (1) + max(f + id, g + id)
        assert_eq!(complexity, 1 + 5 + 1);
        insta::assert_debug_snapshot!(observed, @r###"
        [
            "X.f = 5",
            "Node.id = 1",
            "Y.g = 3",
            "Node.id = 1",
            "Query.node = 7",
        ]
        "###);
    }

    #[test]
    fn union_members_only_see_their_own_selections() {
        let schema = FakeSchema::default().with_cost("f", 5);
        let mut query = Query::new(&schema);
        query.select(FakeType::Query, "node", |node| {
            node.leaf(FakeType::Entity, "f").leaf(FakeType::Y, "g");
        });

        // X sees f (5), Y sees g (1)
        assert_eq!(query.complexity(&schema, Algorithm::Future).0, 1 + 5);
        assert_eq!(query.complexity(&schema, Algorithm::Legacy).0, 1 + 5);
    }

    #[test]
    fn legacy_uses_the_last_composite_selection() {
        // `node { ... on X { thing: expensiveThing { a } } ... on Node { thing { a } } }`
        let schema = FakeSchema::default().with_cost("expensiveThing", 10);
        let mut query = Query::new(&schema);
        query.select(FakeType::Query, "node", |node| {
            node.select_as(FakeType::X, "thing", "expensiveThing", |thing| {
                thing.leaf(FakeType::Query, "a");
            })
            .select(FakeType::Node, "thing", |thing| {
                thing.leaf(FakeType::Query, "a");
            });
        });

        let (future, _) = query.complexity(&schema, Algorithm::Future);
        let (legacy, observed) = query.complexity(&schema, Algorithm::Legacy);

        assert_eq!(future, 1 + 10 + 1);
        assert_eq!(legacy, 1 + 1 + 1);
        insta::assert_debug_snapshot!(observed, @r###"
        [
            "Query.a = 1",
            "Query.a = 1",
            "Node.thing = 2",
            "Query.a = 1",
            "Node.thing = 2",
            "Query.node = 3",
        ]
        "###);
    }

    #[test]
    fn legacy_keeps_the_last_leaf_selection() {
        // `node { ... on X { a: pricey } ... on Node { a: cheap } }`
        let schema = FakeSchema::default().with_cost("pricey", 5);
        let mut query = Query::new(&schema);
        query.select(FakeType::Query, "node", |node| {
            node.select_as(FakeType::X, "a", "pricey", |_| {})
                .select_as(FakeType::Node, "a", "cheap", |_| {});
        });

        assert_eq!(query.complexity(&schema, Algorithm::Future).0, 1 + 5);
        assert_eq!(query.complexity(&schema, Algorithm::Legacy).0, 1 + 1);
    }

    #[test]
    fn future_merges_children_of_every_composite_selection() {
        // `node { ... on X { thing { a } } ... on Node { thing { b } } }`
        let schema = FakeSchema::default().with_cost("a", 4).with_cost("b", 2);
        let mut query = Query::new(&schema);
        query.select(FakeType::Query, "node", |node| {
            node.select(FakeType::X, "thing", |thing| {
                thing.leaf(FakeType::Query, "a");
            })
            .select(FakeType::Node, "thing", |thing| {
                thing.leaf(FakeType::Query, "b");
            });
        });

        // X: thing (1 + a + b), Y: thing (1 + b)
        assert_eq!(query.complexity(&schema, Algorithm::Future).0, 1 + 1 + 4 + 2);
        assert_eq!(query.complexity(&schema, Algorithm::Legacy).0, 1 + 1 + 4 + 2);
    }
}
