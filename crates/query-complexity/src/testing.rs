use std::collections::HashMap;

use crate::{ComplexitySchema, SelectionNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FakeType {
    Query,
    X,
    Y,
    /// interface implemented by X and Y
    Node,
    /// union of X
    Entity,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct FakeNode(pub &'static str);

impl SelectionNode for FakeNode {
    fn response_key(&self) -> &str {
        self.0
    }
}

/// Fields are identified by name, costs default to 1 and are added to the child cost.
#[derive(Default)]
pub(crate) struct FakeSchema {
    costs: HashMap<&'static str, usize>,
}

impl FakeSchema {
    pub(crate) fn with_cost(mut self, field: &'static str, cost: usize) -> Self {
        self.costs.insert(field, cost);
        self
    }
}

const NODE_TYPES: &[FakeType] = &[FakeType::X, FakeType::Y];
const ENTITY_TYPES: &[FakeType] = &[FakeType::X];

impl ComplexitySchema<FakeNode> for FakeSchema {
    type Type = FakeType;
    type Field = &'static str;

    fn possible_types(&self, ty: FakeType) -> Option<&[FakeType]> {
        match ty {
            FakeType::Node => Some(NODE_TYPES),
            FakeType::Entity => Some(ENTITY_TYPES),
            FakeType::Query | FakeType::X | FakeType::Y => None,
        }
    }

    fn own_complexity(
        &self,
        field: &'static str,
        _nodes: &[FakeNode],
        child_complexity: usize,
        _default_list_size: Option<usize>,
    ) -> usize {
        self.costs.get(field).copied().unwrap_or(1) + child_complexity
    }

    fn is_introspection_field(&self, field: &'static str) -> bool {
        field.starts_with("__")
    }
}
