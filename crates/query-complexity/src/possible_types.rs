//! Abstract type handling.
//!
//! An interface or a union is never the runtime type of a value, but everything selected on it
//! applies to each of its implementors.

use std::slice;

use indexmap::IndexSet;

use crate::ComplexitySchema;

/// Replaces every abstract type by its implementors, keeping the first-seen order.
pub fn expand_and_dedupe<S, N>(schema: &S, types: impl IntoIterator<Item = S::Type>) -> IndexSet<S::Type>
where
    S: ComplexitySchema<N>,
{
    let mut candidates = types.into_iter().collect::<IndexSet<_>>();

    let abstract_types = candidates
        .iter()
        .copied()
        .filter(|ty| schema.possible_types(*ty).is_some())
        .collect::<Vec<_>>();

    for ty in abstract_types {
        if let Some(possible_types) = schema.possible_types(ty) {
            candidates.extend(possible_types.iter().copied());
        }
        candidates.shift_remove(&ty);
    }

    candidates
}

/// Whether a value of type `b` could also be a value of type `a`.
pub fn intersects<S, N>(schema: &S, a: S::Type, b: S::Type) -> bool
where
    S: ComplexitySchema<N>,
{
    if a == b {
        return true;
    }

    let a_types = schema.possible_types(a).unwrap_or(slice::from_ref(&a));
    let b_types = schema.possible_types(b).unwrap_or(slice::from_ref(&b));

    b_types.iter().any(|ty| a_types.contains(ty))
}

#[cfg(test)]
mod tests {
    use crate::testing::{FakeNode, FakeSchema, FakeType};

    use super::*;

    #[test]
    fn concrete_types_pass_through() {
        let schema = FakeSchema::default();

        let expanded = expand_and_dedupe::<_, FakeNode>(&schema, [FakeType::Y, FakeType::X, FakeType::Y]);

        assert_eq!(expanded.into_iter().collect::<Vec<_>>(), vec![FakeType::Y, FakeType::X]);
    }

    #[test]
    fn abstract_types_are_replaced_by_their_implementors() {
        let schema = FakeSchema::default();

        let expanded = expand_and_dedupe::<_, FakeNode>(&schema, [FakeType::Node, FakeType::X]);

        assert_eq!(expanded.into_iter().collect::<Vec<_>>(), vec![FakeType::X, FakeType::Y]);
    }

    #[test]
    fn union_and_interface_overlap() {
        let schema = FakeSchema::default();

        assert!(intersects::<_, FakeNode>(&schema, FakeType::X, FakeType::X));
        assert!(intersects::<_, FakeNode>(&schema, FakeType::Node, FakeType::Y));
        assert!(intersects::<_, FakeNode>(&schema, FakeType::Node, FakeType::Entity));
        assert!(!intersects::<_, FakeNode>(&schema, FakeType::X, FakeType::Y));
        assert!(!intersects::<_, FakeNode>(&schema, FakeType::Entity, FakeType::Y));
    }
}
