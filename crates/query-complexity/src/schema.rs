use std::{fmt, hash::Hash};

/// A field selection as written in the operation.
pub trait SelectionNode {
    /// The alias if there is one, the field name otherwise.
    fn response_key(&self) -> &str;
}

impl SelectionNode for cynic_parser::executable::FieldSelection<'_> {
    fn response_key(&self) -> &str {
        self.alias().unwrap_or(self.name())
    }
}

/// What the analysis needs to know about a schema.
///
/// `N` is the selection node type handed to the field cost functions, so a schema can look at the
/// arguments of the selections it is asked to price.
pub trait ComplexitySchema<N> {
    /// A named type. Only composite types (objects, interfaces and unions) are ever parent types.
    type Type: Copy + Eq + Hash + fmt::Debug;
    type Field: Copy + fmt::Debug;

    /// The concrete implementors of an abstract type, `None` for object types.
    fn possible_types(&self, ty: Self::Type) -> Option<&[Self::Type]>;

    /// The cost of a field given the cost already computed for its selection set.
    ///
    /// `default_list_size` is the configured size of list fields the schema doesn't size itself,
    /// `None` when complexity control is disabled.
    fn own_complexity(
        &self,
        field: Self::Field,
        nodes: &[N],
        child_complexity: usize,
        default_list_size: Option<usize>,
    ) -> usize;

    fn is_introspection_field(&self, _field: Self::Field) -> bool {
        false
    }
}
