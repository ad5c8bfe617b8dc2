use crate::{scope::FieldScopes, ComplexitySchema};

use super::{response_keys, Merger};

impl<'a, S, N> Merger<'a, '_, S, N>
where
    S: ComplexitySchema<N> + 'a,
    N: 'a,
{
    /// The historical pricing: leaf scopes are priced one after the other, while the last
    /// composite scope is priced against the merged children of all composite scopes. Whichever
    /// is priced last is kept.
    pub(super) fn legacy_field_complexity_sum(&mut self, field_scopes: &[&'a FieldScopes]) -> usize {
        let tree = self.tree;
        let schema = self.schema;
        let mut total: usize = 0;

        for response_key in response_keys(field_scopes) {
            let mut field_complexity = 0;
            let mut composite_scopes = Vec::new();

            for scope in field_scopes
                .iter()
                .filter_map(|fields| fields.get(response_key))
                .map(|id| tree.walk(*id))
            {
                if scope.is_composite() {
                    composite_scopes.push(scope.id());
                } else {
                    field_complexity = scope.own_complexity(schema, 0, self.default_list_size);
                    self.observe(scope, field_complexity, None);
                }
            }

            if let Some(representative) = composite_scopes.last().copied() {
                let child_complexity = self.max_complexity(&composite_scopes);
                let scope = tree.walk(representative);

                field_complexity = scope.own_complexity(schema, child_complexity, self.default_list_size);
                self.observe(scope, field_complexity, Some(child_complexity));
            }

            total = total.saturating_add(field_complexity);
        }

        total
    }
}
