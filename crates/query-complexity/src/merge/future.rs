use crate::{scope::FieldScopes, ComplexitySchema, Scope};

use super::{response_keys, Merger};

impl<'a, S, N> Merger<'a, '_, S, N>
where
    S: ComplexitySchema<N> + 'a,
    N: 'a,
{
    /// Sums the costs of the fields applying to one runtime type.
    ///
    /// When several scopes share a response key, all of them are priced against the merged cost of
    /// their children and the most expensive one is kept.
    pub(super) fn future_field_complexity_sum(&mut self, field_scopes: &[&'a FieldScopes]) -> usize {
        let tree = self.tree;
        let schema = self.schema;
        let mut total: usize = 0;

        for response_key in response_keys(field_scopes) {
            let scopes = field_scopes
                .iter()
                .filter_map(|fields| fields.get(response_key).copied())
                .collect::<Vec<_>>();

            let child_complexity = scopes
                .iter()
                .any(|id| tree.walk(*id).is_composite())
                .then(|| self.max_complexity(&scopes));

            let mut max: Option<(Scope<'a, S, N>, usize)> = None;
            for scope in scopes.iter().map(|id| tree.walk(*id)) {
                let complexity = scope.own_complexity(schema, child_complexity.unwrap_or_default(), self.default_list_size);
                let is_max = match max {
                    Some((_, max)) => complexity > max,
                    None => true,
                };
                if is_max {
                    max = Some((scope, complexity));
                }
            }

            if let Some((scope, complexity)) = max {
                self.observe(scope, complexity, child_complexity);
                total = total.saturating_add(complexity);
            }
        }

        total
    }
}
