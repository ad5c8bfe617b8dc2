use complexity_config::{ComplexityControlConfig, ComplexityControlMode};

use crate::ComplexityError;

const DEFAULT_LIST_SIZE: usize = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityControl {
    #[default]
    Disabled,
    /// Complexity limits are enforced with the given limit
    Enforce { limit: usize, list_size: usize },
    /// Complexity limits are measured and reported.
    ///
    /// A limit can still be provided which we should use for
    /// reporting whether something would have gone over the limit.
    Measure { limit: Option<usize>, list_size: usize },
}

impl ComplexityControl {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ComplexityControl::Disabled)
    }

    pub fn is_enforce(&self) -> bool {
        matches!(self, ComplexityControl::Enforce { .. })
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            ComplexityControl::Disabled => None,
            ComplexityControl::Enforce { limit, .. } => Some(*limit),
            ComplexityControl::Measure { limit, .. } => *limit,
        }
    }

    /// The size assumed for list fields without a `@listSize` directive.
    pub fn list_size(&self) -> Option<usize> {
        match self {
            ComplexityControl::Disabled => None,
            ComplexityControl::Enforce { list_size, .. } | ComplexityControl::Measure { list_size, .. } => {
                Some(*list_size)
            }
        }
    }

    /// Checks a computed complexity against the configured limit.
    pub fn check(&self, complexity: usize) -> Result<(), ComplexityError> {
        match *self {
            ComplexityControl::Enforce { limit, .. } if complexity > limit => {
                Err(ComplexityError::QueryTooComplex { complexity, limit })
            }
            ComplexityControl::Measure { limit: Some(limit), .. } if complexity > limit => {
                tracing::warn!(complexity, limit, "Query exceeds the configured complexity limit");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl From<&ComplexityControlConfig> for ComplexityControl {
    fn from(config: &ComplexityControlConfig) -> Self {
        let list_size = |config: &ComplexityControlConfig| {
            config.list_size.unwrap_or_else(|| {
                tracing::warn!(
                    "Complexity control enabled without setting list_size.  Assuming a list_size of {DEFAULT_LIST_SIZE}"
                );
                DEFAULT_LIST_SIZE
            })
        };

        match (config.mode, config.limit) {
            (None, _) => ComplexityControl::Disabled,
            (Some(ComplexityControlMode::Enforce), Some(limit)) => ComplexityControl::Enforce {
                limit,
                list_size: list_size(config),
            },
            (Some(ComplexityControlMode::Enforce), None) => {
                tracing::warn!(
                    "Complexity control is configured to enforce limits but a limit was not configured.  Complexity will only be measured"
                );
                ComplexityControl::Measure {
                    limit: None,
                    list_size: list_size(config),
                }
            }
            (Some(ComplexityControlMode::Measure), limit) => ComplexityControl::Measure {
                limit,
                list_size: list_size(config),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(input: &str) -> ComplexityControl {
        let config: ComplexityControlConfig = toml::from_str(input).unwrap();
        ComplexityControl::from(&config)
    }

    #[test]
    fn disabled_without_a_mode() {
        let control = control("limit = 10");

        assert_eq!(control, ComplexityControl::Disabled);
        assert!(!control.is_enabled());
        assert_eq!(control.check(usize::MAX), Ok(()));
    }

    #[test]
    fn enforce_rejects_queries_over_the_limit() {
        let control = control(indoc::indoc! {r#"
            mode = "enforce"
            limit = 10
            list_size = 5
        "#});

        assert!(control.is_enforce());
        assert_eq!(control.list_size(), Some(5));
        assert_eq!(control.check(10), Ok(()));
        insta::assert_snapshot!(
            control.check(11).unwrap_err(),
            @"Query has complexity of 11, which exceeds max complexity of 10"
        );
    }

    #[test]
    fn enforce_without_limit_only_measures() {
        let control = control(r#"mode = "enforce""#);

        assert_eq!(
            control,
            ComplexityControl::Measure {
                limit: None,
                list_size: 10
            }
        );
        assert_eq!(control.check(1_000), Ok(()));
    }

    #[test]
    fn measure_never_rejects() {
        let control = control(indoc::indoc! {r#"
            mode = "measure"
            limit = 1
        "#});

        assert_eq!(control.limit(), Some(1));
        assert_eq!(control.check(100), Ok(()));
    }
}
