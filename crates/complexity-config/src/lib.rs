//! Configuration for the query complexity analysis.
//!
//! These are plain serde types, usually read from the `[complexity]` section of a TOML file. They
//! carry no logic: the `query-complexity` crate interprets them.

mod complexity_control;

pub use complexity_control::{ComplexityControlConfig, ComplexityControlMode};

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplexityConfig {
    /// Which cost merging algorithm to run: `future`, `legacy` or `compare`.
    ///
    /// The value is validated when an analysis runs, not when the configuration is read. Leaving it
    /// unset runs the legacy algorithm and logs a deprecation notice.
    pub calculation_mode: Option<String>,
    /// Whether introspection fields such as `__typename` are charged. `true` by default.
    pub count_introspection_fields: bool,
    /// Measuring or enforcing a complexity budget.
    pub control: ComplexityControlConfig,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            calculation_mode: None,
            count_introspection_fields: true,
            control: ComplexityControlConfig::default(),
        }
    }
}

impl ComplexityConfig {
    pub fn with_calculation_mode(mut self, mode: impl Into<String>) -> Self {
        self.calculation_mode = Some(mode.into());
        self
    }
}
