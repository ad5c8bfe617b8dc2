#[derive(Debug, Default, serde::Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ComplexityControlConfig {
    /// Complexity control is disabled when unset.
    pub mode: Option<ComplexityControlMode>,
    pub limit: Option<usize>,
    /// Number of items assumed for list fields without a `@listSize` directive. Defaults to 10
    /// once a mode is set. Lists count as a single item while control is disabled.
    pub list_size: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityControlMode {
    Measure,
    Enforce,
}
