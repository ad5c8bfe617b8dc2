use std::{fmt, str::FromStr};

use crate::ComplexityError;

/// The cost merging algorithm used to compute the final complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostCalculationMode {
    /// The maximum across every possible runtime type, at every depth.
    Future,
    /// The historic approximation, kept so existing budgets keep their meaning.
    Legacy,
    /// Runs both and reports when they disagree.
    Compare,
}

impl CostCalculationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCalculationMode::Future => "future",
            CostCalculationMode::Legacy => "legacy",
            CostCalculationMode::Compare => "compare",
        }
    }

    /// Interprets the configured value, `None` meaning unset.
    pub fn from_setting(setting: Option<&str>) -> Result<Option<Self>, ComplexityError> {
        setting
            .map(|value| value.parse().map_err(ComplexityError::UnknownCalculationMode))
            .transpose()
    }
}

impl fmt::Display for CostCalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostCalculationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const VALUES: &[(&str, CostCalculationMode)] = &[
            ("future", CostCalculationMode::Future),
            ("legacy", CostCalculationMode::Legacy),
            ("compare", CostCalculationMode::Compare),
        ];

        VALUES
            .iter()
            .find(|(string, _mode)| string.eq_ignore_ascii_case(s))
            .map(|(_, mode)| *mode)
            .ok_or_else(|| {
                format!(
                    r#""{s}" is not a valid complexity cost calculation mode (expected one of {})."#,
                    VALUES
                        .iter()
                        .map(|(string, _mode)| *string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("future", CostCalculationMode::Future)]
    #[case("LEGACY", CostCalculationMode::Legacy)]
    #[case("Compare", CostCalculationMode::Compare)]
    fn mode_from_string(#[case] input: &str, #[case] expected: CostCalculationMode) {
        assert_eq!(CostCalculationMode::from_str(input), Ok(expected));
    }

    #[test]
    fn unset_mode() {
        assert_eq!(CostCalculationMode::from_setting(None), Ok(None));
    }

    #[test]
    fn invalid_mode() {
        let error = CostCalculationMode::from_setting(Some("fastest")).unwrap_err();

        insta::assert_snapshot!(error, @r###""fastest" is not a valid complexity cost calculation mode (expected one of future, legacy, compare)."###);
    }
}
