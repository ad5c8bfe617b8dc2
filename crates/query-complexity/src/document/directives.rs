use cynic_parser::{
    executable::{Directive, Iter, VariableDefinition},
    ConstValue, Value,
};

use super::{DocumentError, Variables};

/// Variable values seen by an operation: those of the request, then the declared defaults.
pub(super) struct VariableValues<'a, 'doc> {
    pub(super) request: &'a Variables,
    pub(super) definitions: Vec<VariableDefinition<'doc>>,
}

impl VariableValues<'_, '_> {
    fn boolean(&self, name: &str) -> Option<bool> {
        if let Some(value) = self.request.get(name) {
            return value.as_bool();
        }

        let default_value = self
            .definitions
            .iter()
            .find(|definition| definition.name() == name)?
            .default_value()?;

        match default_value {
            ConstValue::Boolean(value) => Some(value.value()),
            _ => None,
        }
    }
}

/// Whether `@skip` or `@include` exclude the selection carrying `directives`.
pub(super) fn is_excluded(
    directives: Iter<'_, Directive<'_>>,
    variables: &VariableValues<'_, '_>,
) -> Result<bool, DocumentError> {
    for directive in directives {
        let excluded_if = match directive.name() {
            "skip" => true,
            "include" => false,
            _ => continue,
        };

        if condition(directive, variables)? == excluded_if {
            return Ok(true);
        }
    }

    Ok(false)
}

fn condition(directive: Directive<'_>, variables: &VariableValues<'_, '_>) -> Result<bool, DocumentError> {
    let invalid = || DocumentError::InvalidCondition(directive.name().to_owned());

    let argument = directive
        .arguments()
        .find(|argument| argument.name() == "if")
        .ok_or_else(invalid)?;

    match argument.value() {
        Value::Boolean(value) => Ok(value.value()),
        Value::Variable(variable) => variables
            .boolean(variable.name())
            .ok_or_else(|| DocumentError::InvalidVariable {
                directive: directive.name().to_owned(),
                variable: variable.name().to_owned(),
            }),
        _ => Err(invalid()),
    }
}
