use cynic_parser::type_system as ast;
use cynic_parser_deser::{ConstDeserializer, ValueDeserialize};

use super::SchemaError;

/// ```ignore,graphql
/// directive @cost(weight: Int!) on FIELD_DEFINITION
/// ```
#[derive(ValueDeserialize)]
struct CostDirective {
    weight: i32,
}

/// ```ignore,graphql
/// directive @listSize(assumedSize: Int, slicingArguments: [String!], sizedFields: [String!], requireOneSlicingArgument: Boolean = true) on FIELD_DEFINITION
/// ```
#[derive(ValueDeserialize)]
struct ListSizeDirective<'a> {
    #[deser(rename = "assumedSize")]
    assumed_size: Option<u32>,
    // Arguments on the current field to interpret as slice size
    #[deser(default = Vec::new(), rename = "slicingArguments")]
    slicing_arguments: Vec<&'a str>,
    // Accepted for compatibility, the size always applies to the field itself.
    #[deser(default = Vec::new(), rename = "sizedFields")]
    #[allow(dead_code)]
    sized_fields: Vec<&'a str>,
    #[deser(default = true, rename = "requireOneSlicingArgument")]
    #[allow(dead_code)]
    require_one_slicing_argument: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct ListSize {
    pub(super) assumed_size: Option<usize>,
    pub(super) slicing_arguments: Vec<String>,
}

#[derive(Debug, Default)]
pub(super) struct FieldDirectives {
    pub(super) weight: Option<usize>,
    pub(super) list_size: Option<ListSize>,
}

pub(super) fn ingest_field_directives<'a>(
    directives: impl Iterator<Item = ast::Directive<'a>>,
    location: impl Fn() -> String,
) -> Result<FieldDirectives, SchemaError> {
    let mut out = FieldDirectives::default();

    for directive in directives {
        match directive.name() {
            "cost" => {
                let cost = directive
                    .deserialize::<CostDirective>()
                    .map_err(|error| invalid("cost", location(), error))?;

                let weight = usize::try_from(cost.weight)
                    .map_err(|_| invalid("cost", location(), "the weight can't be negative"))?;

                out.weight = Some(weight);
            }
            "listSize" => {
                let list_size = directive
                    .deserialize::<ListSizeDirective<'_>>()
                    .map_err(|error| invalid("listSize", location(), error))?;

                out.list_size = Some(ListSize {
                    assumed_size: list_size.assumed_size.map(|size| size as usize),
                    slicing_arguments: list_size.slicing_arguments.into_iter().map(str::to_owned).collect(),
                });
            }
            _ => {}
        }
    }

    Ok(out)
}

fn invalid(directive: &'static str, location: String, error: impl ToString) -> SchemaError {
    SchemaError::InvalidDirective {
        directive,
        location,
        message: error.to_string(),
    }
}
