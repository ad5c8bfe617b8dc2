use crate::QueryId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplexityError {
    /// The configured cost calculation mode isn't one we know of.
    #[error("{0}")]
    UnknownCalculationMode(String),
    /// Enter and leave events of a query didn't nest.
    #[error("Unbalanced traversal of query {query} while leaving field '{response_key}'")]
    UnbalancedTraversal { query: QueryId, response_key: String },
    /// A field was entered and never left.
    #[error("Query {query} was finished with field '{response_key}' left open")]
    UnfinishedTraversal { query: QueryId, response_key: String },
    #[error("Future complexity cost calculation ({future}) and legacy complexity cost calculation ({legacy}) disagree")]
    CostMismatch { future: usize, legacy: usize },
    #[error("Query has complexity of {complexity}, which exceeds max complexity of {limit}")]
    QueryTooComplex { complexity: usize, limit: usize },
}

/// Both totals computed in compare mode when they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostMismatch {
    pub future: usize,
    pub legacy: usize,
}

impl From<CostMismatch> for ComplexityError {
    fn from(CostMismatch { future, legacy }: CostMismatch) -> Self {
        ComplexityError::CostMismatch { future, legacy }
    }
}
