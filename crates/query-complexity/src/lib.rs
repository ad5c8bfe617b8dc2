//! Static worst-case complexity of GraphQL operations.
//!
//! A traversal driver feeds enter/leave field events into a [`ComplexityAnalysis`], which records
//! one scope tree per query. Selections of the same response key on the same type share a scope,
//! whichever fragment they come from. Once every query has been traversed,
//! [`ComplexityAnalysis::finish`] merges each tree into a cost: at every depth the most expensive
//! possible runtime type is retained, so the result is an upper bound of the actual cost.
//!
//! [`document`] provides such a driver for documents parsed with `cynic-parser`, and [`sdl`] a
//! schema built from SDL with `@cost` and `@listSize` support.

mod analysis;
mod builder;
mod control;
pub mod document;
mod error;
mod merge;
mod mode;
pub mod possible_types;
mod schema;
mod scope;
pub mod sdl;

#[cfg(test)]
mod testing;

pub use analysis::{ComplexityAnalysis, ComplexityReport};
pub use builder::{FieldEdge, QueryId, ScopeBuilder};
pub use complexity_config::{ComplexityConfig, ComplexityControlConfig, ComplexityControlMode};
pub use control::ComplexityControl;
pub use document::{analyze_document, DocumentError, SchemaLookup, Variables};
pub use error::{ComplexityError, CostMismatch};
pub use merge::FieldComplexity;
pub use mode::CostCalculationMode;
pub use schema::{ComplexitySchema, SelectionNode};
pub use scope::{Scope, ScopeId, ScopeTree};
pub use sdl::{SchemaError, SdlSchema};

#[cfg(test)]
use tracing_subscriber as _;
