//! Event Module
//!
//! Values, rows and the probe events submitted in batches by queries.
//!
//! ## Responsibilities
//! - Typed attribute values with numeric widening
//! - Owned rows (the unit of storage and of every read result)
//! - Probe events and the borrowed context predicates evaluate against

mod row;
mod value;

pub use row::{MatchingContext, Row, StateEvent};
pub use value::Value;
