//! Structured filter expressions over stock records.
//!
//! Stores accept an [`Expr`] tree instead of ad-hoc query parameters so the
//! same scoping predicate can be shared between location, quant and move
//! queries, combined with `AND`/`OR`/`NOT`, and rewritten from one record
//! level to another (see [`rewrite`]).

pub mod expr;
pub mod rewrite;

pub use expr::{Condition, Expr, FieldValue, Operator, Record};
pub use rewrite::strip_relation_prefix;
