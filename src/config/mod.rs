//! Configuration module for the division model.
//!
//! Rule specifications mirror the surrounding simulator's model-file
//! layout: a flat numeric parameter list plus grouped attribute-column
//! indices per rule.

mod parameters;

pub use parameters::{DivisionParameters, RuleKind, RuleSpec};
