//! Error types for the division core.
//!
//! Configuration problems are fatal and reported before the simulation
//! starts; geometry problems are recoverable and only defer a single
//! division to the next step. Mesh index inconsistencies are treated as
//! corrupted topology and panic at the access site.

use thiserror::Error;

/// Fatal configuration errors, detected at rule construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule `{rule}` expects {expected} parameters, got {got}")]
    ParameterCount {
        rule: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("rule `{rule}` expects {min}..={max} index groups, got {got}")]
    IndexGroupCount {
        rule: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("rule `{rule}`: column index {index} out of range for {table} table with {columns} columns")]
    ColumnOutOfRange {
        rule: &'static str,
        table: &'static str,
        index: usize,
        columns: usize,
    },

    #[error("rule `{rule}`: parameter `{name}` = {value} is not a valid flag (expected 0 or 1)")]
    InvalidFlag {
        rule: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("rule `{rule}`: parameter `{name}` = {value} out of range ({reason})")]
    ParameterRange {
        rule: &'static str,
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("rule `{rule}`: index group `{group}` must contain {expected} entries, got {got}")]
    IndexGroupLen {
        rule: &'static str,
        group: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Recoverable geometry failures during a single division attempt.
///
/// The caller skips the division for this step and re-evaluates the cell on
/// the next one; the mesh is guaranteed untouched.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("no admissible division chord for cell {cell}")]
    NoCandidate { cell: usize },

    #[error("degenerate division chord for cell {cell}: {reason}")]
    Degenerate { cell: usize, reason: &'static str },

    #[error("division of cell {cell} would create a daughter with near-zero area")]
    ZeroAreaDaughter { cell: usize },
}
