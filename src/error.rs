//! Custom error types for the planning core.
//!
//! This module defines `StmError`, the single error type returned by the
//! quantity, expansion, estimation and task-tracking operations. Using the
//! `thiserror` crate, it gives every failure a stable variant and a readable
//! message so the presentation layer can re-prompt the operator.
//!
//! ## Error Hierarchy
//!
//! - **`InvalidValue`**: A numeric input that is non-finite or outside the
//!   physical bounds of the parameter it is assigned to.
//! - **`InvalidSweep`**: A sweep range that cannot be expanded, such as a zero
//!   step between distinct endpoints or a step pointing away from the stop.
//! - **`InvalidTransition`**: A task-set status change that the transition
//!   table forbids, including any attempt to leave `Finished` or `Error`.
//! - **`InvalidState`**: An operation requested while the task set is in a
//!   status that does not accept it (e.g. completing items before `Working`).
//! - **`ItemOutOfRange`** / **`TaskSetNotFound`**: Indices that do not refer
//!   to an existing work item or task set.
//!
//! None of these errors are fatal. Each is reported at the offending call and
//! nothing is retried internally.

use thiserror::Error;

use crate::task_set::TaskSetStatus;

/// Convenience alias for results using the core error type.
pub type AppResult<T> = std::result::Result<T, StmError>;

/// Errors produced by the planning core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StmError {
    /// Non-finite or out-of-domain numeric input.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Sweep range that cannot be expanded or counted.
    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    /// Status change rejected by the transition table.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Status before the rejected request.
        from: TaskSetStatus,
        /// Requested status.
        to: TaskSetStatus,
    },

    /// Operation not accepted in the current status.
    #[error("Cannot {operation} while task set is {status}")]
    InvalidState {
        /// Current status of the task set.
        status: TaskSetStatus,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Work item index past the end of the task set.
    #[error("Work item {index} out of range (task set has {len} items)")]
    ItemOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of items in the task set.
        len: usize,
    },

    /// Task set index past the end of the task list.
    #[error("Task set {0} not found")]
    TaskSetNotFound(usize),
}
