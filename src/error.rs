//! Error types for the warehouse monitor, request parsing, and task execution.

use thiserror::Error;

use crate::types::{Amount, Color};

/// A caller broke a warehouse precondition. State is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("{color} warehouse cannot receive {amount} units with only {free} free")]
    Overfill {
        color: Color,
        amount: Amount,
        free: Amount,
    },

    #[error("{color} warehouse cannot release {amount} units with only {stock} in stock")]
    Overdraw {
        color: Color,
        amount: Amount,
        stock: Amount,
    },
}

/// A request line was rejected; the display text is what the operator sees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid delivery or order format: expected 3 or 4 fields, found {0}.")]
    FieldCount(usize),

    #[error("Invalid {field} amount {value:?}: amounts must be non-negative integers.")]
    InvalidAmount { field: &'static str, value: String },

    #[error("Invalid color {0:?}. Color must be orange, blue, or aqua.")]
    UnknownColor(String),
}

/// A spawned task ended without producing a manifest.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task {0} exited without reporting a result")]
    Disconnected(usize),
}

/// Why an input line did not become a task.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("failed to schedule task: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Top-level failures surfaced by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} task(s) failed")]
    TasksFailed(usize),

    #[error("validation failed: {0}")]
    Validation(String),
}
