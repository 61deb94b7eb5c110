//! Error model for the hub and queue.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The queue's subscriber list lock was poisoned by a panicking publisher.
    #[error("queue lock poisoned")]
    QueuePoisoned,
}
