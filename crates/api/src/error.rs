//! Startup-time failures. Anything here stops the server before it binds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route path '{0}' must start with '/' and hold only literal segments")]
    InvalidRoutePath(String),

    #[error("path must end with /*filepath in path '{0}'")]
    InvalidStaticPath(String),

    #[error("trigger sub-path '{0}' must be a non-empty literal path")]
    InvalidTriggerPath(String),

    #[error("trigger sub-path '{0}' is registered twice")]
    DuplicateTrigger(String),

    #[error("trigger '{0}' supplies neither a GET nor a POST handler")]
    EmptyTrigger(String),

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(String),

    #[error("{method} {path} is already routed")]
    RouteConflict { method: String, path: String },
}
