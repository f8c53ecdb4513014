//! Error types for schema construction

use thiserror::Error;

/// Core errors
///
/// Only raised while building a schema. Per-turn processing never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Schema root must be an object type, found {0}")]
    RootNotObject(String),

    #[error("Property '{0}' has children and cannot map entities directly")]
    NonLeafMapping(String),

    #[error("Invalid schema at '{path}': {message}")]
    InvalidSchema { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
