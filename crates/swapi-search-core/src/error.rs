//! Record-level failures.
//!
//! Both error kinds are absorbed by the pipeline: the offending record is
//! logged and skipped, the batch carries on.

use thiserror::Error;

/// A detail body that does not match its resource type's schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' must be {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field '{field}' must be a list of strings, element {index} is {found}")]
    WrongElementType {
        field: &'static str,
        index: usize,
        found: &'static str,
    },
}

/// A validated record that still cannot be turned into a stored row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("no numeric trailing segment in identifier '{0}'")]
    UnparseableIdentifier(String),
    #[error("surrogate key {0} taken by a later record of the same type")]
    DuplicateKey(i64),
}
