use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A pair of concurrent operations that cannot be merged without an explicit
/// policy decision.
///
/// Carries debug renderings of both sides so the session layer can surface
/// the pair to whatever resolution flow it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub left: String,
    pub right: String,
}

impl Conflict {
    pub fn new(left: &impl fmt::Debug, right: &impl fmt::Debug) -> Self {
        Self {
            left: format!("{left:?}"),
            right: format!("{right:?}"),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <> {}", self.left, self.right)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("conflict: {0}")]
    Conflict(Conflict),
    #[error("apply mismatch: {0}")]
    ApplyMismatch(String),
    #[error("parse error: {0}")]
    Parse(String),
}
