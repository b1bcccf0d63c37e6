use thiserror::Error;

use crate::parse::ParseError;
use crate::{DocumentError, IndexError, ValidationError};

/// Unified error type covering parsing, validation, indexing, and I/O.
///
/// Returned by convenience methods like [`Criteria::from_dsl()`](crate::Criteria::from_dsl)
/// and [`IndexGroup::load_file()`](crate::IndexGroup::load_file).
#[derive(Debug, Error)]
pub enum BoolmatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
