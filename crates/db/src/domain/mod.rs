//! Saved-filter domains: literal-only parsing and evaluation.
//!
//! A saved filter stores its query as text, e.g.
//! `[('state', '=', 'draft'), ('amount', '>', 100)]`. The text is parsed as a
//! plain literal (never executed) and compiled into a [`Domain`] that can be
//! matched against JSON records.

mod literal;
mod predicate;

use addons_core::AppError;
use thiserror::Error;

use crate::SavedFilter;

pub use literal::{Literal, MAX_DEPTH, parse_literal};
pub use predicate::{Condition, Domain, Operator, Term};

/// Errors raised while parsing or building a domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("unexpected end of domain")]
    UnexpectedEnd,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("`{0}` is not a literal")]
    NonLiteral(String),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    #[error("domain nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("malformed domain: {0}")]
    Malformed(String),

    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),

    #[error("expected exactly one saved filter, found {found}")]
    ExpectedSingleton { found: usize },
}

impl From<DomainError> for AppError {
    #[inline]
    fn from(e: DomainError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl SavedFilter {
    /// Parse the stored domain text into an executable predicate.
    ///
    /// # Errors
    /// Fails closed: anything other than a well-formed literal domain is an error.
    pub fn evaluate_domain(&self) -> Result<Domain, DomainError> {
        Domain::from_literal(&parse_literal(&self.domain)?)
    }
}

/// Evaluate the domain of exactly one saved filter.
///
/// # Errors
/// Returns [`DomainError::ExpectedSingleton`] unless `filters` holds exactly
/// one record, otherwise the parse error of that record's domain.
pub fn evaluate_domain(filters: &[SavedFilter]) -> Result<Domain, DomainError> {
    match filters {
        [filter] => filter.evaluate_domain(),
        _ => Err(DomainError::ExpectedSingleton {
            found: filters.len(),
        }),
    }
}
