//! Error types for ledger validation
//!
//! Ordinary invalidity (a bad transaction, a rejected block) is never an
//! error; it is reported through `ValidationResult`, `bool` or omission.
//! The variants here signal caller bugs and configuration problems.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Economic validation failed: {0}")]
    EconomicValidation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
