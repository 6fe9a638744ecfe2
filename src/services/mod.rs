//! Storefront operations.
//!
//! Every operation takes an explicit connection so the caller decides whether
//! it runs on a pooled connection or inside a wider transaction.

pub mod accounts;
pub mod carts;
pub mod catalog;
pub mod customers;
pub mod orders;
pub mod payments;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Could not read the payment authorization: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(#[from] DieselError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Whether the failure comes from the database rather than from the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Database(_))
    }
}

pub(crate) fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

pub(crate) fn is_foreign_key_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}
