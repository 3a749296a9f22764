//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//! - Translate storage integrity failures into semantic errors.
//!
//! # Invariants
//! - Event writes must pass `Event::cleaned()` before persistence.
//! - Unique constraint failures surface as `RepoError::UniqueViolation`,
//!   never as raw transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::event::EventValidationError;
use rusqlite::ffi;
use thiserror::Error;
use uuid::Uuid;

pub mod attendee_repo;
pub mod event_repo;
pub mod identity_repo;
pub mod registration_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] EventValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    /// Carries the constraint message reported by storage, naming the columns.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
    #[error("`{0}` must run inside an open transaction")]
    TransactionRequired(&'static str),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl RepoError {
    /// Whether this is a unique violation on `table.column`.
    pub fn is_unique_violation_on(&self, table: &str, column: &str) -> bool {
        match self {
            Self::UniqueViolation { constraint } => {
                constraint.contains(&format!("{table}.{column}"))
            }
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &value {
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
            {
                return Self::UniqueViolation {
                    constraint: message.clone().unwrap_or_else(|| err.to_string()),
                };
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_count(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid count `{value}` in {column}")))
}
