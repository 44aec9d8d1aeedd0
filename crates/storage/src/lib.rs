use std::future::Future;
use std::time::Duration;

use infokeeper_contracts::User;

#[cfg(feature = "memory")]
pub mod memory;
mod postgres;
pub mod resource;
pub mod specification;

pub use postgres::{PgStore, StoreConfig, migrate};
pub use resource::Resource;
pub use specification::{Filter, QueryArg, Specification, SpecificationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

impl ConstraintKind {
    fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(ConstraintKind::Unique),
            "23503" => Some(ConstraintKind::ForeignKey),
            "23514" => Some(ConstraintKind::Check),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    Timeout,
    Constraint {
        kind: ConstraintKind,
        constraint: String,
    },
    Backend(String),
    Sqlx(sqlx::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Timeout => write!(f, "storage operation timed out"),
            StorageError::Constraint { kind, constraint } => {
                write!(f, "storage constraint violated: {:?} {}", kind, constraint)
            }
            StorageError::Backend(message) => write!(f, "storage backend error: {}", message),
            StorageError::Sqlx(err) => write!(f, "storage sql error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &value
            && let Some(kind) = db.code().as_deref().and_then(ConstraintKind::from_sqlstate)
        {
            return StorageError::Constraint {
                kind,
                constraint: db.constraint().unwrap_or_default().to_string(),
            };
        }
        StorageError::Sqlx(value)
    }
}

/// Storage seam shared by every resource service.
///
/// `deadline` is the caller's remaining budget; implementations bound each
/// call by it and by their own query timeout, whichever is shorter.
pub trait VaultStore: Clone + Send + Sync + 'static {
    fn insert<R: Resource>(
        &self,
        record: &R,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn select<R: Resource>(
        &self,
        spec: &Specification,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<Vec<R>, StorageError>> + Send;

    fn insert_user(
        &self,
        user: &User,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn find_user_by_login(
        &self,
        login: &str,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<Option<User>, StorageError>> + Send;

    fn ping(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
