use sea_orm::error::DbErr;
use sea_orm::{SqlErr, TransactionError};

/// Errors surfaced by the persistence layer.
///
/// `NotFound`, `UniqueConstraint`, `ValidationError` and `IntegrityError` form the
/// constraint-violation family: they are returned to callers exactly as detected and
/// are never converted into a default value.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueConstraint(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::from_db(db_err),
            TransactionError::Transaction(err) => err,
        }
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Classifies a driver error. Constraint violations reported by the database
    /// itself (e.g. a concurrent write that slipped past the pre-checks) map onto
    /// the same variants the pre-checks produce. A foreign-key violation is read as
    /// deleting a row that is still referenced.
    pub fn from_db<E: IntoDbErr>(error: E) -> Self {
        let error = error.into_db_err();
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => ServiceError::UniqueConstraint(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                ServiceError::IntegrityError(msg)
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// Classifies an error from an `INSERT` or `UPDATE`. There a foreign-key
    /// violation means the referenced parent row is gone, which is `NotFound`;
    /// [`from_db`](Self::from_db) keeps `IntegrityError` for deletes.
    pub fn from_write<E: IntoDbErr>(error: E) -> Self {
        let error = error.into_db_err();
        match error.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => ServiceError::NotFound(msg),
            _ => ServiceError::from_db(error),
        }
    }

    pub fn not_found(table: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{} with id {} does not exist", table, id))
    }

    /// True for the four constraint-violation variants.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::UniqueConstraint(_)
                | Self::ValidationError(_)
                | Self::IntegrityError(_)
        )
    }
}

pub type AppError = ServiceError;
