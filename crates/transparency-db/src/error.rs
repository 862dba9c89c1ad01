use thiserror::Error;
use transparency_core::CoreError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },

    #[error("Invalid value: {0}")]
    Core(#[from] CoreError),
}

impl DbError {
    pub(crate) fn invalid_row(table: &'static str, reason: impl Into<String>) -> Self {
        DbError::InvalidRow {
            table,
            reason: reason.into(),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
