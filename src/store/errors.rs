use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to decode {entity} row: {message}")]
    Decode {
        entity: &'static str,
        message: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A command inside a unit of work touched an unexpected number of rows.
    /// The whole unit has been rolled back when this is returned.
    #[error("{operation} affected {actual} rows (expected {expected})")]
    RowCountMismatch {
        operation: String,
        expected: u64,
        actual: u64,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        // 23505: unique_violation
        let unique_violation = error
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505");
        if unique_violation {
            StoreError::Conflict(error.to_string())
        } else {
            StoreError::Database(error.to_string())
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database(error.to_string())
    }
}
