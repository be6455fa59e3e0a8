use thiserror::Error;

use crate::traits::OrderStoreError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database driver error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl SqliteDatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SqliteDatabaseError::DriverError(sqlx::Error::Database(e)) if e.is_unique_violation())
    }

    /// True if this is a unique constraint violation on `column`. SQLite names the offending `table.column` in the
    /// message.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(
            self,
            SqliteDatabaseError::DriverError(sqlx::Error::Database(e))
                if e.is_unique_violation() && e.message().contains(column)
        )
    }
}

impl From<SqliteDatabaseError> for OrderStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
