use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Short machine-readable label, used as a metric and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DbError::NotConfigured => "not_configured",
            #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
            DbError::Sqlx(_) => "query_failed",
            #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
            DbError::Migration(_) => "migration_failed",
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
