use tenancy_models::SchemaNameError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error(transparent)]
    InvalidSchemaName(#[from] SchemaNameError),

    #[error("Database error: {0}")]
    Other(String),
}

impl DatabaseError {
    pub fn duplicate(entity: &str, field: &str) -> Self {
        Self::DuplicateEntry(format!("{} with {} already exists", entity, field))
    }
}
