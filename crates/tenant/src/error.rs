use std::path::PathBuf;
use tenancy_database::DatabaseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TenantError>;

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("No tenant registered for hostname '{0}'")]
    TenantNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Settings load failure: {0}")]
    SettingsLoadFailure(#[from] SettingsError),
}

impl TenantError {
    /// Whether the error is the caller's fault (unknown host) rather than a system fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TenantNotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings source {} is unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings source {} is malformed: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Settings strategy '{0}' does not implement loading")]
    UnimplementedStrategy(String),
}
