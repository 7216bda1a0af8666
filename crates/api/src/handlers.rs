pub mod error;
pub mod health;
pub mod public;
pub mod settings;
pub mod tenant;

// Re-export common types
pub use error::ErrorResponse;
