//! Tenant-specific settings swapped in for the duration of a request

pub mod active;
pub mod file;
pub mod loader;
pub mod overlay;

pub use active::ActiveSettings;
pub use file::{parse_settings, FileSettingsLoader};
pub use loader::{LoadOutcome, SettingsLoader};
pub use overlay::{SettingsFailurePolicy, SettingsScope, TenantSettingsOverlay};
