//! Recording fakes for tests

use crate::error::{DatabaseError, Result};
use crate::schema::{Persistence, PersistenceFactory, SchemaTarget};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tenancy_models::DEFAULT_PUBLIC_SCHEMA;

/// Ordered log of collaborator calls, shareable between fakes
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }
}

/// Persistence that records `set_schema:<name>` instead of talking to a database
pub struct RecordingPersistence {
    log: CallLog,
    public_schema: String,
    fail_on: Option<String>,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            public_schema: DEFAULT_PUBLIC_SCHEMA.to_string(),
            fail_on: None,
        }
    }

    /// Make switching to `schema_name` fail
    pub fn failing_on(mut self, schema_name: &str) -> Self {
        self.fail_on = Some(schema_name.to_string());
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl Default for RecordingPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistence for RecordingPersistence {
    fn public_schema(&self) -> &str {
        &self.public_schema
    }

    async fn set_schema(&mut self, target: &SchemaTarget) -> Result<()> {
        let name = match target {
            SchemaTarget::Public => self.public_schema.as_str(),
            SchemaTarget::Tenant(name) => name.as_str(),
        };
        if self.fail_on.as_deref() == Some(name) {
            return Err(DatabaseError::Other(format!(
                "schema {} does not exist",
                name
            )));
        }
        self.log.push(format!("set_schema:{}", name));
        Ok(())
    }
}

/// Hands out [`RecordingPersistence`] bindings that share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingPersistenceFactory {
    log: CallLog,
}

impl RecordingPersistenceFactory {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl PersistenceFactory for RecordingPersistenceFactory {
    async fn acquire(&self) -> Result<Box<dyn Persistence>> {
        Ok(Box::new(RecordingPersistence::with_log(self.log.clone())))
    }
}
