use arc_swap::ArcSwap;
use std::sync::Arc;
use tenancy_models::Settings;

/// Process-wide pointer to the configuration currently in effect
///
/// Only meaningful when requests are handled one at a time. Concurrent
/// handlers must read the snapshot attached to their own request.
#[derive(Clone)]
pub struct ActiveSettings {
    current: Arc<ArcSwap<Settings>>,
}

impl ActiveSettings {
    pub fn new(initial: Arc<Settings>) -> Self {
        Self {
            current: Arc::new(ArcSwap::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    pub fn set(&self, settings: Arc<Settings>) {
        self.current.store(settings);
    }
}

impl std::fmt::Debug for ActiveSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSettings")
            .field("keys", &self.load().len())
            .finish()
    }
}
