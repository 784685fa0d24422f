use fresh_model::ModelBundle;
use parking_lot::RwLock;
use std::sync::Arc;

/// Process-wide handle to the active model bundle.
///
/// Readers take a cheap `Arc` clone and keep using it even if a retrain swaps
/// in a new bundle mid-request.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<ModelBundle>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(bundle: ModelBundle) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(bundle))),
        }
    }

    pub fn current(&self) -> Option<Arc<ModelBundle>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Swap in a new bundle, returning the one it replaced
    pub fn install(&self, bundle: ModelBundle) -> Option<Arc<ModelBundle>> {
        self.current.write().replace(Arc::new(bundle))
    }
}
