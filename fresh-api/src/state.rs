use fresh_engine::{BatchPredictor, ModelLifecycle, ModelRegistry, PricePredictor};
use fresh_store::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub predictor: PricePredictor,
    pub batch: BatchPredictor,
    pub lifecycle: Arc<ModelLifecycle>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(ModelRegistry::new());

        Self {
            predictor: PricePredictor::new(registry.clone()),
            batch: BatchPredictor::new(config.batch.max_size),
            lifecycle: Arc::new(ModelLifecycle::new(&config.model, registry)),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.predictor.registry()
    }
}
