pub mod app_config;
pub mod artifacts;

pub use app_config::{BatchConfig, Config, ModelConfig, ServerConfig};
pub use artifacts::{ArtifactError, ArtifactStore};
