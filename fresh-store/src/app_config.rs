use fresh_model::TrainingParams;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 { 8000 }

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into(), "http://localhost:5000".into()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,
    /// Rows generated when no saved model exists at startup
    #[serde(default = "default_synthetic_samples")]
    pub synthetic_samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub training: TrainingParams,
}

fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_synthetic_samples() -> usize { 10_000 }
fn default_seed() -> u64 { 42 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
            synthetic_samples: default_synthetic_samples(),
            seed: default_seed(),
            training: TrainingParams::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_size: usize,
}

fn default_max_batch_size() -> usize { 1000 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_batch_size(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// Layered load: `default`, then `{RUN_MODE}` and `local` if present,
    /// then `FRESH__SECTION__KEY` environment overrides.
    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::from(dir.join("default")))
            .add_source(config::File::from(dir.join(&run_mode)).required(false))
            // not checked in
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(
                config::Environment::with_prefix("FRESH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default.toml"), "[server]\nport = 9100\n").unwrap();

        let config = Config::load_from(dir.path()).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.allowed_origins.len(), 2);
        assert_eq!(config.model.synthetic_samples, 10_000);
        assert_eq!(config.model.training.boosting.n_estimators, 100);
        assert_eq!(config.batch.max_size, 1000);
    }

    #[test]
    fn test_local_file_overrides_default() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[model]\ndir = \"artifacts\"\nsynthetic_samples = 500\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("local.toml"),
            "[model]\nsynthetic_samples = 50\n\n[model.training.boosting]\nmax_depth = 3\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();

        assert_eq!(config.model.dir, PathBuf::from("artifacts"));
        assert_eq!(config.model.synthetic_samples, 50);
        assert_eq!(config.model.training.boosting.max_depth, 3);
        assert_eq!(config.model.training.boosting.learning_rate, 0.1);
    }

    #[test]
    fn test_missing_default_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from(dir.path()).is_err());
    }
}
