use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::workflows::{ConfigDefinitionCreator, DefinitionOverride};

/// Main configuration structure for Microflow
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MicroflowConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Engine behaviour
    pub engine: EngineConfig,
    /// Per workflow type definition overrides, keyed by workflow type
    pub workflows: HashMap<String, DefinitionOverride>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log rejected triggers at info instead of debug
    pub log_rejections: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { log_rejections: true }
    }
}

impl MicroflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (microflow.toml)
    /// 3. Environment variables (prefixed with MICROFLOW__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("microflow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MICROFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration sources")?;
        let microflow_config: MicroflowConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(microflow_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn definition_creator(&self) -> ConfigDefinitionCreator {
        ConfigDefinitionCreator::new(self.workflows.clone())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<MicroflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = MicroflowConfig::load_env_file();
        MicroflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static MicroflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = MicroflowConfig::load_from(&dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.observability.log_level, "info");
        assert!(config.engine.log_rejections);
        assert!(config.workflows.is_empty());
    }

    #[test]
    fn test_save_and_reload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("microflow.toml");

        let mut config = MicroflowConfig::default();
        config.observability.json_logs = true;
        config.workflows.insert(
            "Holiday".to_string(),
            DefinitionOverride {
                title: Some("Holiday approval".to_string()),
                description: None,
                route: Some("holidays".to_string()),
            },
        );
        config.save_to_file(&path).unwrap();

        let loaded = MicroflowConfig::load_from(&path).unwrap();
        assert!(loaded.observability.json_logs);
        // Keys may come back case-folded depending on the source.
        let (_, holiday) = loaded
            .workflows
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("holiday"))
            .unwrap();
        assert_eq!(holiday.title.as_deref(), Some("Holiday approval"));
        assert_eq!(holiday.route.as_deref(), Some("holidays"));
    }

    #[test]
    fn test_global_config_is_loaded_once() {
        // .env loading happens inside the first access; callers never load it themselves.
        let first = config().unwrap();
        let second = config().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
