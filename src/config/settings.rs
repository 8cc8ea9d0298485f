use crate::error::{Error, Result};
use ::config::{Config, ConfigBuilder, ConfigError, Environment, File};
use ::config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub agents: AgentsConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

/// Chat-completion backend. `base_url` and `model` have no built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub urls: Vec<String>,
    pub card_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// "complete" or "stream"; parsed when the decision agent is built
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

pub const DEFAULT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Per-request timeout for agent card fetches
pub const DEFAULT_CARD_TIMEOUT_SECS: u64 = 10;

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::defaults()?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("SWITCHBOARD").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Load from an explicit file, without environment overrides
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from(path))
            .build()?;

        config.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("llm.max_tokens", 2048)?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.timeout_secs", 60)?
            .set_default("agents.urls", Vec::<String>::new())?
            .set_default("agents.card_path", DEFAULT_CARD_PATH)?
            .set_default("agents.timeout_secs", DEFAULT_CARD_TIMEOUT_SECS)?
            .set_default("orchestrator.mode", "stream")?
            .set_default("logging.level", "info")
    }

    pub fn api_key() -> Result<String> {
        env::var("SWITCHBOARD_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                Error::Config(
                    "SWITCHBOARD_API_KEY (or OPENAI_API_KEY) environment variable not set"
                        .to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[llm]
base_url = "http://localhost:9999/v1"
model = "test-model"

[agents]
urls = ["http://a.local", "http://b.local"]
"#
        )
        .unwrap();

        let settings = Settings::from_path(file.path()).unwrap();

        assert_eq!(settings.llm.base_url, "http://localhost:9999/v1");
        assert_eq!(settings.llm.model, "test-model");
        assert_eq!(settings.llm.max_tokens, 2048);
        assert_eq!(settings.agents.urls.len(), 2);
        assert_eq!(settings.agents.card_path, DEFAULT_CARD_PATH);
        assert_eq!(settings.agents.timeout_secs, DEFAULT_CARD_TIMEOUT_SECS);
        assert_eq!(settings.orchestrator.mode, "stream");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_missing_endpoint_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[llm]\nmodel = \"m\"").unwrap();

        assert!(Settings::from_path(file.path()).is_err());
    }
}
