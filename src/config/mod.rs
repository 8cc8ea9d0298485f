mod settings;

pub use settings::{
    AgentsConfig, LLMConfig, LoggingConfig, OrchestratorConfig, Settings, DEFAULT_CARD_PATH,
    DEFAULT_CARD_TIMEOUT_SECS,
};
