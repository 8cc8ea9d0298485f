//! Switchboard - A2A agent discovery and LLM-driven dispatch decisions
//!
//! Discovers remote agents through their published agent cards, keeps them in
//! a registry, and asks a chat-completion model which agent should answer a
//! user's question.

pub mod agents;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::agents::{DecisionAgent, DecisionStream, ModelRegistry, PromptTemplates, DECISION_FALLBACK};
pub use crate::config::Settings;
pub use crate::core::a2a::{fetch_agent_cards, AgentCard, AgentSkill, CardResolver};
pub use crate::core::gateway::{GatewayOutput, LlmGateway, TokenCallback, TokenStream, TransportMode};
pub use crate::core::llm::{ChatBackend, ChatPrompt, LLMClient};
pub use crate::error::{Code, Error, Result};
