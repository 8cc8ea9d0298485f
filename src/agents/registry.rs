//! Model Registry
//!
//! Information Hiding:
//! - Storage layout (map + insertion order) hidden
//! - Insert-if-absent: an existing name is never overwritten

use crate::config::AgentsConfig;
use crate::core::a2a::{fetch_agent_cards, AgentCard};
use crate::error::{Code, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registered agent cards keyed by name
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<AgentCard>>,
    order: Vec<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card under `name`; a taken name reports `Conflict` and leaves the old card
    pub fn register(&mut self, name: impl Into<String>, card: AgentCard) -> Result<Code> {
        let name = name.into();
        if self.models.contains_key(&name) {
            tracing::warn!("[ModelRegistry] Agent '{}' already registered", name);
            return Err(Error::Conflict(name));
        }

        tracing::info!("[ModelRegistry] Registering agent: {}", name);
        self.order.push(name.clone());
        self.models.insert(name, Arc::new(card));
        Ok(Code::ok("registered"))
    }

    /// Register cards in order, skipping names that are already taken.
    ///
    /// Returns how many cards were newly registered.
    pub fn register_all(&mut self, cards: impl IntoIterator<Item = AgentCard>) -> usize {
        let mut registered = 0;
        for card in cards {
            if self.register(card.name.clone(), card).is_ok() {
                registered += 1;
            }
        }
        registered
    }

    /// Build a registry straight from the configured agent endpoints.
    ///
    /// Needs no LLM backend or credential. Fails as a whole if any card fails.
    pub async fn discover(agents: &AgentsConfig) -> Result<Self> {
        let cards = fetch_agent_cards(&agents.urls, &agents.card_path, agents.timeout_secs).await?;

        let mut registry = Self::new();
        registry.register_all(cards);
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<Arc<AgentCard>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered names in insertion order
    pub fn list(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Describe every registered agent for the decision prompt
    pub fn agents_prompt(&self) -> String {
        let mut descriptions = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let Some(card) = self.models.get(name) else {
                continue;
            };

            let mut entry = format!("Agent: {}\nDescription: {}", card.name, card.description);
            if !card.skills.is_empty() {
                let skills = card
                    .skills
                    .iter()
                    .map(|s| {
                        if s.description.is_empty() {
                            format!("  - {}", s.name)
                        } else {
                            format!("  - {}: {}", s.name, s.description)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                entry.push_str("\nSkills:\n");
                entry.push_str(&skills);
            }
            descriptions.push(entry);
        }
        descriptions.join("\n\n")
    }
}
