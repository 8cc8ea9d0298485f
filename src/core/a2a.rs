//! A2A agent card discovery
//!
//! Information Hiding:
//! - Well-known card location and HTTP handling hidden behind `CardResolver`
//! - Batch discovery is all-or-nothing: one bad endpoint fails the whole batch

use crate::error::{Error, Result};
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

pub use crate::config::DEFAULT_CARD_PATH;

/// Capability descriptor published by a remote agent.
///
/// Only `name` is required; fields this crate does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub capabilities: Value,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl AgentCard {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: None,
            version: None,
            capabilities: Value::Null,
            skills: Vec::new(),
            default_input_modes: Vec::new(),
            default_output_modes: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }
}

/// Resolves a base URL into the agent card served at its well-known path
pub struct CardResolver {
    client: Client,
    card_path: String,
}

impl CardResolver {
    pub fn new(client: Client, card_path: impl Into<String>) -> Self {
        Self {
            client,
            card_path: card_path.into(),
        }
    }

    fn card_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.card_path.trim_start_matches('/')
        )
    }

    pub async fn get_agent_card(&self, base_url: &str) -> Result<AgentCard> {
        let url = self.card_url(base_url);
        tracing::debug!("[CardResolver] Fetching agent card from {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let body = response.text().await?;
        let card: AgentCard = serde_json::from_str(&body).map_err(|e| Error::InvalidCard {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if card.name.trim().is_empty() {
            return Err(Error::InvalidCard {
                url,
                reason: "card has an empty name".to_string(),
            });
        }

        Ok(card)
    }
}

/// Fetch every agent card concurrently.
///
/// Returns one card per name in URL order, or the first error encountered.
/// When two endpoints publish the same name the later card replaces the earlier
/// one in place.
pub async fn fetch_agent_cards(
    urls: &[String],
    card_path: &str,
    timeout_secs: u64,
) -> Result<Vec<AgentCard>> {
    if urls.is_empty() {
        tracing::warn!("[CardResolver] No agent URLs configured");
        return Ok(Vec::new());
    }

    // One client per batch; dropped (and its connections released) on return
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    let resolver = CardResolver::new(client, card_path);

    tracing::info!("[CardResolver] Resolving {} agent cards", urls.len());

    let resolved = try_join_all(urls.iter().map(|url| resolver.get_agent_card(url))).await?;

    let mut cards: Vec<AgentCard> = Vec::with_capacity(resolved.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(resolved.len());
    for card in resolved {
        match positions.get(&card.name) {
            Some(&index) => {
                tracing::warn!("[CardResolver] Duplicate agent name '{}', keeping the later card", card.name);
                cards[index] = card;
            }
            None => {
                positions.insert(card.name.clone(), cards.len());
                cards.push(card);
            }
        }
    }

    tracing::info!(
        "[CardResolver] Resolved agents: {:?}",
        cards.iter().map(|card| card.name.as_str()).collect::<Vec<_>>()
    );
    Ok(cards)
}
