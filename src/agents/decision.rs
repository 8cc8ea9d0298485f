//! Decision Agent - asks the LLM which registered agent should answer
//!
//! Flow:
//! - Discover agent cards from the configured URLs and register them
//! - Render the decision prompt (question, agents, previously called agents)
//! - Ask the LLM once and yield its answer as the decision
//!
//! The agent does no selection itself; the LLM's free text is the decision.

use crate::agents::prompts::PromptTemplates;
use crate::agents::registry::ModelRegistry;
use crate::config::{AgentsConfig, Settings, DEFAULT_CARD_PATH, DEFAULT_CARD_TIMEOUT_SECS};
use crate::core::a2a::{fetch_agent_cards, AgentCard};
use crate::core::gateway::{LlmGateway, TokenCallback, TransportMode};
use crate::core::llm::{ChatBackend, ChatPrompt, LLMClient};
use crate::error::{Code, Result};
use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Yielded when the LLM produced no decision
pub const DECISION_FALLBACK: &str = "抱歉，无法获取决策结果。";

/// Lazy sequence of decision chunks
pub type DecisionStream = BoxStream<'static, String>;

pub struct DecisionAgent {
    mode: TransportMode,
    gateway: LlmGateway,
    templates: PromptTemplates,
    registry: Arc<RwLock<ModelRegistry>>,
    agents: AgentsConfig,
}

impl DecisionAgent {
    /// `mode` is "complete" or "stream"; anything else is `UnsupportedMode`
    pub fn new(mode: &str, backend: Arc<dyn ChatBackend>, agent_urls: Vec<String>) -> Result<Self> {
        let mode = mode.parse::<TransportMode>()?;

        Ok(Self {
            mode,
            gateway: LlmGateway::new(backend),
            templates: PromptTemplates::default(),
            registry: Arc::new(RwLock::new(ModelRegistry::new())),
            agents: AgentsConfig {
                urls: agent_urls,
                card_path: DEFAULT_CARD_PATH.to_string(),
                timeout_secs: DEFAULT_CARD_TIMEOUT_SECS,
            },
        })
    }

    /// Build against the configured OpenAI-compatible endpoint
    pub fn from_settings(settings: &Settings, api_key: String) -> Result<Self> {
        let client = LLMClient::new(api_key, settings.llm.clone())?;
        let agent = Self::new(
            &settings.orchestrator.mode,
            Arc::new(client),
            settings.agents.urls.clone(),
        )?;

        Ok(agent.with_card_source(&settings.agents.card_path, settings.agents.timeout_secs))
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_token_callback(mut self, callback: TokenCallback) -> Self {
        self.gateway = self.gateway.with_token_callback(callback);
        self
    }

    pub fn with_card_source(mut self, card_path: &str, timeout_secs: u64) -> Self {
        self.agents.card_path = card_path.to_string();
        self.agents.timeout_secs = timeout_secs;
        self
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    pub fn registry(&self) -> Arc<RwLock<ModelRegistry>> {
        self.registry.clone()
    }

    /// Fetch every configured agent card and register it in URL order.
    ///
    /// Any unreachable or malformed card fails the whole batch and registers nothing.
    /// Names that are already registered are skipped.
    pub async fn discover(&self) -> Result<Vec<AgentCard>> {
        let cards = fetch_agent_cards(
            &self.agents.urls,
            &self.agents.card_path,
            self.agents.timeout_secs,
        )
        .await?;

        let mut registry = self.registry.write().await;
        let registered = registry.register_all(cards.iter().cloned());

        tracing::info!(
            "[DecisionAgent] {} new agents registered, {} total",
            registered,
            registry.len()
        );
        Ok(cards)
    }

    pub async fn register(&self, name: &str, card: AgentCard) -> Result<Code> {
        self.registry.write().await.register(name, card)
    }

    pub async fn get_agent(&self, name: &str) -> Result<Arc<AgentCard>> {
        self.registry.read().await.get(name)
    }

    pub async fn list_agents(&self) -> Vec<String> {
        self.registry.read().await.list()
    }

    pub async fn agents_prompt(&self) -> String {
        self.registry.read().await.agents_prompt()
    }

    /// System prompt for one decision
    pub fn render_prompt(
        &self,
        question: &str,
        agents_prompt: &str,
        called_agents: Option<&[Value]>,
    ) -> String {
        let call_agent_prompt = self.templates.render_called_agents(called_agents);
        let prompt = self
            .templates
            .render_decision(question, agents_prompt, &call_agent_prompt);
        tracing::debug!("[DecisionAgent] Rendered decision prompt ({} chars)", prompt.len());
        prompt
    }

    /// Decide with a single complete call; always yields exactly one chunk.
    ///
    /// A failed or empty LLM call degrades to `DECISION_FALLBACK`.
    pub fn decide(
        &self,
        question: &str,
        agents_prompt: &str,
        called_agents: Option<&[Value]>,
    ) -> DecisionStream {
        let prompt = ChatPrompt::new(
            question,
            self.render_prompt(question, agents_prompt, called_agents),
        );
        let gateway = self.gateway.clone();

        let decision = stream! {
            let response = match gateway.complete(prompt).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("[DecisionAgent] LLM call failed: {}", e);
                    None
                }
            };

            match response {
                Some(decision) => {
                    yield decision;
                }
                None => {
                    tracing::warn!("[DecisionAgent] No decision from LLM, using fallback");
                    yield DECISION_FALLBACK.to_string();
                }
            }
        };

        decision.boxed()
    }

    /// Decide with a streamed call, yielding space-suffixed tokens as they arrive.
    ///
    /// The token callback, if set, sees the same tokens. A call that fails before
    /// producing any token yields `DECISION_FALLBACK`; a mid-stream failure ends the stream.
    pub fn decide_stream(
        &self,
        question: &str,
        agents_prompt: &str,
        called_agents: Option<&[Value]>,
    ) -> DecisionStream {
        let prompt = ChatPrompt::new(
            question,
            self.render_prompt(question, agents_prompt, called_agents),
        );
        let gateway = self.gateway.clone();

        let decision = stream! {
            let mut tokens = match gateway.stream(prompt).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::warn!("[DecisionAgent] LLM stream failed: {}", e);
                    yield DECISION_FALLBACK.to_string();
                    return;
                }
            };

            let mut produced = false;
            while let Some(token) = tokens.next().await {
                match token {
                    Ok(token) => {
                        produced = true;
                        yield token;
                    }
                    Err(e) => {
                        tracing::warn!("[DecisionAgent] LLM stream interrupted: {}", e);
                        break;
                    }
                }
            }

            if !produced {
                yield DECISION_FALLBACK.to_string();
            }
        };

        decision.boxed()
    }

    /// Decide using the configured transport mode
    pub fn respond(
        &self,
        question: &str,
        agents_prompt: &str,
        called_agents: Option<&[Value]>,
    ) -> DecisionStream {
        match self.mode {
            TransportMode::Complete => self.decide(question, agents_prompt, called_agents),
            TransportMode::Stream => self.decide_stream(question, agents_prompt, called_agents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::prompts::PromptTemplate;
    use crate::core::gateway::tests::StubBackend;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::Mutex;

    fn agent(backend: Arc<StubBackend>, mode: &str) -> DecisionAgent {
        DecisionAgent::new(mode, backend, vec![]).unwrap()
    }

    #[test]
    fn test_unsupported_mode_rejected_at_construction() {
        let backend = Arc::new(StubBackend::replying(Some("hello")));
        let err = DecisionAgent::new("turbo", backend.clone(), vec![]).err().unwrap();

        assert_eq!(err.envelope().code, 500);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decide_yields_llm_text() {
        let backend = Arc::new(StubBackend::replying(Some("hello")));
        let agent = agent(backend.clone(), "complete");

        let chunks: Vec<String> = agent.decide("q", "agents", None).collect().await;

        assert_eq!(chunks, vec!["hello"]);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_decide_falls_back_on_empty_result() {
        let backend = Arc::new(StubBackend::replying(None));
        let agent = agent(backend, "complete");

        let chunks: Vec<String> = agent.decide("q", "agents", None).collect().await;

        assert_eq!(chunks, vec![DECISION_FALLBACK]);
    }

    #[tokio::test]
    async fn test_decide_uses_complete_call_in_stream_mode() {
        let backend = Arc::new(StubBackend::replying(Some("route to A")));
        let agent = agent(backend, "stream");

        let chunks: Vec<String> = agent.decide("q", "agents", None).collect().await;

        assert_eq!(chunks, vec!["route to A"]);
    }

    #[tokio::test]
    async fn test_decide_is_lazy() {
        let backend = Arc::new(StubBackend::replying(Some("hello")));
        let agent = agent(backend.clone(), "complete");

        let decision = agent.decide("q", "agents", None);
        assert_eq!(backend.call_count(), 0);
        drop(decision);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decide_stream_tokens_and_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let backend = Arc::new(StubBackend::streaming(&["call ", "agent A"]));
        let agent = agent(backend, "stream")
            .with_token_callback(Arc::new(move |t: &str| sink.lock().unwrap().push(t.to_string())));

        let tokens: Vec<String> = agent.respond("q", "agents", None).collect().await;

        assert_eq!(tokens, vec!["call ", "agent ", "A "]);
        assert_eq!(*seen.lock().unwrap(), tokens);
    }

    #[tokio::test]
    async fn test_decide_stream_empty_falls_back() {
        let backend = Arc::new(StubBackend::streaming(&[]));
        let agent = agent(backend, "stream");

        let tokens: Vec<String> = agent.decide_stream("q", "agents", None).collect().await;

        assert_eq!(tokens, vec![DECISION_FALLBACK]);
    }

    #[test]
    fn test_render_prompt_with_and_without_history() {
        let backend = Arc::new(StubBackend::replying(None));
        let agent = agent(backend, "complete").with_templates(PromptTemplates::new(
            PromptTemplate::new("[{{ question }}][{{ agents_prompt }}][{{ call_agent_prompt }}]"),
            PromptTemplate::new("history: {{ called_agents }}"),
        ));

        assert_eq!(agent.render_prompt("q", "A, B", None), "[q][A, B][ ]");

        let history = vec![json!({"name": "A"})];
        assert_eq!(
            agent.render_prompt("q", "A, B", Some(history.as_slice())),
            "[q][A, B][history: - {\"name\":\"A\"}]"
        );
    }

    #[tokio::test]
    async fn test_register_through_agent() {
        let backend = Arc::new(StubBackend::replying(None));
        let agent = agent(backend, "complete");

        agent.register("A", AgentCard::new("A", "first")).await.unwrap();
        let conflict = agent.register("A", AgentCard::new("A", "second")).await;
        agent.register("B", AgentCard::new("B", "second")).await.unwrap();

        assert!(matches!(conflict, Err(Error::Conflict(_))));
        assert_eq!(agent.list_agents().await, vec!["A", "B"]);
        assert_eq!(agent.get_agent("A").await.unwrap().description, "first");
        assert!(matches!(agent.get_agent("C").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_discover_registers_in_url_order() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let names = ["zeta", "alpha", "mid", "beta", "omega"];
        let mut servers = Vec::new();
        for name in names {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path(DEFAULT_CARD_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": name})))
                .mount(&server)
                .await;
            servers.push(server);
        }
        let urls = servers.iter().map(|s| s.uri()).collect();
        let agent = DecisionAgent::new("complete", Arc::new(StubBackend::replying(None)), urls).unwrap();

        let cards = agent.discover().await.unwrap();

        assert_eq!(cards.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), names);
        assert_eq!(agent.list_agents().await, names);
        assert!(agent.agents_prompt().await.starts_with("Agent: zeta"));
    }

    #[test]
    fn test_default_card_source() {
        let agent = agent(Arc::new(StubBackend::replying(None)), "complete");

        assert_eq!(agent.agents.card_path, DEFAULT_CARD_PATH);
        assert_eq!(agent.agents.timeout_secs, DEFAULT_CARD_TIMEOUT_SECS);
    }
}
