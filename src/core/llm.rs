use crate::config::LLMConfig;
use crate::error::{Error, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// One user message plus the system prompt that frames it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub message: String,
    pub system_prompt: String,
}

impl ChatPrompt {
    pub fn new(message: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_prompt: system_prompt.into(),
        }
    }

    fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(self.message.clone()),
            ChatMessage::system(self.system_prompt.clone()),
        ]
    }
}

/// Incremental content fragments as the backend produces them
pub type ContentStream = BoxStream<'static, Result<String>>;

/// Chat-completion backend seam; `LLMClient` talks HTTP, tests plug in stubs
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Full response text, or `None` when the backend returned no content
    async fn complete(&self, prompt: ChatPrompt) -> Result<Option<String>>;

    async fn stream(&self, prompt: ChatPrompt) -> Result<ContentStream>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client
pub struct LLMClient {
    client: Client,
    api_key: String,
    settings: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, settings: LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn request(&self, prompt: &ChatPrompt, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: prompt.messages(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "[LLMClient] API returned error status {}: {}",
                status,
                error_text
            );
            return Err(Error::Upstream(format!("API error {}: {}", status, error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for LLMClient {
    async fn complete(&self, prompt: ChatPrompt) -> Result<Option<String>> {
        let request = self.request(&prompt, false);
        tracing::debug!("[LLMClient] POST {} model={}", self.endpoint(), request.model);

        let response = self.send(&request).await?;
        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Upstream(format!("Response decode error: {}", e)))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    async fn stream(&self, prompt: ChatPrompt) -> Result<ContentStream> {
        let request = self.request(&prompt, true);
        tracing::debug!("[LLMClient] POST {} model={} (stream)", self.endpoint(), request.model);

        let response = self.send(&request).await?;

        Ok(sse_content(response).boxed())
    }
}

/// Content deltas from an SSE chat-completion body, ending at `[DONE]` or EOF
fn sse_content(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut lines = SseLines::default();

        'read: while let Some(chunk) = bytes.next().await {
            lines.feed(&chunk?);

            while let Some(line) = lines.next_line() {
                match parse_sse_line(&line?)? {
                    SseLine::Content(content) => {
                        yield content;
                    }
                    SseLine::Done => break 'read,
                    SseLine::Skip => {}
                }
            }
        }
    }
}

/// Splits raw body bytes into lines, decoding only once a line is complete.
///
/// Network chunks can end inside a multi-byte character, so bytes are kept
/// undecoded until the terminating `\n` arrives.
#[derive(Debug, Default)]
struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<Result<String>> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=newline).collect();

        Some(
            String::from_utf8(raw)
                .map(|line| line.trim_end().to_string())
                .map_err(|e| Error::Upstream(format!("Stream line is not UTF-8: {}", e))),
        )
    }
}

enum SseLine {
    Content(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| Error::Upstream(format!("Malformed stream chunk: {}", e)))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseLine::Content)
        .unwrap_or(SseLine::Skip))
}
