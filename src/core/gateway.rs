//! LLM Gateway - one chat-completion call per request, complete or streamed
//!
//! Information Hiding:
//! - Backend transport hidden behind `ChatBackend`
//! - Streamed output is re-chunked into whitespace-delimited tokens
//! - The token callback is an adapter over the same stream, never a second emitter

use crate::core::llm::{ChatBackend, ChatPrompt, ContentStream};
use crate::error::{Error, Result};
use async_stream::try_stream;
use futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Whether a call returns one blob or an incremental token sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Complete,
    Stream,
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "complete" => Ok(TransportMode::Complete),
            "stream" => Ok(TransportMode::Stream),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Complete => write!(f, "complete"),
            TransportMode::Stream => write!(f, "stream"),
        }
    }
}

/// Push-style observer of streamed tokens
pub type TokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Lazy, forward-only sequence of space-suffixed tokens.
///
/// Dropping it drops the underlying HTTP response.
pub struct TokenStream {
    inner: BoxStream<'static, Result<String>>,
}

impl TokenStream {
    /// Re-chunk raw content fragments into whitespace-delimited tokens
    pub fn from_content(content: ContentStream) -> Self {
        Self {
            inner: words(content).boxed(),
        }
    }

    /// Invoke `callback` with each token as it is yielded
    pub fn with_callback(self, callback: TokenCallback) -> Self {
        Self {
            inner: self
                .inner
                .inspect_ok(move |token: &String| callback(token.as_str()))
                .boxed(),
        }
    }

    /// Drain the stream, concatenating every token
    pub async fn collect_text(self) -> Result<String> {
        self.inner
            .try_fold(String::new(), |mut text, token| async move {
                text.push_str(&token);
                Ok(text)
            })
            .await
    }
}

impl Stream for TokenStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn words(mut content: ContentStream) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut pending = String::new();

        while let Some(fragment) = content.next().await {
            pending.push_str(&fragment?);

            // A word is only complete once the whitespace after it has arrived
            while let Some(end) = pending.find(char::is_whitespace) {
                let word: String = pending.drain(..end).collect();
                let separator = pending.chars().next().map(char::len_utf8).unwrap_or(0);
                pending.drain(..separator);

                if !word.is_empty() {
                    yield format!("{} ", word);
                }
            }
        }

        if !pending.is_empty() {
            yield format!("{} ", pending);
        }
    }
}

/// Result of one gateway call
pub enum GatewayOutput {
    Complete(Option<String>),
    Stream(TokenStream),
}

impl fmt::Debug for GatewayOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayOutput::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            GatewayOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn ChatBackend>,
    token_callback: Option<TokenCallback>,
}

impl LlmGateway {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            token_callback: None,
        }
    }

    pub fn with_token_callback(mut self, callback: TokenCallback) -> Self {
        self.token_callback = Some(callback);
        self
    }

    /// Call with a mode given as text; unknown modes fail before any request is made
    pub async fn call_with_mode(&self, mode: &str, prompt: ChatPrompt) -> Result<GatewayOutput> {
        let mode = mode.parse::<TransportMode>()?;
        self.call(mode, prompt).await
    }

    pub async fn call(&self, mode: TransportMode, prompt: ChatPrompt) -> Result<GatewayOutput> {
        match mode {
            TransportMode::Complete => Ok(GatewayOutput::Complete(self.complete(prompt).await?)),
            TransportMode::Stream => Ok(GatewayOutput::Stream(self.stream(prompt).await?)),
        }
    }

    pub async fn complete(&self, prompt: ChatPrompt) -> Result<Option<String>> {
        tracing::debug!(
            "[LlmGateway] complete: message={} chars, system={} chars",
            prompt.message.len(),
            prompt.system_prompt.len()
        );
        self.backend.complete(prompt).await
    }

    pub async fn stream(&self, prompt: ChatPrompt) -> Result<TokenStream> {
        tracing::debug!(
            "[LlmGateway] stream: message={} chars, system={} chars",
            prompt.message.len(),
            prompt.system_prompt.len()
        );
        let tokens = TokenStream::from_content(self.backend.stream(prompt).await?);

        Ok(match &self.token_callback {
            Some(callback) => tokens.with_callback(callback.clone()),
            None => tokens,
        })
    }
}
