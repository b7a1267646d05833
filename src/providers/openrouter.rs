//! OpenAI-compatible chat completions client (OpenRouter by default).

use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;

use super::{
    check_http_response, CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role,
    UsageStats,
};

/// Default completions endpoint.
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model routed through OpenRouter.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

const APP_TITLE: &str = "SuperExpat";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages, system first.
    pub messages: Vec<ChatMessage>,
    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A message in chat completions format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    /// Role (`system`, `user`, `assistant`).
    pub role: &'static str,
    /// Text content.
    pub content: String,
}

/// Chat completions response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response choices.
    pub choices: Vec<ChatChoice>,
    /// Model that served the response.
    #[serde(default)]
    pub model: Option<String>,
    /// Token usage.
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// Assistant message for this choice.
    pub message: ChatResponseMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message in a response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    /// Reply text; `null` when the model produced none.
    #[serde(default)]
    pub content: Option<String>,
}

/// Usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    /// Prompt token count.
    pub prompt_tokens: Option<u32>,
    /// Completion token count.
    pub completion_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Chat completions provider for OpenRouter or any compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    model: String,
    endpoint: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Create a provider for `model` against the default OpenRouter endpoint.
    pub fn new(model: String, api_key: ApiKey) -> Self {
        Self::with_base_url(model, api_key, OPENROUTER_API_BASE.to_owned())
    }

    /// Create a provider against a custom completions endpoint.
    pub fn with_base_url(model: String, api_key: ApiKey, endpoint: String) -> Self {
        Self {
            model,
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint this provider posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a chat completions request body from a completion request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len().saturating_add(1));

    if let Some(system) = &request.system {
        messages.push(ChatMessage {
            role: Role::System.as_str(),
            content: system.clone(),
        });
    }

    messages.extend(request.messages.iter().map(|msg| ChatMessage {
        role: msg.role.as_str(),
        content: msg.content.clone(),
    }));

    ChatRequest {
        model: model.to_owned(),
        messages,
        max_tokens: request.max_tokens,
    }
}

/// Parse a chat completions response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body is not JSON, has no
/// `choices[0]`, or `choices[0].message.content` is missing or blank.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    let text = choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ProviderError::Parse("missing choices[0].message.content".to_owned()))?;

    let usage = UsageStats {
        input_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens)
            .unwrap_or(0),
        output_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or(0),
    };

    Ok(CompletionResponse {
        text,
        finish_reason: choice.finish_reason,
        usage,
        model: resp.model.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = build_request(&self.model, &request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key.expose()))
            .header("x-title", APP_TITLE)
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
