//! Model service abstraction, the xAI chat-completions client, and a scripted stub.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::ToolDescription;
use crate::config::{ModelConfig, SearchConfig};
use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};

/// How the model service may pick tools. The driver always leaves the choice to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Auto,
    On,
    Off,
}

/// Live-search augmentation requested alongside each chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub mode: SearchMode,
    pub return_citations: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            mode: SearchMode::Auto,
            return_citations: true,
        }
    }
}

impl From<&SearchConfig> for SearchParameters {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            mode: cfg.mode,
            return_citations: cfg.return_citations,
        }
    }
}

/// One round-trip's worth of input for the model service.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescription],
    pub tool_choice: ToolChoice,
    pub search: Option<&'a SearchParameters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl From<String> for FinishReason {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            _ => FinishReason::Other(raw),
        }
    }
}

impl From<FinishReason> for String {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Stop => "stop".into(),
            FinishReason::ToolCalls => "tool_calls".into(),
            FinishReason::Length => "length".into(),
            FinishReason::Other(raw) => raw,
        }
    }
}

/// The first choice of a chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCompletion {
    pub message: Message,
    pub finish_reason: FinishReason,
    pub citations: Vec<String>,
}

impl ModelCompletion {
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            finish_reason: FinishReason::Stop,
            citations: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            message: Message::assistant_tool_calls(None, calls),
            finish_reason: FinishReason::ToolCalls,
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }

    pub fn wants_tools(&self) -> bool {
        self.finish_reason == FinishReason::ToolCalls || self.message.requests_tools()
    }
}

/// Minimal abstraction around a chat completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete_chat(&self, request: ChatRequest<'_>) -> Result<ModelCompletion>;
}

fn coalesce_error(status: reqwest::StatusCode, body: String) -> AgentError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("model service rate limit exceeded");
        return AgentError::RateLimited(body);
    }
    AgentError::Service {
        status: status.as_u16(),
        body,
    }
}

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Client for xAI's OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct XaiClient {
    http: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl XaiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::build(
            api_key.into(),
            model.into(),
            DEFAULT_BASE_URL.to_string(),
            Duration::from_secs(120),
        )
    }

    pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("missing API key in model config".into()))?;
        Self::build(
            api_key,
            cfg.model.clone(),
            cfg.base_url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    fn build(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| AgentError::Transport(format!("http client error: {err}")))?,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
        messages
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: message.content.as_deref(),
                tool_calls: if message.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        message
                            .tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: &call.id,
                                r#type: "function",
                                function: WireFunctionCall {
                                    name: &call.name,
                                    arguments: &call.arguments,
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: message.tool_call_id.as_deref(),
                name: message.name.as_deref(),
            })
            .collect()
    }

    fn to_wire_tools(tools: &[ToolDescription]) -> Option<Vec<WireTool<'_>>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|tool| WireTool {
                    r#type: "function",
                    function: WireFunction {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        )
    }
}

#[async_trait]
impl LanguageModel for XaiClient {
    async fn complete_chat(&self, request: ChatRequest<'_>) -> Result<ModelCompletion> {
        let tools = Self::to_wire_tools(request.tools);
        let payload = WireRequest {
            model: &self.model,
            messages: Self::to_wire_messages(request.messages),
            tool_choice: tools.as_ref().map(|_| request.tool_choice),
            tools,
            search_parameters: request.search,
        };

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AgentError::Transport(err.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| AgentError::Transport(format!("reading response body: {err}")))?;
        if !status.is_success() {
            return Err(coalesce_error(status, body));
        }

        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|err| AgentError::Decode(format!("{err}")))?;
        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Decode("response contained no choices".into()))?;

        let tool_calls = first
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ModelCompletion {
            message: Message::assistant_tool_calls(first.message.content, tool_calls),
            finish_reason: first
                .finish_reason
                .map(FinishReason::from)
                .unwrap_or(FinishReason::Stop),
            citations: parsed.citations,
        })
    }
}

/// A deterministic model used for tests and demos.
///
/// Replies with the scripted completions in order and fails once they run out,
/// which doubles as a hard cap on how many round-trips a test can make.
pub struct StubModel {
    responses: Mutex<VecDeque<ModelCompletion>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl StubModel {
    pub fn new(responses: Vec<ModelCompletion>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of requests received so far, including the one that exhausted the script.
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("stub model poisoned").len()
    }

    /// Transcripts as they were sent with each request.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("stub model poisoned").clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete_chat(&self, request: ChatRequest<'_>) -> Result<ModelCompletion> {
        self.requests
            .lock()
            .expect("stub model poisoned")
            .push(request.messages.to_vec());
        let mut locked = self.responses.lock().expect("stub model poisoned");
        locked.pop_front().ok_or_else(|| {
            AgentError::LanguageModel("StubModel ran out of scripted responses".into())
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_parameters: Option<&'a SearchParameters>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireResponseFunction,
}

#[derive(Debug, Deserialize)]
struct WireResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
