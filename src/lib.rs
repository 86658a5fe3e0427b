//! Interactive agent that resolves tool calls against the xAI Grok chat API.
//!
//! The crate provides:
//! - A model service abstraction (`LanguageModel`) with an HTTP client and a scripted stub.
//! - A tool interface (`Tool` and `ToolRegistry`) plus the advertised tool catalog.
//! - An `Agent` that loops between the model and tools until a final answer arrives.
//! - A `Session` that reads utterances line by line and prints the answers.

mod agent;
mod catalog;
mod config;
mod error;
mod llm;
mod memory;
mod message;
mod session;
mod tool;
mod toolkit;
pub mod tools;

pub use agent::{Agent, Resolution};
pub use catalog::{default_catalog, ToolDescription};
pub use config::{AgentConfig, AppConfig, ModelConfig, SearchConfig};
pub use error::{AgentError, Result};
pub use llm::{
    ChatRequest, FinishReason, LanguageModel, ModelCompletion, SearchMode, SearchParameters,
    StubModel, ToolChoice, XaiClient,
};
pub use memory::ConversationMemory;
pub use message::{Message, Role, ToolCall};
pub use session::{Session, EXIT_COMMAND};
pub use tool::{decode_arguments, Tool, ToolRegistry};
pub use toolkit::builtin_toolkit;
