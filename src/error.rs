use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown tool `{0}`")]
    ToolNotFound(String),

    #[error("invalid arguments for `{name}`: {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tool `{name}` failed: {message}")]
    ToolInvocation { name: String, message: String },

    #[error("request to model service failed: {0}")]
    Transport(String),

    #[error("model service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("model service rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transcript error: {0}")]
    Transcript(String),

    #[error("no final answer after {0} round-trips")]
    RoundTripLimit(usize),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
