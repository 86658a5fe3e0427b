use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::{Agent, Resolution};
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::memory::ConversationMemory;
use crate::message::Message;

pub const EXIT_COMMAND: &str = "exit";

const BANNER: &str =
    "Grok CLI: Enter your query (type 'exit' to quit). Tools and live search are enabled.";

/// Line-oriented chat loop that owns the conversation for the life of the process.
pub struct Session<M: LanguageModel> {
    agent: Agent<M>,
    conversation: ConversationMemory,
}

impl<M: LanguageModel> Session<M> {
    pub fn new(agent: Agent<M>, system_prompt: impl Into<String>) -> Self {
        Self {
            agent,
            conversation: ConversationMemory::with_system_prompt(system_prompt),
        }
    }

    pub fn conversation(&self) -> &ConversationMemory {
        &self.conversation
    }

    /// Append one utterance and resolve it.
    pub async fn respond(&mut self, utterance: impl Into<String>) -> Result<Resolution> {
        self.conversation.push(Message::user(utterance))?;
        self.agent.resolve(&mut self.conversation).await
    }

    /// Read utterances from `input` until `exit` or end of input, writing replies to `output`.
    ///
    /// Failures while resolving an utterance are printed and the loop carries on.
    pub async fn run<R, W>(&mut self, mut input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        output.write_all(format!("{BANNER}\n").as_bytes()).await?;

        loop {
            output.write_all(b"You: ").await?;
            output.flush().await?;

            line.clear();
            if input.read_until(b'\n', &mut line).await? == 0 {
                output.write_all(b"\n").await?;
                break;
            }
            // stray non-UTF-8 bytes are replaced rather than ending the session
            let text = String::from_utf8_lossy(&line);
            let utterance = text.trim();
            if utterance == EXIT_COMMAND {
                break;
            }

            match self.respond(utterance).await {
                Ok(resolution) => {
                    output
                        .write_all(render_reply(&resolution).as_bytes())
                        .await?;
                }
                Err(err) => {
                    tracing::error!(error = %err, "utterance abandoned");
                    output.write_all(format!("Error: {err}\n").as_bytes()).await?;
                }
            }
        }

        output.flush().await?;
        Ok(())
    }
}

fn render_reply(resolution: &Resolution) -> String {
    let mut out = format!("Grok: {}\n", resolution.content);
    if !resolution.citations.is_empty() {
        out.push_str("Citations:\n");
        for url in &resolution.citations {
            out.push_str(&format!("- {url}\n"));
        }
    }
    out
}
