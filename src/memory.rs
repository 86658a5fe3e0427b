use std::collections::HashSet;

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};

/// In-memory, append-only transcript.
///
/// Appends are checked so that tool calls only ride on assistant messages and
/// every tool result answers a call some earlier assistant message made.
#[derive(Default, Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    requested_calls: HashSet<String>,
}

impl ConversationMemory {
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut memory = Self::default();
        memory.messages.push(Message::system(prompt));
        memory
    }

    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.requests_tools() && message.role != Role::Assistant {
            return Err(AgentError::Transcript(format!(
                "{} message cannot carry tool calls",
                message.role.as_str()
            )));
        }
        if message.role == Role::Tool {
            let id = message.tool_call_id.as_deref().ok_or_else(|| {
                AgentError::Transcript("tool message is missing its tool_call_id".into())
            })?;
            if !self.requested_calls.contains(id) {
                return Err(AgentError::Transcript(format!(
                    "tool result `{id}` does not answer any earlier tool call"
                )));
            }
        }

        self.requested_calls
            .extend(message.tool_calls.iter().map(|call| call.id.clone()));
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
