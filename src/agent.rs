use std::sync::Arc;

use crate::catalog::ToolDescription;
use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LanguageModel, ModelCompletion, SearchParameters, ToolChoice};
use crate::memory::ConversationMemory;
use crate::message::{Message, ToolCall};
use crate::tool::ToolRegistry;

/// Outcome of resolving one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub content: String,
    pub citations: Vec<String>,
    pub round_trips: usize,
}

/// What the driver does next after reading a completion.
#[derive(Debug)]
enum Step {
    Dispatch(Message),
    Finish(ModelCompletion),
}

/// Alternates between the model service and the tool registry until the model
/// produces a final answer.
pub struct Agent<M: LanguageModel> {
    model: Arc<M>,
    tools: ToolRegistry,
    catalog: Vec<ToolDescription>,
    search: Option<SearchParameters>,
    max_round_trips: Option<usize>,
}

impl<M: LanguageModel> Agent<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            tools: ToolRegistry::new(),
            catalog: Vec::new(),
            search: Some(SearchParameters::default()),
            max_round_trips: None,
        }
    }

    /// Install tool bindings and the catalog advertised for them.
    ///
    /// Fails if the two disagree on which tools exist.
    pub fn with_tools(mut self, tools: ToolRegistry, catalog: Vec<ToolDescription>) -> Result<Self> {
        tools.verify_catalog(&catalog)?;
        self.tools = tools;
        self.catalog = catalog;
        Ok(self)
    }

    pub fn with_search(mut self, search: Option<SearchParameters>) -> Self {
        self.search = search;
        self
    }

    /// Cap the model round-trips spent on one utterance. `None` or `Some(0)` means unbounded.
    pub fn with_max_round_trips(mut self, max_round_trips: Option<usize>) -> Self {
        self.max_round_trips = max_round_trips.filter(|&limit| limit > 0);
        self
    }

    /// Drive the model until it answers the latest utterance in `conversation`.
    ///
    /// Every message produced along the way is appended to `conversation`, so
    /// on error the transcript still holds whatever was exchanged before it.
    pub async fn resolve(&self, conversation: &mut ConversationMemory) -> Result<Resolution> {
        let mut round_trips = 0;

        loop {
            if let Some(limit) = self.max_round_trips {
                if round_trips >= limit {
                    tracing::warn!(limit, "round-trip limit reached without a final answer");
                    return Err(AgentError::RoundTripLimit(limit));
                }
            }

            let request = ChatRequest {
                messages: conversation.messages(),
                tools: &self.catalog,
                tool_choice: ToolChoice::Auto,
                search: self.search.as_ref(),
            };
            let completion = self.model.complete_chat(request).await?;
            round_trips += 1;

            match interpret(completion)? {
                Step::Dispatch(message) => {
                    tracing::debug!(
                        round_trip = round_trips,
                        calls = message.tool_calls.len(),
                        "model requested tools"
                    );
                    let calls = message.tool_calls.clone();
                    conversation.push(message)?;
                    self.dispatch(&calls, conversation).await?;
                }
                Step::Finish(completion) => {
                    let content = completion.message.content_text().to_string();
                    conversation.push(completion.message)?;
                    tracing::debug!(round_trips, "utterance resolved");
                    return Ok(Resolution {
                        content,
                        citations: completion.citations,
                        round_trips,
                    });
                }
            }
        }
    }

    /// Run a batch of calls in request order, appending one result per call.
    async fn dispatch(&self, calls: &[ToolCall], conversation: &mut ConversationMemory) -> Result<()> {
        for call in calls {
            tracing::info!(tool = %call.name, id = %call.id, "dispatching tool call");
            let output = self.tools.invoke(&call.name, &call.arguments).await;
            conversation.push(Message::tool_result(call, output))?;
        }
        Ok(())
    }
}

fn interpret(completion: ModelCompletion) -> Result<Step> {
    if !completion.wants_tools() {
        return Ok(Step::Finish(completion));
    }
    if !completion.message.requests_tools() {
        return Err(AgentError::Protocol(
            "model signaled tool calls but sent none".into(),
        ));
    }
    Ok(Step::Dispatch(completion.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::llm::{FinishReason, StubModel};
    use crate::message::Role;
    use crate::toolkit::builtin_toolkit;

    fn agent(model: Arc<StubModel>) -> Agent<StubModel> {
        Agent::new(model)
            .with_tools(builtin_toolkit(), default_catalog())
            .unwrap()
    }

    fn conversation(utterance: &str) -> ConversationMemory {
        let mut memory = ConversationMemory::with_system_prompt("You are a helpful AI agent.");
        memory.push(Message::user(utterance)).unwrap();
        memory
    }

    #[tokio::test]
    async fn returns_llm_response_without_tools() {
        let model = StubModel::new(vec![ModelCompletion::final_answer("Hello!")]);
        let agent = agent(model.clone());
        let mut memory = conversation("hi");

        let reply = agent.resolve(&mut memory).await.unwrap();

        assert_eq!(reply.content, "Hello!");
        assert_eq!(reply.round_trips, 1);
        assert_eq!(memory.len(), 3);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn executes_tool_then_replies() {
        let model = StubModel::new(vec![
            ModelCompletion::tool_calls(vec![ToolCall::new(
                "call_1",
                "calculate",
                r#"{"expression":"2 + 2"}"#,
            )]),
            ModelCompletion::final_answer("2 + 2 is 4."),
        ]);
        let agent = agent(model.clone());
        let mut memory = conversation("what is 2 + 2?");

        let reply = agent.resolve(&mut memory).await.unwrap();

        assert_eq!(reply.content, "2 + 2 is 4.");
        assert_eq!(reply.round_trips, 2);
        let tool_msg = &memory.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.content_text(), "4");

        // the second request carries the tool output
        let second = &model.requests()[1];
        assert_eq!(second.last().unwrap().tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let model = StubModel::new(vec![
            ModelCompletion::tool_calls(vec![ToolCall::new("c1", "launch_rocket", "{}")]),
            ModelCompletion::final_answer("Sorry, I can't do that."),
        ]);
        let agent = agent(model);
        let mut memory = conversation("launch");

        let reply = agent.resolve(&mut memory).await.unwrap();

        assert_eq!(reply.content, "Sorry, I can't do that.");
        assert_eq!(
            memory.messages()[3].content_text(),
            "Error: unknown tool `launch_rocket`"
        );
    }

    #[tokio::test]
    async fn tool_finish_without_calls_is_a_protocol_error() {
        let mut bogus = ModelCompletion::final_answer("");
        bogus.finish_reason = FinishReason::ToolCalls;
        let model = StubModel::new(vec![bogus]);
        let agent = agent(model);
        let mut memory = conversation("hi");

        let err = agent.resolve(&mut memory).await.unwrap_err();

        assert!(matches!(err, AgentError::Protocol(_)));
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn bounded_driver_stops_at_limit() {
        let looping: Vec<ModelCompletion> = (0..10)
            .map(|i| {
                ModelCompletion::tool_calls(vec![ToolCall::new(
                    format!("call_{i}"),
                    "calculate",
                    r#"{"expression":"1"}"#,
                )])
            })
            .collect();
        let model = StubModel::new(looping);
        let agent = agent(model.clone()).with_max_round_trips(Some(3));
        let mut memory = conversation("loop");

        let err = agent.resolve(&mut memory).await.unwrap_err();

        assert!(matches!(err, AgentError::RoundTripLimit(3)));
        assert_eq!(model.calls(), 3);
        // system + user + 3 x (assistant + tool)
        assert_eq!(memory.len(), 8);
    }

    #[tokio::test]
    async fn zero_limit_means_unbounded() {
        let looping: Vec<ModelCompletion> = (0..5)
            .map(|i| {
                ModelCompletion::tool_calls(vec![ToolCall::new(
                    format!("call_{i}"),
                    "calculate",
                    r#"{"expression":"1"}"#,
                )])
            })
            .collect();
        let model = StubModel::new(looping);
        let agent = agent(model.clone()).with_max_round_trips(Some(0));
        let mut memory = conversation("loop");

        let err = agent.resolve(&mut memory).await.unwrap_err();

        // only the exhausted script stops it
        assert!(matches!(err, AgentError::LanguageModel(_)));
        assert_eq!(model.calls(), 6);
        assert_eq!(memory.len(), 12);
    }

    #[tokio::test]
    async fn stop_finish_with_calls_still_dispatches() {
        let mut mixed = ModelCompletion::tool_calls(vec![ToolCall::new(
            "call_s",
            "calculate",
            r#"{"expression":"6 * 7"}"#,
        )]);
        mixed.finish_reason = FinishReason::Stop;
        let model = StubModel::new(vec![mixed, ModelCompletion::final_answer("42")]);
        let agent = agent(model.clone());
        let mut memory = conversation("six times seven");

        let reply = agent.resolve(&mut memory).await.unwrap();

        assert_eq!(reply.content, "42");
        assert_eq!(reply.round_trips, 2);
        assert_eq!(model.calls(), 2);
        let tool_msg = &memory.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_s"));
        assert_eq!(tool_msg.content_text(), "42");
    }

    #[test]
    fn rejects_mismatched_catalog() {
        let model = StubModel::new(Vec::new());
        let result = Agent::new(model).with_tools(builtin_toolkit(), Vec::new());
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
