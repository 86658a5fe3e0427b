use grok_agent::{
    default_catalog, AgentError, ChatRequest, FinishReason, LanguageModel, Message,
    SearchParameters, ToolCall, ToolChoice, XaiClient,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> XaiClient {
    XaiClient::new("test-key", "grok-4")
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn sends_catalog_search_and_auto_tool_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "grok-4",
            "tool_choice": "auto",
            "search_parameters": {"mode": "auto", "return_citations": true},
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello there."},
                "finish_reason": "stop"
            }],
            "citations": ["https://example.com/a"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = vec![Message::user("hi")];
    let catalog = default_catalog();
    let search = SearchParameters::default();
    let completion = client(&server)
        .complete_chat(ChatRequest {
            messages: &messages,
            tools: &catalog,
            tool_choice: ToolChoice::Auto,
            search: Some(&search),
        })
        .await
        .expect("completion should succeed");

    assert_eq!(completion.finish_reason, FinishReason::Stop);
    assert_eq!(completion.message.content_text(), "Hello there.");
    assert!(!completion.wants_tools());
    assert_eq!(completion.citations, vec!["https://example.com/a".to_string()]);
}

#[tokio::test]
async fn decodes_tool_calls_with_verbatim_arguments() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "calculate", "arguments": "{\"expression\": \"2 + 2\"}"}},
                        {"id": "call_b", "type": "function",
                         "function": {"name": "read_file", "arguments": "{\"path\": \"notes.txt\"}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let messages = vec![Message::user("sum and read")];
    let completion = client(&server)
        .complete_chat(ChatRequest {
            messages: &messages,
            tools: &default_catalog(),
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap();

    assert!(completion.wants_tools());
    assert_eq!(completion.message.content, None);
    assert_eq!(
        completion.message.tool_calls,
        vec![
            ToolCall::new("call_a", "calculate", "{\"expression\": \"2 + 2\"}"),
            ToolCall::new("call_b", "read_file", "{\"path\": \"notes.txt\"}"),
        ]
    );
}

#[tokio::test]
async fn non_success_status_is_a_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete_chat(ChatRequest {
            messages: &[Message::user("hi")],
            tools: &[],
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap_err();

    match err {
        AgentError::Service { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn too_many_requests_is_a_rate_limit_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete_chat(ChatRequest {
            messages: &[Message::user("hi")],
            tools: &[],
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap_err();

    assert!(
        matches!(&err, AgentError::RateLimited(body) if body == "slow down"),
        "{err:?}"
    );
    assert_eq!(err.to_string(), "model service rate limit exceeded: slow down");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete_chat(ChatRequest {
            messages: &[Message::user("hi")],
            tools: &[],
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn empty_choices_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete_chat(ChatRequest {
            messages: &[Message::user("hi")],
            tools: &[],
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let client = XaiClient::new("k", "grok-4")
        .unwrap()
        .with_base_url("http://127.0.0.1:9");

    let err = client
        .complete_chat(ChatRequest {
            messages: &[Message::user("hi")],
            tools: &[],
            tool_choice: ToolChoice::Auto,
            search: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Transport(_)), "{err:?}");
}
