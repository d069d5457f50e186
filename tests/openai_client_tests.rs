use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agentic_runner::agent::{AgentRunner, ChannelObserver, RunOptions, RunRequest};
use agentic_runner::core::{AgentEvent, ToolContext};
use agentic_runner::llm::{ChatClient, ChatRequest, Message, OpenAiClient, StreamEvent};
use agentic_runner::tools::{Tool, ToolExecutionOutcome, ToolRegistry};

fn sse(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn text_chunk(text: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]})
}

fn finish_chunk(reason: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {}, "finish_reason": reason}]})
}

async fn collect(client: &OpenAiClient, request: ChatRequest) -> Vec<StreamEvent> {
    let cancel = CancellationToken::new();
    let mut stream = client.stream_chat(request, &cancel).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }
    events
}

#[tokio::test]
async fn test_streams_text_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[text_chunk("Hel"), text_chunk("lo"), finish_chunk("stop")]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new_with_base_url("test-key", server.uri());
    let events = collect(&client, ChatRequest::new(vec![Message::user("Hi")], None)).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("Hel".to_string()),
            StreamEvent::TextDelta("lo".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_accumulates_tool_call_fragments() {
    let server = MockServer::start().await;
    let chunks = [
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_a", "type": "function", "function": {"name": "lookup", "arguments": "{\"q\":"}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"rust\"}"}}
        ]}}]}),
        finish_chunk("tool_calls"),
    ];
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&chunks), "text/event-stream"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new_with_base_url("key", format!("{}/", server.uri()));
    let events = collect(&client, ChatRequest::new(vec![Message::user("Find rust")], None)).await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        StreamEvent::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_a");
            assert_eq!(calls[0].name, "lookup");
            assert_eq!(calls[0].parsed_arguments(), json!({"q": "rust"}));
        }
        other => panic!("expected tool calls, got {:?}", other),
    }
    assert_eq!(events[1], StreamEvent::Done);
}

#[tokio::test]
async fn test_error_status_fails_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new_with_base_url("key", server.uri());
    let cancel = CancellationToken::new();
    let err = client
        .stream_chat(ChatRequest::new(vec![Message::user("Hi")], None), &cancel)
        .await
        .err()
        .unwrap();

    let message = err.to_string();
    assert!(message.contains("500"), "{}", message);
    assert!(message.contains("upstream exploded"), "{}", message);
}

#[tokio::test]
async fn test_error_payload_becomes_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"error\": {\"message\": \"rate limited\"}}\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let client = OpenAiClient::new_with_base_url("key", server.uri());
    let events = collect(&client, ChatRequest::new(vec![Message::user("Hi")], None)).await;

    assert_eq!(events[0], StreamEvent::Error("rate limited".to_string()));
}

#[tokio::test]
async fn test_cancel_aborts_pending_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[text_chunk("late")]), "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::new_with_base_url("key", server.uri());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.stream_chat(ChatRequest::new(vec![Message::user("Hi")], None), &cancel),
    )
    .await
    .expect("cancellation should end the request promptly");

    let err = result.err().unwrap();
    assert_eq!(err.to_string(), "Request aborted");
}

struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Current weather for a city"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        })
    }

    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> anyhow::Result<ToolExecutionOutcome> {
        let city = args["city"].as_str().unwrap_or("nowhere");
        Ok(ToolExecutionOutcome::with_data(json!({"city": city, "sky": "clear"}))
            .summarized(format!("Clear skies in {}", city)))
    }

    fn requires_permission(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_runner_completes_tool_round_trip_over_http() {
    let server = MockServer::start().await;

    // Second turn: the tool result is in the prompt
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"role\":\"tool\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[text_chunk("It is clear in Oslo."), finish_chunk("stop")]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    // First turn: ask for the tool
    let call = json!({"choices": [{"index": 0, "delta": {"tool_calls": [
        {"index": 0, "id": "call_1", "type": "function",
         "function": {"name": "weather", "arguments": "{\"city\":\"Oslo\"}"}}
    ]}, "finish_reason": "tool_calls"}]});
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[call]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool);

    let client = Arc::new(OpenAiClient::new_with_base_url("key", server.uri()));
    let runner = AgentRunner::new(client, Arc::new(registry));
    let observer = ChannelObserver::new();
    let mut rx = observer.subscribe();

    let request = RunRequest::new("Weather in Oslo?", "You are helpful.")
        .with_options(RunOptions::new().with_tools(true));
    runner
        .run(request, &observer, &CancellationToken::new())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(events.iter().any(|e| matches!(
        e,
        AgentEvent::ToolCallCompleted { call, outcome } if call.name == "weather" && outcome.success
    )));
    assert!(matches!(
        events.last(),
        Some(AgentEvent::Complete(text)) if text == "It is clear in Oslo."
    ));
}
