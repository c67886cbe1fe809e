// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Integration tests
//
// End-to-end over real HTTP:
// config -> ReqwestTransport -> frame parser -> decoder -> engine -> stores
//
// Uses wiremock as the orchestrator. Nothing else is mocked.

use agrilink::config::{self, StringSource};
use agrilink::engine::Effect;
use agrilink::message::InputModality;
use agrilink::session::{Conversation, QueryOutcome};
use agrilink::transport::{ConnectionError, ReqwestTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

const QUERY_PATH: &str = "/api/sse/query";

fn test_config(server: &MockServer) -> config::Config {
    let yaml = format!(
        r#"agrilink: v1
endpoint: "{}{}"
request:
  connect_timeout_ms: 2000
  idle_timeout_ms: 5000
environment: "test"
"#,
        server.uri(),
        QUERY_PATH
    );
    config::load_config(&StringSource { content: yaml }).expect("test config must load")
}

fn conversation(server: &MockServer) -> Conversation {
    let config = test_config(server);
    let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
    Conversation::from_config(transport, &config)
}

async fn mount_sse(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn content(conversation: &Conversation, outcome: &QueryOutcome) -> String {
    conversation
        .messages()
        .get(outcome.message_id())
        .unwrap()
        .content
        .clone()
}

/// The orchestrator's stream for a pest question, including its
/// progress-only events.
const PEST_STREAM: &str = "event: connected\n\
data: Connection established\n\n\
event: status\n\
data: {\"message\": \"Running pest agent\"}\n\n\
event: agent_start\n\
data: Starting pest agent\n\n\
event: keep_alive\n\
data: ping\n\n\
event: agent_result\n\
data: {\"agent\": \"pest\", \"response\": \"aphids detected\"}\n\n\
event: meta\n\
data: {\"intent_classification\": \"pest\", \"agents_run\": [\"pest\"], \"success_count\": 1, \"error_count\": 0, \"errors\": {}, \"processing_time\": 2.1}\n\n\
event: final_response\n\
data: # Diagnosis\n\
data: - Aphids detected\n\n\
event: complete\n\
data: Query processing completed successfully!\n\n";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pest_query_streams_to_final_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .and(header("accept", "text/event-stream"))
        .and(body_json(json!({ "query": "pest on tomato" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(PEST_STREAM),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut conv = conversation(&server).with_observer(tx);
    let outcome = conv.submit("pest on tomato", InputModality::Text).await.unwrap();

    assert!(matches!(outcome, QueryOutcome::Finalized { .. }));
    assert_eq!(content(&conv, &outcome), "# Diagnosis\n\n- Aphids detected");

    let status = conv.status();
    assert_eq!(status.agents_run(), ["pest"]);
    assert_eq!(status.success_count(), 1);
    assert_eq!(status.intent_classification(), Some("pest"));
    assert!(!status.is_connected());

    let message = conv.messages().get(outcome.message_id()).unwrap();
    assert_eq!(message.agent_results.len(), 1);
    assert_eq!(message.agent_results[0].agent_name, "pest");
    assert_eq!(message.metadata.as_ref().unwrap()["processing_time"], json!(2.1));

    let mut status_lines = Vec::new();
    while let Ok(effect) = rx.try_recv() {
        if let Effect::StatusLine(line) = effect {
            status_lines.push(line);
        }
    }
    assert!(status_lines.contains(&"Running pest agent".to_string()));
}

#[tokio::test]
async fn plain_text_transcript_after_announcement() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "event: connected\ndata: ok\n\n\
         data: Checking weather...\n\n\
         data: Processing completed successfully!\n\n\
         data: Rainfall expected\n\n\
         data: Apply irrigation\n\n\
         data: Query processing completed successfully!\n\n",
    )
    .await;

    let mut conv = conversation(&server);
    let outcome = conv.submit("should I irrigate", InputModality::Text).await.unwrap();

    assert!(matches!(outcome, QueryOutcome::Finalized { .. }));
    assert_eq!(content(&conv, &outcome), "Rainfall expected\nApply irrigation");
}

#[tokio::test]
async fn non_success_status_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("Missing 'query' in request"))
        .mount(&server)
        .await;

    let mut conv = conversation(&server);
    let outcome = conv.submit("soil ph", InputModality::Text).await.unwrap();

    match &outcome {
        QueryOutcome::ConnectionError {
            error: ConnectionError::Status { status, body },
            ..
        } => {
            assert_eq!(*status, 400);
            assert_eq!(body, "Missing 'query' in request");
        }
        other => panic!("expected HTTP status error, got {other:?}"),
    }
    assert!(content(&conv, &outcome).starts_with("Error: "));
    assert!(!conv.status().is_connected());
}

#[tokio::test]
async fn stream_ending_early_is_connection_error() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "event: connected\ndata: ok\n\nevent: status\ndata: Running market agent\n\n",
    )
    .await;

    let mut conv = conversation(&server);
    let outcome = conv.submit("tomato price", InputModality::Text).await.unwrap();

    assert!(matches!(
        outcome,
        QueryOutcome::ConnectionError {
            error: ConnectionError::EndedEarly,
            ..
        }
    ));
}

#[tokio::test]
async fn error_event_fails_query() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "event: connected\ndata: ok\n\n\
         event: error\ndata: {\"message\": \"Failed to initialize orchestrator\"}\n\n",
    )
    .await;

    let mut conv = conversation(&server);
    let outcome = conv.submit("weather", InputModality::Voice).await.unwrap();

    match &outcome {
        QueryOutcome::Failed { reason, .. } => {
            assert_eq!(reason, "Failed to initialize orchestrator");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(
        content(&conv, &outcome),
        "Error: Failed to initialize orchestrator"
    );
}

#[tokio::test]
async fn server_timeout_event_fails_query() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "event: connected\ndata: ok\n\nevent: timeout\ndata: Request timed out\n\n",
    )
    .await;

    let mut conv = conversation(&server);
    let outcome = conv.submit("weather", InputModality::Text).await.unwrap();

    assert!(matches!(outcome, QueryOutcome::Failed { .. }));
    assert_eq!(content(&conv, &outcome), config::DEFAULT_TIMEOUT_MESSAGE);
}

#[tokio::test]
async fn unreachable_orchestrator_is_connection_error() {
    let config = config::Config::for_endpoint("http://127.0.0.1:9/api/sse/query");
    let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
    let mut conv = Conversation::from_config(transport, &config);

    let outcome = conv.submit("soil ph", InputModality::Text).await.unwrap();
    assert!(matches!(outcome, QueryOutcome::ConnectionError { .. }));
}

#[tokio::test]
async fn stalled_response_headers_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(PEST_STREAM)
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let yaml = format!(
        "agrilink: v1\nendpoint: \"{}{}\"\nrequest:\n  connect_timeout_ms: 200\n",
        server.uri(),
        QUERY_PATH
    );
    let config = config::load_config(&StringSource { content: yaml }).unwrap();
    let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
    let mut conv = Conversation::from_config(transport, &config);

    let started = Instant::now();
    let outcome = conv.submit("pest on tomato", InputModality::Text).await.unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "submit took {:?}",
        started.elapsed()
    );
    assert!(matches!(
        outcome,
        QueryOutcome::ConnectionError {
            error: ConnectionError::Timeout(_),
            ..
        }
    ));
    assert!(content(&conv, &outcome).starts_with("Error: "));
}
