mod common;

use std::time::Duration;

use common::init_logging;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use revolve_core::{TranscriptEntry, TurnFailure, TurnOutcome, TurnRequest};
use revolve_engine::{
    build_request_body, FailureKind, NullSignalSink, Passthrough, RequestShape,
    ReqwestTransport, SessionController, Transport, TransportSettings,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn passthrough() -> Passthrough {
    Passthrough {
        db_config: json!({
            "DB_NAME": "newdb",
            "DB_USER": "postgres",
            "DB_HOST": "localhost",
            "DB_PORT": "5432"
        }),
        settings: json!({ "sourceFolder": "generated" }),
    }
}

fn request(message: &str) -> TurnRequest {
    TurnRequest {
        turn: 1,
        message: message.to_string(),
        transcript: vec![
            TranscriptEntry::assistant("Hello! How can I assist you today?"),
            TranscriptEntry::user(message),
        ],
    }
}

fn settings_for(server: &MockServer) -> TransportSettings {
    TransportSettings {
        endpoint: format!("{}/api/chat", server.uri()),
        ..TransportSettings::default()
    }
}

#[test]
fn latest_message_body_carries_passthrough_blobs() {
    let body = build_request_body(
        &request("Create CRUD operations"),
        RequestShape::LatestMessage,
        &passthrough(),
    )
    .expect("serializable");
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        value,
        json!({
            "message": "Create CRUD operations",
            "dbConfig": {
                "DB_NAME": "newdb",
                "DB_USER": "postgres",
                "DB_HOST": "localhost",
                "DB_PORT": "5432"
            },
            "settings": { "sourceFolder": "generated" }
        })
    );
}

#[test]
fn full_transcript_body_lists_roles() {
    let body = build_request_body(
        &request("Run tests"),
        RequestShape::FullTranscript,
        &Passthrough::default(),
    )
    .expect("serializable");
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        value,
        json!({
            "messages": [
                { "role": "assistant", "content": "Hello! How can I assist you today?" },
                { "role": "user", "content": "Run tests" }
            ],
            "dbConfig": {},
            "settings": {}
        })
    );
}

#[tokio::test]
async fn streams_ndjson_into_the_session() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "message": "hi",
            "dbConfig": passthrough().db_config,
            "settings": passthrough().settings
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "{\"status\":\"processing\",\"name\":\"step1\",\"text\":\"working\"}\n",
                "{\"status\":\"done\",\"text\":\"All set.\"}\n"
            ),
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(settings_for(&server), passthrough()).expect("client");
    let mut controller = SessionController::new(transport);
    let outcome = controller
        .submit("hi", &CancellationToken::new(), &NullSignalSink)
        .await
        .expect("submit accepted");

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(
        controller.state().transcript(),
        &[
            TranscriptEntry::user("hi"),
            TranscriptEntry::assistant("All set.")
        ]
    );
    assert_eq!(controller.state().system_log().len(), 1);
}

#[tokio::test]
async fn non_success_status_is_a_rejection() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport =
        ReqwestTransport::new(settings_for(&server), Passthrough::default()).expect("client");
    let err = match transport.open(&request("hi")).await {
        Ok(_) => panic!("expected rejection"),
        Err(err) => err,
    };
    assert_eq!(err.kind, FailureKind::HttpStatus(500));

    let mut controller = SessionController::new(transport);
    let outcome = controller
        .submit("hi", &CancellationToken::new(), &NullSignalSink)
        .await
        .expect("submit accepted");
    assert_eq!(
        outcome,
        TurnOutcome::Failed(TurnFailure::Rejected {
            status: Some(500),
            message: "Internal Server Error".to_string(),
        })
    );
    assert_eq!(controller.state().transcript(), &[TranscriptEntry::user("hi")]);
    assert_eq!(controller.state().notifications().len(), 1);
}

#[tokio::test]
async fn invalid_endpoint_is_reported() {
    init_logging();
    let settings = TransportSettings {
        endpoint: "not a url".to_string(),
        ..TransportSettings::default()
    };
    let transport = ReqwestTransport::new(settings, Passthrough::default()).expect("client");
    let err = match transport.open(&request("hi")).await {
        Ok(_) => panic!("expected failure"),
        Err(err) => err,
    };
    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
}

#[tokio::test]
async fn request_timeout_applies_when_configured() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("{\"status\":\"done\",\"text\":\"late\"}\n"),
        )
        .mount(&server)
        .await;

    let settings = TransportSettings {
        request_timeout: Some(Duration::from_millis(50)),
        ..settings_for(&server)
    };
    let transport = ReqwestTransport::new(settings, Passthrough::default()).expect("client");
    let err = match transport.open(&request("hi")).await {
        Ok(_) => panic!("expected timeout"),
        Err(err) => err,
    };
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn body_is_streamed_chunk_by_chunk() {
    init_logging();
    let server = MockServer::start().await;
    let body = "{\"level\":\"workflow\",\"text\":\"a\"}\n".repeat(64);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let transport =
        ReqwestTransport::new(settings_for(&server), Passthrough::default()).expect("client");
    let mut stream = transport.open(&request("hi")).await.expect("accepted");
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.expect("chunk"));
    }
    assert_eq!(received, body.as_bytes());
}
