use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use revolve_core::{TranscriptEntry, TurnRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_logging::{session_debug, session_info};

use crate::{FailureKind, TransportError};

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Which outbound body the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestShape {
    /// `{"message": ...}` with only the latest user message.
    #[default]
    LatestMessage,
    /// `{"messages": [...]}` with the whole transcript.
    FullTranscript,
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Whole-request deadline. `None` lets a slow agent stream indefinitely.
    pub request_timeout: Option<Duration>,
    pub request_shape: RequestShape,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:48000/api/chat".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            request_shape: RequestShape::LatestMessage,
        }
    }
}

/// Opaque configuration forwarded with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Passthrough {
    pub db_config: Value,
    pub settings: Value,
}

impl Default for Passthrough {
    fn default() -> Self {
        Self {
            db_config: Value::Object(Default::default()),
            settings: Value::Object(Default::default()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<&'a [TranscriptEntry]>,
    db_config: &'a Value,
    settings: &'a Value,
}

/// Serializes the outbound JSON body for one turn.
pub fn build_request_body(
    request: &TurnRequest,
    shape: RequestShape,
    passthrough: &Passthrough,
) -> Result<Vec<u8>, TransportError> {
    let body = match shape {
        RequestShape::LatestMessage => ChatRequestBody {
            message: Some(request.message.as_str()),
            messages: None,
            db_config: &passthrough.db_config,
            settings: &passthrough.settings,
        },
        RequestShape::FullTranscript => ChatRequestBody {
            message: None,
            messages: Some(request.transcript.as_slice()),
            db_config: &passthrough.db_config,
            settings: &passthrough.settings,
        },
    };
    serde_json::to_vec(&body)
        .map_err(|err| TransportError::new(FailureKind::InvalidRequest, err.to_string()))
}

/// Opens the streaming response for one turn.
///
/// An `Ok` stream means the backend accepted the request; every error
/// returned by `open` is a rejection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: TransportSettings,
    passthrough: Passthrough,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(
        settings: TransportSettings,
        passthrough: Passthrough,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            passthrough,
            client,
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        let url = reqwest::Url::parse(&self.settings.endpoint)
            .map_err(|err| TransportError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
        let body = build_request_body(request, self.settings.request_shape, &self.passthrough)?;
        session_debug!("POST {} ({} byte body)", url, body.len());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/x-ndjson, application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        session_info!("Stream accepted ({}), content type {:?}", status, content_type);

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_body() || err.is_decode() {
        return TransportError::new(FailureKind::Body, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
