#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use futures_util::StreamExt;
use revolve_core::TurnRequest;
use revolve_engine::{
    ByteStream, FailureKind, SessionEvent, SignalSink, Transport, TransportError,
};

pub fn init_logging() {
    session_logging::initialize_for_tests();
}

/// How the scripted backend answers one request.
pub enum Script {
    Reject(TransportError),
    Chunks(Vec<Result<Bytes, TransportError>>),
    /// Sends the chunks, then never ends.
    Hang(Vec<Bytes>),
}

impl Script {
    pub fn body(chunks: &[&[u8]]) -> Self {
        Script::Chunks(
            chunks
                .iter()
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect(),
        )
    }

    pub fn lines(lines: &[&str]) -> Self {
        let body: String = lines.iter().map(|line| format!("{line}\n")).collect();
        Script::Chunks(vec![Ok(Bytes::from(body))])
    }
}

#[derive(Default, Clone)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<TurnRequest>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Script::Reject(TransportError::new(FailureKind::Network, "no script left"))
            });

        match script {
            Script::Reject(err) => Err(err),
            Script::Chunks(chunks) => Ok(stream::iter(chunks).boxed()),
            Script::Hang(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl SignalSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
