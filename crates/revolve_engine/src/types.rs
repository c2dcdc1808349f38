use std::fmt;

use revolve_core::{SessionView, TurnFailure, TurnOutcome};

/// Lifecycle signals a consuming UI reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    TurnStarted { turn: u64 },
    LoadingChanged(bool),
    TurnFinished { turn: u64, outcome: TurnOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Signal(SessionSignal),
    /// The session state changed; carries the full view.
    Snapshot(SessionView),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The failure recorded when the request never got a streaming response.
    pub fn into_rejection(self) -> TurnFailure {
        let status = match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        };
        TurnFailure::Rejected {
            status,
            message: self.message,
        }
    }

    /// The failure recorded when the body broke off mid-stream.
    pub fn into_stream_failure(self) -> TurnFailure {
        TurnFailure::Transport {
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Body,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Body => write!(f, "response body error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("turn {turn} is still in flight")]
    TurnInFlight { turn: u64 },
    #[error("message is empty")]
    EmptyMessage,
}
