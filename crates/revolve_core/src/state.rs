use std::fmt;

use serde::Serialize;
use session_logging::{session_debug, session_info};

use crate::effect::TurnRequest;
use crate::record::{Category, Message};
use crate::view_model::SessionView;

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Progress reported by the backend.
    System,
    /// A line the client could not classify.
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub name: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub name: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingResponse,
    DrainingStream,
    Finalized,
    Failed,
}

impl TurnPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, TurnPhase::AwaitingResponse | TurnPhase::DrainingStream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    /// The backend refused the request before streaming anything.
    Rejected { status: Option<u16>, message: String },
    /// The connection broke while the body was streaming.
    Transport { message: String },
    /// The body ended before any reply arrived.
    Incomplete,
    Cancelled,
}

impl fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnFailure::Rejected {
                status: Some(code),
                message,
            } => write!(f, "request rejected (http {code}): {message}"),
            TurnFailure::Rejected {
                status: None,
                message,
            } => write!(f, "request rejected: {message}"),
            TurnFailure::Transport { message } => write!(f, "stream interrupted: {message}"),
            TurnFailure::Incomplete => write!(f, "stream ended without a reply"),
            TurnFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Everything one UI session knows about its exchange with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    phase: TurnPhase,
    transcript: Vec<TranscriptEntry>,
    system_log: Vec<LogEntry>,
    notifications: Vec<Notification>,
    assistant_buffer: String,
    loading: bool,
    last_failure: Option<TurnFailure>,
    turns: u64,
    reply_seen: bool,
    next_notification_id: NotificationId,
    dirty: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose transcript opens with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            transcript: vec![TranscriptEntry::assistant(greeting)],
            ..Self::default()
        }
    }

    pub fn view(&self) -> SessionView {
        let partial_reply = match self.phase {
            TurnPhase::DrainingStream | TurnPhase::Failed if !self.assistant_buffer.is_empty() => {
                Some(self.assistant_buffer.clone())
            }
            _ => None,
        };
        SessionView {
            phase: self.phase,
            loading: self.loading,
            transcript: self.transcript.clone(),
            system_log: self.system_log.clone(),
            notifications: self.notifications.clone(),
            partial_reply,
            last_failure: self.last_failure.clone(),
            turns: self.turns,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn system_log(&self) -> &[LogEntry] {
        &self.system_log
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn assistant_buffer(&self) -> &str {
        &self.assistant_buffer
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_failure(&self) -> Option<&TurnFailure> {
        self.last_failure.as_ref()
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Applies one classified message to the three views and the reply buffer.
    pub fn apply_message(&mut self, message: Message) {
        let Message {
            category,
            name,
            text,
        } = message;
        match category {
            Category::System => self.system_log.push(LogEntry {
                kind: LogKind::System,
                name,
                text,
            }),
            Category::Notification => {
                self.push_notification(NotificationKind::Info, name, text);
            }
            Category::Workflow => {
                self.reply_seen = true;
                self.transcript
                    .push(TranscriptEntry::assistant(text.unwrap_or_default()));
            }
            Category::Done | Category::Error => {
                self.reply_seen = true;
                if let Some(fragment) = text {
                    self.assistant_buffer.push_str(&fragment);
                }
            }
            Category::Malformed => self.system_log.push(LogEntry {
                kind: LogKind::Diagnostic,
                name,
                text,
            }),
        }
        self.dirty = true;
    }

    /// Commits the buffered reply to the transcript and stops loading.
    ///
    /// Returns `true` when a transcript entry was appended. Calling it again
    /// without new fragments appends nothing.
    pub fn finalize(&mut self) -> bool {
        let flushed = if self.assistant_buffer.is_empty() {
            false
        } else {
            let reply = std::mem::take(&mut self.assistant_buffer);
            self.transcript.push(TranscriptEntry::assistant(reply));
            true
        };
        if flushed || self.loading {
            self.dirty = true;
        }
        self.loading = false;
        flushed
    }

    pub fn dismiss_notification(&mut self, id: NotificationId) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|notification| notification.id != id);
        let removed = self.notifications.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub(crate) fn begin_turn(&mut self, message: String) -> TurnRequest {
        self.turns += 1;
        self.phase = TurnPhase::AwaitingResponse;
        self.assistant_buffer.clear();
        self.last_failure = None;
        self.reply_seen = false;
        self.loading = true;
        self.transcript.push(TranscriptEntry::user(message.clone()));
        self.dirty = true;
        session_info!("Turn {} submitted ({} chars)", self.turns, message.len());

        TurnRequest {
            turn: self.turns,
            message,
            transcript: self.transcript.clone(),
        }
    }

    pub(crate) fn mark_accepted(&mut self) {
        self.phase = TurnPhase::DrainingStream;
        self.dirty = true;
    }

    pub(crate) fn reject(&mut self, failure: TurnFailure) {
        self.push_notification(
            NotificationKind::Error,
            Some("request failed".to_string()),
            Some(failure.to_string()),
        );
        self.fail(failure);
    }

    /// Ends the stream: completes the turn if any reply arrived, fails it otherwise.
    pub(crate) fn end_stream(&mut self) -> Option<TurnFailure> {
        if self.reply_seen {
            self.finalize();
            self.phase = TurnPhase::Finalized;
            self.dirty = true;
            None
        } else {
            self.fail(TurnFailure::Incomplete);
            Some(TurnFailure::Incomplete)
        }
    }

    /// Stops the turn, keeping everything applied so far.
    pub(crate) fn fail(&mut self, failure: TurnFailure) {
        session_debug!(
            "Turn {} failed with {} buffered reply chars: {}",
            self.turns,
            self.assistant_buffer.len(),
            failure
        );
        self.phase = TurnPhase::Failed;
        self.loading = false;
        self.last_failure = Some(failure);
        self.dirty = true;
    }

    fn push_notification(
        &mut self,
        kind: NotificationKind,
        name: Option<String>,
        text: Option<String>,
    ) {
        self.next_notification_id += 1;
        self.notifications.push(Notification {
            id: self.next_notification_id,
            kind,
            name,
            text,
        });
        self.dirty = true;
    }
}
