use crate::{LogEntry, Notification, TranscriptEntry, TurnFailure, TurnPhase};

/// Greeting the assistant opens every new session with.
pub const DEFAULT_GREETING: &str = "Hello! How can I assist you today?";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub phase: TurnPhase,
    pub loading: bool,
    pub transcript: Vec<TranscriptEntry>,
    pub system_log: Vec<LogEntry>,
    pub notifications: Vec<Notification>,
    /// Reply text received but not committed: still streaming, or left over from a failed turn.
    pub partial_reply: Option<String>,
    pub last_failure: Option<TurnFailure>,
    pub turns: u64,
}
