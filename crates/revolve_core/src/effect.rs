use crate::{TranscriptEntry, TurnFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the request for a freshly submitted turn.
    OpenStream(TurnRequest),
    LoadingChanged(bool),
    TurnFinished(TurnOutcome),
}

/// What the transport needs to open a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn: u64,
    /// The latest user message.
    pub message: String,
    /// The transcript including the latest user message.
    pub transcript: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(TurnFailure),
}
