//! Revolve core: wire record classification and the pure session state machine.
mod effect;
mod msg;
mod record;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, TurnOutcome, TurnRequest};
pub use msg::Msg;
pub use record::{
    classify, parse_record, Category, MalformedRecord, Message, WireRecord,
    MALFORMED_RECORD_NAME,
};
pub use state::{
    LogEntry, LogKind, Notification, NotificationId, NotificationKind, Role, SessionState,
    TranscriptEntry, TurnFailure, TurnPhase,
};
pub use update::update;
pub use view_model::{SessionView, DEFAULT_GREETING};
