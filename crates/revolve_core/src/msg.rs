#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a chat message.
    Submit(String),
    /// Transport accepted the request; the body is about to stream.
    ResponseAccepted,
    /// Transport refused the request before any body arrived.
    ResponseRejected(crate::TurnFailure),
    /// One classified record from the response body.
    Record(crate::Message),
    /// The response body ended cleanly.
    StreamEnded,
    /// The connection failed while the body was streaming.
    StreamFailed(crate::TurnFailure),
    /// Consumer asked to abort the in-flight turn.
    Cancel,
    /// Consumer dismissed a notification.
    DismissNotification(crate::NotificationId),
    /// Fallback for placeholder wiring.
    NoOp,
}
