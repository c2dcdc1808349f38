use std::sync::mpsc;

use bytes::Bytes;
use futures_util::StreamExt;
use revolve_core::{
    parse_record, update, Effect, Msg, NotificationId, SessionState, SessionView, TurnFailure,
    TurnOutcome, TurnRequest,
};
use session_logging::{session_debug, session_info, session_trace, session_warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::framer::RecordPipeline;
use crate::transport::Transport;
use crate::{SessionEvent, SessionSignal, SubmitError, TransportError};

/// Notification ids to dismiss while a turn is running.
pub type DismissalReceiver = UnboundedReceiver<NotificationId>;

pub trait SignalSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

pub struct ChannelSignalSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl ChannelSignalSink {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl SignalSink for ChannelSignalSink {
    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink for callers that only read the final state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSignalSink;

impl SignalSink for NullSignalSink {
    fn emit(&self, _event: SessionEvent) {}
}

enum Step<T> {
    Cancelled,
    Dismiss(NotificationId),
    Ready(T),
}

#[derive(Default)]
struct Dispatched {
    request: Option<TurnRequest>,
    outcome: Option<TurnOutcome>,
}

/// Drives one session: owns its state and runs each turn against a transport.
pub struct SessionController<T> {
    transport: T,
    state: SessionState,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_state(transport, SessionState::new())
    }

    pub fn with_state(transport: T, state: SessionState) -> Self {
        Self { transport, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one full turn: submit, drain the response stream, finalize.
    ///
    /// Transport failures do not surface as `Err`; they end the turn with
    /// [`TurnOutcome::Failed`] and leave the accumulated state in place.
    pub async fn submit(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
        sink: &dyn SignalSink,
    ) -> Result<TurnOutcome, SubmitError> {
        self.submit_with_dismissals(text, cancel, sink, None).await
    }

    /// Like [`SessionController::submit`], also applying dismissals that
    /// arrive on `dismissals` between chunks.
    pub async fn submit_with_dismissals(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
        sink: &dyn SignalSink,
        mut dismissals: Option<&mut DismissalReceiver>,
    ) -> Result<TurnOutcome, SubmitError> {
        if self.state.is_loading() {
            return Err(SubmitError::TurnInFlight {
                turn: self.state.turns(),
            });
        }

        let dispatched = self.dispatch(Msg::Submit(text.to_owned()), sink);
        let Some(request) = dispatched.request else {
            return Err(SubmitError::EmptyMessage);
        };
        session_logging::set_turn(request.turn);
        self.publish(sink);

        let outcome = self.run_turn(&request, cancel, sink, &mut dismissals).await;
        self.publish(sink);
        session_info!("Turn finished: {:?}", outcome);
        Ok(outcome)
    }

    /// Marks a turn whose driving future was dropped as cancelled.
    pub fn abandon_turn(&mut self, sink: &dyn SignalSink) {
        if self.state.phase().is_in_flight() {
            self.dispatch(Msg::Cancel, sink);
            self.publish(sink);
        }
    }

    pub fn dismiss_notification(&mut self, id: NotificationId, sink: &dyn SignalSink) {
        self.dispatch(Msg::DismissNotification(id), sink);
        self.publish(sink);
    }

    async fn run_turn(
        &mut self,
        request: &TurnRequest,
        cancel: &CancellationToken,
        sink: &dyn SignalSink,
        dismissals: &mut Option<&mut DismissalReceiver>,
    ) -> TurnOutcome {
        let opened = {
            let open = self.transport.open(request);
            tokio::pin!(open);
            loop {
                let step = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Step::Cancelled,
                    Some(id) = next_dismissal(dismissals) => Step::Dismiss(id),
                    opened = &mut open => Step::Ready(opened),
                };
                match step {
                    Step::Cancelled => return finish(&mut self.state, Msg::Cancel, sink),
                    Step::Dismiss(id) => dismiss(&mut self.state, id, sink),
                    Step::Ready(opened) => break opened,
                }
            }
        };
        let mut stream = match opened {
            Err(err) => {
                session_warn!("Request rejected: {}", err);
                return self.finish(Msg::ResponseRejected(err.into_rejection()), sink);
            }
            Ok(stream) => stream,
        };
        self.dispatch(Msg::ResponseAccepted, sink);
        self.publish(sink);

        let mut pipeline = RecordPipeline::new();
        loop {
            let step: Step<Option<Result<Bytes, TransportError>>> = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                Some(id) = next_dismissal(dismissals) => Step::Dismiss(id),
                next = stream.next() => Step::Ready(next),
            };

            match step {
                Step::Cancelled => {
                    session_info!("Turn cancelled while draining");
                    return self.finish(Msg::Cancel, sink);
                }
                Step::Dismiss(id) => dismiss(&mut self.state, id, sink),
                Step::Ready(Some(Ok(chunk))) => {
                    session_trace!("Chunk of {} bytes", chunk.len());
                    for record in pipeline.push(&chunk) {
                        self.apply_record(&record, sink);
                    }
                    self.publish(sink);
                }
                Step::Ready(Some(Err(err))) => {
                    session_warn!("Stream broke off: {}", err);
                    return self.finish(Msg::StreamFailed(err.into_stream_failure()), sink);
                }
                Step::Ready(None) => {
                    for record in pipeline.finish() {
                        self.apply_record(&record, sink);
                    }
                    return self.finish(Msg::StreamEnded, sink);
                }
            }
        }
    }

    fn apply_record(&mut self, record: &str, sink: &dyn SignalSink) {
        let message = parse_record(record);
        session_debug!("Record classified as {:?}", message.category);
        self.dispatch(Msg::Record(message), sink);
    }

    fn finish(&mut self, msg: Msg, sink: &dyn SignalSink) -> TurnOutcome {
        finish(&mut self.state, msg, sink)
    }

    fn dispatch(&mut self, msg: Msg, sink: &dyn SignalSink) -> Dispatched {
        dispatch(&mut self.state, msg, sink)
    }

    fn publish(&mut self, sink: &dyn SignalSink) {
        publish(&mut self.state, sink)
    }
}

/// Waits for the next dismissal; never resolves when there is no receiver.
async fn next_dismissal(
    dismissals: &mut Option<&mut DismissalReceiver>,
) -> Option<NotificationId> {
    match dismissals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn dismiss(state: &mut SessionState, id: NotificationId, sink: &dyn SignalSink) {
    session_debug!("Dismissing notification #{} mid-turn", id);
    dispatch(state, Msg::DismissNotification(id), sink);
    publish(state, sink);
}

fn finish(state: &mut SessionState, msg: Msg, sink: &dyn SignalSink) -> TurnOutcome {
    let dispatched = dispatch(state, msg, sink);
    dispatched.outcome.unwrap_or_else(|| {
        TurnOutcome::Failed(
            state
                .last_failure()
                .cloned()
                .unwrap_or(TurnFailure::Incomplete),
        )
    })
}

fn dispatch(state: &mut SessionState, msg: Msg, sink: &dyn SignalSink) -> Dispatched {
    let (next, effects) = update(std::mem::take(state), msg);
    *state = next;

    let mut dispatched = Dispatched::default();
    for effect in effects {
        match effect {
            Effect::OpenStream(request) => {
                sink.emit(SessionEvent::Signal(SessionSignal::TurnStarted {
                    turn: request.turn,
                }));
                dispatched.request = Some(request);
            }
            Effect::LoadingChanged(loading) => {
                sink.emit(SessionEvent::Signal(SessionSignal::LoadingChanged(loading)));
            }
            Effect::TurnFinished(outcome) => {
                sink.emit(SessionEvent::Signal(SessionSignal::TurnFinished {
                    turn: state.turns(),
                    outcome: outcome.clone(),
                }));
                dispatched.outcome = Some(outcome);
            }
        }
    }
    dispatched
}

fn publish(state: &mut SessionState, sink: &dyn SignalSink) {
    if state.consume_dirty() {
        sink.emit(SessionEvent::Snapshot(state.view()));
    }
}
