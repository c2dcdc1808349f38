use std::collections::VecDeque;
use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use revolve_core::{NotificationId, SessionState};
use session_logging::{session_debug, session_warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::controller::{ChannelSignalSink, DismissalReceiver, SessionController, SignalSink};
use crate::transport::Transport;
use crate::SessionEvent;

struct QueuedTurn {
    text: String,
    cancel: CancellationToken,
}

enum Next {
    Turn(QueuedTurn),
    Dismiss(NotificationId),
    Closed,
}

/// Tokens of submitted turns that have not finished, oldest first.
type Outstanding = Arc<Mutex<VecDeque<CancellationToken>>>;

/// Runs a [`SessionController`] on a background thread.
///
/// Submits are queued and run one turn at a time in arrival order. Dismissals
/// are applied right away, also while a turn is streaming. Events are polled
/// with [`SessionHandle::try_recv`].
pub struct SessionHandle {
    turn_tx: UnboundedSender<QueuedTurn>,
    dismiss_tx: UnboundedSender<NotificationId>,
    event_rx: mpsc::Receiver<SessionEvent>,
    outstanding: Outstanding,
}

impl SessionHandle {
    pub fn new<T>(transport: T, state: SessionState) -> io::Result<Self>
    where
        T: Transport + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (turn_tx, turn_rx) = unbounded_channel();
        let (dismiss_tx, dismiss_rx) = unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let outstanding = Outstanding::default();

        let worker_outstanding = outstanding.clone();
        thread::spawn(move || {
            let controller = SessionController::with_state(transport, state);
            let sink = ChannelSignalSink::new(event_tx);
            runtime.block_on(run_worker(
                controller,
                turn_rx,
                dismiss_rx,
                sink,
                worker_outstanding,
            ));
        });

        Ok(Self {
            turn_tx,
            dismiss_tx,
            event_rx,
            outstanding,
        })
    }

    /// Queues a turn. Its cancel token is live from this point on.
    pub fn submit(&self, text: impl Into<String>) {
        let cancel = CancellationToken::new();
        if let Ok(mut queue) = self.outstanding.lock() {
            queue.push_back(cancel.clone());
        }
        let turn = QueuedTurn {
            text: text.into(),
            cancel,
        };
        if self.turn_tx.send(turn).is_err() {
            session_warn!("Session worker is gone; submit dropped");
            if let Ok(mut queue) = self.outstanding.lock() {
                queue.pop_back();
            }
        }
    }

    /// Cancels the oldest unfinished turn, whether it is running or still queued.
    pub fn cancel(&self) {
        if let Ok(queue) = self.outstanding.lock() {
            if let Some(token) = queue.front() {
                token.cancel();
            }
        }
    }

    pub fn dismiss(&self, id: NotificationId) {
        if self.dismiss_tx.send(id).is_err() {
            session_warn!("Session worker is gone; dismissal of #{} dropped", id);
        }
    }

    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn run_worker<T: Transport>(
    mut controller: SessionController<T>,
    mut turn_rx: UnboundedReceiver<QueuedTurn>,
    mut dismiss_rx: DismissalReceiver,
    sink: ChannelSignalSink,
    outstanding: Outstanding,
) {
    sink.emit(SessionEvent::Snapshot(controller.view()));

    loop {
        let next = tokio::select! {
            turn = turn_rx.recv() => turn.map_or(Next::Closed, Next::Turn),
            Some(id) = dismiss_rx.recv() => Next::Dismiss(id),
        };

        match next {
            Next::Turn(QueuedTurn { text, cancel }) => {
                let result = controller
                    .submit_with_dismissals(&text, &cancel, &sink, Some(&mut dismiss_rx))
                    .await;
                if let Ok(mut queue) = outstanding.lock() {
                    queue.pop_front();
                }
                if let Err(err) = result {
                    session_warn!("Submit refused: {}", err);
                }
            }
            Next::Dismiss(id) => controller.dismiss_notification(id, &sink),
            Next::Closed => break,
        }
    }
    session_debug!("Session worker stopped");
}
