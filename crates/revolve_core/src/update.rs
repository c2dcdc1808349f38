use session_logging::{session_debug, session_warn};

use crate::{Effect, Msg, SessionState, TurnFailure, TurnOutcome, TurnPhase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submit(raw) => {
            if state.is_loading() {
                session_warn!("Submit ignored: turn {} is still in flight", state.turns());
                return (state, Vec::new());
            }
            let message = raw.trim();
            if message.is_empty() {
                return (state, Vec::new());
            }
            let request = state.begin_turn(message.to_owned());
            vec![Effect::LoadingChanged(true), Effect::OpenStream(request)]
        }
        Msg::ResponseAccepted => {
            if state.phase() == TurnPhase::AwaitingResponse {
                state.mark_accepted();
            }
            Vec::new()
        }
        Msg::ResponseRejected(failure) => {
            if state.phase() == TurnPhase::AwaitingResponse {
                state.reject(failure.clone());
                finished(Some(failure))
            } else {
                Vec::new()
            }
        }
        Msg::Record(message) => {
            if state.phase() == TurnPhase::DrainingStream {
                state.apply_message(message);
            } else {
                session_debug!(
                    "Record {:?} dropped in phase {:?}",
                    message.category,
                    state.phase()
                );
            }
            Vec::new()
        }
        Msg::StreamEnded => {
            if state.phase() == TurnPhase::DrainingStream {
                let failure = state.end_stream();
                finished(failure)
            } else {
                Vec::new()
            }
        }
        Msg::StreamFailed(failure) => fail_in_flight(&mut state, failure),
        Msg::Cancel => fail_in_flight(&mut state, TurnFailure::Cancelled),
        Msg::DismissNotification(id) => {
            state.dismiss_notification(id);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn fail_in_flight(state: &mut SessionState, failure: TurnFailure) -> Vec<Effect> {
    if !state.phase().is_in_flight() {
        return Vec::new();
    }
    state.fail(failure.clone());
    finished(Some(failure))
}

fn finished(failure: Option<TurnFailure>) -> Vec<Effect> {
    let outcome = match failure {
        Some(failure) => TurnOutcome::Failed(failure),
        None => TurnOutcome::Completed,
    };
    vec![Effect::LoadingChanged(false), Effect::TurnFinished(outcome)]
}
