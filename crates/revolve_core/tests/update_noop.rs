use revolve_core::{update, Message, Msg, SessionState};

#[test]
fn update_is_noop() {
    let state = SessionState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn records_outside_a_turn_are_dropped() {
    let state = SessionState::new();
    let (next, effects) = update(
        state.clone(),
        Msg::Record(Message::malformed("stray line")),
    );

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn stream_end_outside_a_turn_is_noop() {
    let state = SessionState::new();
    let (next, effects) = update(state.clone(), Msg::StreamEnded);
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(next, Msg::Cancel);
    assert_eq!(state, next);
    assert!(effects.is_empty());
}
