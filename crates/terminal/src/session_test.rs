//! Tests for the session transition table

use vantage_auth::Access;

use super::*;

const PRE_BODY: SessionState = SessionState::AwaitBody {
    phase: Phase::PreLogin,
    len: 12,
};

const ACTIVE_BODY: SessionState = SessionState::AwaitBody {
    phase: Phase::Active,
    len: 12,
};

// ============================================================================
// Login phase
// ============================================================================

#[test]
fn test_initial_state_awaits_prelogin_header() {
    assert_eq!(SessionState::INITIAL, SessionState::AwaitHeader(Phase::PreLogin));
}

#[test]
fn test_prelogin_header_moves_to_body() {
    let next = SessionState::INITIAL.next(SessionEvent::HeaderAccepted(12));
    assert_eq!(next, PRE_BODY);
}

#[test]
fn test_read_write_login_goes_active() {
    let next = PRE_BODY.next(SessionEvent::LoginAccepted(Access::ReadWrite));
    assert_eq!(next, SessionState::AwaitHeader(Phase::Active));
}

#[test]
fn test_readonly_login_goes_discarding() {
    let next = PRE_BODY.next(SessionEvent::LoginAccepted(Access::ReadOnly));
    assert_eq!(next, SessionState::Discarding);
}

#[test]
fn test_rejected_login_retries_without_closing() {
    let mut state = SessionState::INITIAL;
    for _ in 0..5 {
        state = state.next(SessionEvent::HeaderAccepted(12));
        state = state.next(SessionEvent::LoginRejected);
        assert_eq!(state, SessionState::INITIAL);
    }
}

// ============================================================================
// Steady state
// ============================================================================

#[test]
fn test_active_loop() {
    let mut state = SessionState::AwaitHeader(Phase::Active);
    state = state.next(SessionEvent::HeaderAccepted(12));
    assert_eq!(state, ACTIVE_BODY);
    state = state.next(SessionEvent::Dispatched);
    assert_eq!(state, SessionState::AwaitHeader(Phase::Active));
}

#[test]
fn test_discarding_never_rejoins_active() {
    let mut state = SessionState::Discarding;
    for _ in 0..3 {
        state = state.next(SessionEvent::Discarded);
        assert_eq!(state, SessionState::Discarding);
    }
    assert_eq!(
        state.next(SessionEvent::LoginAccepted(Access::ReadWrite)),
        SessionState::Closed
    );
}

// ============================================================================
// Closing
// ============================================================================

#[test]
fn test_rejected_header_closes_from_both_phases() {
    assert_eq!(
        SessionState::INITIAL.next(SessionEvent::HeaderRejected),
        SessionState::Closed
    );
    assert_eq!(
        SessionState::AwaitHeader(Phase::Active).next(SessionEvent::HeaderRejected),
        SessionState::Closed
    );
}

#[test]
fn test_disconnect_and_shutdown_close_every_state() {
    let states = [
        SessionState::INITIAL,
        PRE_BODY,
        SessionState::AwaitHeader(Phase::Active),
        ACTIVE_BODY,
        SessionState::Discarding,
    ];

    for state in states {
        assert!(state.next(SessionEvent::Disconnected).is_closed());
        assert!(state.next(SessionEvent::Shutdown).is_closed());
    }
}

#[test]
fn test_closed_is_terminal() {
    let events = [
        SessionEvent::HeaderAccepted(1),
        SessionEvent::LoginAccepted(Access::ReadWrite),
        SessionEvent::Dispatched,
        SessionEvent::Discarded,
    ];

    for event in events {
        assert_eq!(SessionState::Closed.next(event), SessionState::Closed);
    }
}

#[test]
fn test_invalid_transition_closes() {
    // A header event while a body is expected
    assert!(PRE_BODY.next(SessionEvent::HeaderAccepted(3)).is_closed());
    // A login outcome outside the login phase
    assert!(ACTIVE_BODY.next(SessionEvent::LoginRejected).is_closed());
    assert!(
        SessionState::AwaitHeader(Phase::Active)
            .next(SessionEvent::Dispatched)
            .is_closed()
    );
}
