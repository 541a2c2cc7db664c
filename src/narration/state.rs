//! Narration state machine and the per-session handle shared with the
//! narration thread.
//!
//! [`NarrationState`] is the controller's three-state machine.  The current
//! state lives in a [`SharedNarrationState`] cell together with the id of the
//! session that owns it, so a stopped session that finishes late cannot reset
//! the state of the session that replaced it.
//!
//! [`NarrationSession`] is handed to the narration thread at launch.  It owns
//! that session's stop flag and exposes [`request_stop`](NarrationSession::request_stop)
//! and [`is_active`](NarrationSession::is_active).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// NarrationState
// ---------------------------------------------------------------------------

/// States of the narration controller.
///
/// ```text
/// Idle ──start──▶ Speaking ──stop──▶ StopRequested
///                    │                    │
///                    └──last sentence──▶ Idle ◀──task acknowledged stop
/// StopRequested ──start──▶ Speaking   (new session; the old task is joined first)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrationState {
    /// No narration running.
    #[default]
    Idle,
    /// A narration task is speaking the summary.
    Speaking,
    /// Stop was requested; the task exits at the next sentence boundary.
    StopRequested,
}

impl NarrationState {
    /// `true` only while speaking; `start` is refused in this state.
    ///
    /// ```
    /// use doc_narrator::narration::NarrationState;
    ///
    /// assert!(!NarrationState::Idle.is_busy());
    /// assert!(NarrationState::Speaking.is_busy());
    /// assert!(!NarrationState::StopRequested.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, NarrationState::Speaking)
    }

    /// A short human-readable label for the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            NarrationState::Idle => "Idle",
            NarrationState::Speaking => "Speaking",
            NarrationState::StopRequested => "Stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// SharedNarrationState
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StateCell {
    state: NarrationState,
    /// Session that last moved the state to `Speaking`.
    owner: u64,
}

/// Thread-safe narration state, shared by the controller (UI thread) and
/// the running narration session.
#[derive(Debug, Clone, Default)]
pub struct SharedNarrationState {
    cell: Arc<Mutex<StateCell>>,
}

impl SharedNarrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> NarrationState {
        self.lock().state
    }

    /// Id of the session that owns the current state.
    pub fn owner(&self) -> u64 {
        self.lock().owner
    }

    /// Move to `Speaking` on behalf of `session`, unless already speaking.
    ///
    /// Returns `false` (and changes nothing) when a session is speaking.
    pub(crate) fn begin(&self, session: u64) -> bool {
        let mut cell = self.lock();
        if cell.state.is_busy() {
            return false;
        }
        cell.state = NarrationState::Speaking;
        cell.owner = session;
        true
    }

    /// `Speaking` → `StopRequested`.  Other states are left alone.
    pub(crate) fn request_stop(&self) {
        let mut cell = self.lock();
        if cell.state == NarrationState::Speaking {
            cell.state = NarrationState::StopRequested;
        }
    }

    /// Return to `Idle` if `session` still owns the state.
    pub(crate) fn finish(&self, session: u64) {
        let mut cell = self.lock();
        if cell.owner == session {
            cell.state = NarrationState::Idle;
        }
    }

    /// A panic on the narration thread must not wedge the UI, so a poisoned
    /// lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, StateCell> {
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// NarrationSession
// ---------------------------------------------------------------------------

/// One narration run, from `start` until its task exits.
///
/// Cheap to clone; the controller keeps one clone to request a stop and the
/// narration thread holds the other.
#[derive(Debug, Clone)]
pub struct NarrationSession {
    id: u64,
    stop: Arc<AtomicBool>,
    state: SharedNarrationState,
}

impl NarrationSession {
    pub(crate) fn new(id: u64, state: SharedNarrationState) -> Self {
        Self {
            id,
            stop: Arc::new(AtomicBool::new(false)),
            state,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the task to exit before its next sentence.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.state.owner() == self.id {
            self.state.request_stop();
        }
    }

    /// `true` once [`request_stop`](Self::request_stop) has been called.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// `true` while this session owns the state, is speaking, and has not
    /// been asked to stop.
    pub fn is_active(&self) -> bool {
        !self.stop_requested()
            && self.state.owner() == self.id
            && self.state.get() == NarrationState::Speaking
    }

    /// Called by the task on exit.
    pub(crate) fn finish(&self) {
        self.state.finish(self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- NarrationState ---

    #[test]
    fn default_state_is_idle() {
        assert_eq!(NarrationState::default(), NarrationState::Idle);
    }

    #[test]
    fn labels() {
        assert_eq!(NarrationState::Idle.label(), "Idle");
        assert_eq!(NarrationState::Speaking.label(), "Speaking");
        assert_eq!(NarrationState::StopRequested.label(), "Stopping");
    }

    // ---- SharedNarrationState ---

    #[test]
    fn begin_refuses_while_speaking() {
        let state = SharedNarrationState::new();
        assert!(state.begin(1));
        assert!(!state.begin(2));
        assert_eq!(state.owner(), 1);
        assert_eq!(state.get(), NarrationState::Speaking);
    }

    #[test]
    fn begin_allowed_after_stop_request() {
        let state = SharedNarrationState::new();
        assert!(state.begin(1));
        state.request_stop();
        assert_eq!(state.get(), NarrationState::StopRequested);
        assert!(state.begin(2));
        assert_eq!(state.get(), NarrationState::Speaking);
    }

    #[test]
    fn request_stop_when_idle_stays_idle() {
        let state = SharedNarrationState::new();
        state.request_stop();
        assert_eq!(state.get(), NarrationState::Idle);
    }

    #[test]
    fn stale_finish_does_not_reset_newer_session() {
        let state = SharedNarrationState::new();
        state.begin(1);
        state.request_stop();
        state.begin(2);

        state.finish(1);
        assert_eq!(state.get(), NarrationState::Speaking);

        state.finish(2);
        assert_eq!(state.get(), NarrationState::Idle);
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedNarrationState>();
        assert_send_sync::<NarrationSession>();
    }

    // ---- NarrationSession ---

    #[test]
    fn session_lifecycle() {
        let state = SharedNarrationState::new();
        let session = NarrationSession::new(7, state.clone());
        assert!(!session.is_active());

        state.begin(7);
        assert!(session.is_active());

        let handle = session.clone();
        handle.request_stop();
        assert!(session.stop_requested());
        assert!(!session.is_active());
        assert_eq!(state.get(), NarrationState::StopRequested);

        session.finish();
        assert_eq!(state.get(), NarrationState::Idle);
    }

    #[test]
    fn stopping_an_old_session_leaves_new_one_speaking() {
        let state = SharedNarrationState::new();
        let old = NarrationSession::new(1, state.clone());
        state.begin(1);
        old.request_stop();

        let new = NarrationSession::new(2, state.clone());
        state.begin(2);

        old.request_stop();
        assert!(new.is_active());
        assert_eq!(state.get(), NarrationState::Speaking);
    }
}
