//! Session state machine values and the snapshot shared with the UI.
//!
//! [`SessionState`] is owned by the
//! [`ConfirmationController`](super::ConfirmationController); everything else
//! sees copies.  [`SharedSession`] carries a [`SessionSnapshot`] that the
//! runner refreshes after each step and the egui update loop reads each frame.

use std::sync::{Arc, Mutex};

use crate::camera::CameraState;
use crate::recognition::RecognitionResult;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of the recognition/confirmation loop.
///
/// ```text
/// Idle ──tick──▶ Scanning ──accept──▶ AwaitingConfirmation
///                   │                   ├─ confirm ──▶ Idle (+ ingredient)
///                   │                   ├─ retry ────▶ Idle
///                   │                   └─ manual ───▶ ManualEntry
///                   └─reject / error──▶ ManualEntry ──submit──▶ Idle (+ ingredient)
/// any ──camera off──▶ Paused ──camera on──▶ Idle
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Waiting for the next capture tick.
    #[default]
    Idle,

    /// A frame has been sent for recognition and the answer is pending.
    Scanning,

    /// A confident match is waiting for the user's decision.
    AwaitingConfirmation(RecognitionResult),

    /// The user is expected to type the ingredient.
    ManualEntry,

    /// The camera was turned off.
    Paused,
}

impl SessionState {
    /// Only `Idle` lets the scheduler sample a frame.
    ///
    /// ```
    /// use ingredient_scanner::session::SessionState;
    ///
    /// assert!(SessionState::Idle.allows_capture());
    /// assert!(!SessionState::Scanning.allows_capture());
    /// assert!(!SessionState::ManualEntry.allows_capture());
    /// assert!(!SessionState::Paused.allows_capture());
    /// ```
    pub fn allows_capture(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// The match awaiting a decision, if any.
    pub fn pending_result(&self) -> Option<&RecognitionResult> {
        match self {
            SessionState::AwaitingConfirmation(result) => Some(result),
            _ => None,
        }
    }

    /// A short label for logs and the status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::AwaitingConfirmation(_) => "awaiting confirmation",
            SessionState::ManualEntry => "manual entry",
            SessionState::Paused => "paused",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Copy of everything the UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub camera: CameraState,
    /// Confirmed ingredient names in confirmation order.
    pub ingredients: Vec<String>,
    /// A recognition request is outstanding.
    pub inference_in_flight: bool,
}

// ---------------------------------------------------------------------------
// SharedSession
// ---------------------------------------------------------------------------

/// Thread-safe handle to the latest [`SessionSnapshot`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedSession = Arc<Mutex<SessionSnapshot>>;

pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(SessionSnapshot::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn pending_result_only_while_awaiting() {
        let r = RecognitionResult::new("Tomato", 0.9).unwrap();
        let awaiting = SessionState::AwaitingConfirmation(r.clone());
        assert_eq!(awaiting.pending_result(), Some(&r));
        assert!(SessionState::Idle.pending_result().is_none());
        assert!(SessionState::ManualEntry.pending_result().is_none());
    }

    #[test]
    fn labels() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Paused.label(), "paused");
        assert_eq!(SessionState::ManualEntry.label(), "manual entry");
    }

    #[test]
    fn snapshot_starts_empty() {
        let snap = SessionSnapshot::default();
        assert_eq!(snap.state, SessionState::Idle);
        assert!(!snap.camera.active);
        assert!(snap.ingredients.is_empty());
        assert!(!snap.inference_in_flight);
    }

    #[test]
    fn shared_session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSession>();
    }
}
