//! The confirmation state machine.
//!
//! [`ConfirmationController`] is the only writer of [`SessionState`] and of
//! the [`IngredientCollector`].  Every user action and every recognition
//! outcome arrives as a method call; a call that does not fit the current
//! state returns [`SessionError::InvalidTransition`] and changes nothing.
//!
//! An ingredient is recorded only by [`confirm`](ConfirmationController::confirm)
//! or a valid [`submit_manual`](ConfirmationController::submit_manual).  A
//! confident match is a proposal, never a commitment.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::recognition::{GateOutcome, InferenceError};

use super::collector::IngredientCollector;
use super::state::SessionState;
use super::SessionEvent;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Why a controller call was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("ingredient name cannot be empty")]
    EmptyManualEntry,
}

// ---------------------------------------------------------------------------
// ConfirmationController
// ---------------------------------------------------------------------------

pub struct ConfirmationController {
    state: SessionState,
    collector: IngredientCollector,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ConfirmationController {
    /// Start in `Idle` with an empty ingredient list.
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            state: SessionState::Idle,
            collector: IngredientCollector::new(),
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn collector(&self) -> &IngredientCollector {
        &self.collector
    }

    // -----------------------------------------------------------------------
    // Scheduler-driven transitions
    // -----------------------------------------------------------------------

    /// `Idle → Scanning` when the scheduler sends a frame off.
    pub fn begin_scan(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.transition(SessionState::Scanning);
                Ok(())
            }
            _ => Err(self.invalid("start a scan")),
        }
    }

    /// Route a gated recognition result.
    ///
    /// `Accept` proposes the match; `Reject` goes straight to manual entry.
    pub fn on_gate_outcome(&mut self, outcome: GateOutcome) -> Result<(), SessionError> {
        if self.state != SessionState::Scanning {
            return Err(self.invalid("accept a recognition result"));
        }
        match outcome {
            GateOutcome::Accept(result) => {
                log::debug!(
                    "session: proposing {} ({:.2})",
                    result.name(),
                    result.confidence()
                );
                self.transition(SessionState::AwaitingConfirmation(result));
            }
            GateOutcome::Reject(result) => {
                log::debug!(
                    "session: rejected {} ({:.2}), asking for manual entry",
                    result.name(),
                    result.confidence()
                );
                self.transition(SessionState::ManualEntry);
            }
        }
        Ok(())
    }

    /// A failed recognition counts as a reject and surfaces a warning.
    pub fn on_inference_error(&mut self, err: &InferenceError) -> Result<(), SessionError> {
        if self.state != SessionState::Scanning {
            return Err(self.invalid("accept a recognition failure"));
        }
        self.emit(SessionEvent::InferenceWarning(err.to_string()));
        self.transition(SessionState::ManualEntry);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User decisions on a proposed match
    // -----------------------------------------------------------------------

    /// Record the proposed match and resume scanning.
    pub fn confirm(&mut self) -> Result<(), SessionError> {
        let SessionState::AwaitingConfirmation(result) = &self.state else {
            return Err(self.invalid("confirm"));
        };
        let name = result.name().to_string();
        self.record(name);
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Drop the proposed match and resume scanning.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if self.state.pending_result().is_none() {
            return Err(self.invalid("retry"));
        }
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Drop the proposed match and type the ingredient instead.
    pub fn switch_to_manual(&mut self) -> Result<(), SessionError> {
        if self.state.pending_result().is_none() {
            return Err(self.invalid("switch to manual entry"));
        }
        self.transition(SessionState::ManualEntry);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Manual entry
    // -----------------------------------------------------------------------

    /// Open manual entry without waiting for a scan.  Allowed from `Idle`,
    /// `Scanning` (the caller cancels the outstanding request) and `Paused`.
    pub fn request_manual_entry(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Scanning | SessionState::Paused => {
                self.transition(SessionState::ManualEntry);
                Ok(())
            }
            _ => Err(self.invalid("open manual entry")),
        }
    }

    /// Leave manual entry without recording anything.
    pub fn cancel_manual_entry(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::ManualEntry {
            return Err(self.invalid("cancel manual entry"));
        }
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Record `text` (trimmed) and resume scanning.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyManualEntry`] for blank input; the state stays
    /// `ManualEntry` and a `ManualEntryRejected` event is emitted.
    pub fn submit_manual(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state != SessionState::ManualEntry {
            return Err(self.invalid("submit a manual entry"));
        }
        let name = text.trim();
        if name.is_empty() {
            let err = SessionError::EmptyManualEntry;
            self.emit(SessionEvent::ManualEntryRejected(err.to_string()));
            return Err(err);
        }
        self.record(name.to_string());
        self.transition(SessionState::Idle);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Camera-driven transitions
    // -----------------------------------------------------------------------

    /// Camera turned off: any state → `Paused`, discarding a pending match.
    pub fn pause(&mut self) {
        if self.state != SessionState::Paused {
            self.transition(SessionState::Paused);
        }
    }

    /// Camera turned on: `Paused → Idle`.  Other states are left alone so an
    /// open dialog or manual entry survives a camera restart.
    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.transition(SessionState::Idle);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn record(&mut self, name: String) {
        log::info!("session: ingredient confirmed: {name}");
        self.collector.push(name.clone());
        self.emit(SessionEvent::IngredientConfirmed { name });
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("session: {} → {}", self.state, next);
        self.state = next;
        self.emit(SessionEvent::StateChanged(self.state.clone()));
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.state.label(),
            action,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver may be gone during shutdown.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::{gate, RecognitionResult};

    const THRESHOLD: f32 = 0.7;

    fn controller() -> (ConfirmationController, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConfirmationController::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    fn confirmations(events: &[SessionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::IngredientConfirmed { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn scan(c: &mut ConfirmationController, name: &str, confidence: f32) {
        c.begin_scan().unwrap();
        let result = RecognitionResult::new(name, confidence).unwrap();
        c.on_gate_outcome(gate(result, THRESHOLD)).unwrap();
    }

    #[test]
    fn starts_idle_and_empty() {
        let (c, _rx) = controller();
        assert_eq!(c.state(), &SessionState::Idle);
        assert!(c.collector().is_empty());
    }

    /// Tomato at 0.92 is proposed, then confirmed.
    #[test]
    fn confident_match_then_confirm() {
        let (mut c, mut rx) = controller();

        scan(&mut c, "Tomato", 0.92);
        assert!(matches!(c.state(), SessionState::AwaitingConfirmation(r) if r.name() == "Tomato"));
        assert!(c.collector().is_empty());

        c.confirm().unwrap();
        assert_eq!(c.state(), &SessionState::Idle);
        assert_eq!(c.collector().items(), ["Tomato"]);
        assert_eq!(confirmations(&drain(&mut rx)), vec!["Tomato".to_string()]);
    }

    /// Basil at 0.4 skips the dialog and opens manual entry.
    #[test]
    fn low_confidence_goes_to_manual_entry() {
        let (mut c, _rx) = controller();
        scan(&mut c, "Basil", 0.4);
        assert_eq!(c.state(), &SessionState::ManualEntry);
        assert!(!c.state().allows_capture());
        assert!(c.collector().is_empty());
    }

    #[test]
    fn whitespace_manual_entry_is_rejected() {
        let (mut c, mut rx) = controller();
        scan(&mut c, "Basil", 0.4);
        drain(&mut rx);

        assert_eq!(c.submit_manual("  "), Err(SessionError::EmptyManualEntry));
        assert_eq!(c.state(), &SessionState::ManualEntry);
        assert!(c.collector().is_empty());

        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [SessionEvent::ManualEntryRejected(_)]));
    }

    #[test]
    fn manual_submit_records_trimmed_name() {
        let (mut c, mut rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        c.confirm().unwrap();
        scan(&mut c, "Basil", 0.4);

        c.submit_manual("  Mozzarella ").unwrap();

        assert_eq!(c.state(), &SessionState::Idle);
        assert_eq!(c.collector().items(), ["Tomato", "Mozzarella"]);
        assert_eq!(
            confirmations(&drain(&mut rx)),
            vec!["Tomato".to_string(), "Mozzarella".to_string()]
        );
    }

    #[test]
    fn retry_discards_without_recording() {
        let (mut c, mut rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        c.retry().unwrap();
        assert_eq!(c.state(), &SessionState::Idle);
        assert!(c.collector().is_empty());
        assert!(confirmations(&drain(&mut rx)).is_empty());
    }

    #[test]
    fn switch_to_manual_discards_match() {
        let (mut c, _rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        c.switch_to_manual().unwrap();
        assert_eq!(c.state(), &SessionState::ManualEntry);
        assert!(c.collector().is_empty());
    }

    #[test]
    fn inference_error_is_an_implicit_reject() {
        let (mut c, mut rx) = controller();
        c.begin_scan().unwrap();
        drain(&mut rx);

        c.on_inference_error(&InferenceError::Network("connection refused".into()))
            .unwrap();

        assert_eq!(c.state(), &SessionState::ManualEntry);
        assert!(c.collector().is_empty());
        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(SessionEvent::InferenceWarning(_))));
    }

    #[test]
    fn decisions_outside_awaiting_are_refused() {
        let (mut c, _rx) = controller();
        assert!(matches!(c.confirm(), Err(SessionError::InvalidTransition { .. })));
        assert!(c.retry().is_err());
        assert!(c.switch_to_manual().is_err());
        assert!(c.submit_manual("Tomato").is_err());
        assert_eq!(c.state(), &SessionState::Idle);
        assert!(c.collector().is_empty());
    }

    #[test]
    fn gate_outcome_outside_scanning_is_refused() {
        let (mut c, _rx) = controller();
        let r = RecognitionResult::new("Tomato", 0.9).unwrap();
        assert!(c.on_gate_outcome(GateOutcome::Accept(r)).is_err());
        assert_eq!(c.state(), &SessionState::Idle);
    }

    #[test]
    fn no_second_scan_while_awaiting() {
        let (mut c, _rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        assert!(c.begin_scan().is_err());
        assert!(matches!(c.state(), SessionState::AwaitingConfirmation(_)));
    }

    #[test]
    fn pause_from_any_state_and_resume_to_idle() {
        let (mut c, _rx) = controller();
        scan(&mut c, "Tomato", 0.92);

        c.pause();
        assert_eq!(c.state(), &SessionState::Paused);
        assert!(c.confirm().is_err());

        c.resume();
        assert_eq!(c.state(), &SessionState::Idle);
        assert!(c.collector().is_empty());
    }

    #[test]
    fn resume_leaves_manual_entry_alone() {
        let (mut c, _rx) = controller();
        c.request_manual_entry().unwrap();
        c.resume();
        assert_eq!(c.state(), &SessionState::ManualEntry);
    }

    #[test]
    fn manual_entry_from_paused_returns_to_idle() {
        let (mut c, _rx) = controller();
        c.pause();
        c.request_manual_entry().unwrap();
        c.submit_manual("Flour").unwrap();
        assert_eq!(c.state(), &SessionState::Idle);
        assert_eq!(c.collector().items(), ["Flour"]);
    }

    #[test]
    fn cancel_manual_entry_records_nothing() {
        let (mut c, _rx) = controller();
        c.request_manual_entry().unwrap();
        c.cancel_manual_entry().unwrap();
        assert_eq!(c.state(), &SessionState::Idle);
        assert!(c.collector().is_empty());
    }

    #[test]
    fn manual_entry_cannot_open_over_a_pending_match() {
        let (mut c, _rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        assert!(c.request_manual_entry().is_err());
    }

    #[test]
    fn every_transition_is_announced() {
        let (mut c, mut rx) = controller();
        scan(&mut c, "Tomato", 0.92);
        c.confirm().unwrap();

        let states: Vec<SessionState> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0], SessionState::Scanning);
        assert!(matches!(states[1], SessionState::AwaitingConfirmation(_)));
        assert_eq!(states[2], SessionState::Idle);
    }

    #[test]
    fn closed_event_channel_does_not_panic() {
        let (mut c, rx) = controller();
        drop(rx);
        scan(&mut c, "Tomato", 0.92);
        c.confirm().unwrap();
        assert_eq!(c.collector().len(), 1);
    }
}
