//! Messages into and out of a running [`ScanSession`](super::ScanSession).

use super::SessionState;

/// Requests from the UI.  Sent over a bounded `tokio::sync::mpsc` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ActivateCamera,
    DeactivateCamera,
    /// Accept the proposed match.
    Confirm,
    /// Drop the proposed match and keep scanning.
    Retry,
    /// Drop the proposed match and type the ingredient instead.
    SwitchToManual,
    /// Open manual entry without waiting for a scan.
    RequestManualEntry,
    CancelManualEntry,
    SubmitManual(String),
    Shutdown,
}

/// Notifications for the UI.  Sent over an unbounded channel so the session
/// never waits on a slow reader.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A name was appended to the ingredient list.
    IngredientConfirmed { name: String },
    StateChanged(SessionState),
    CameraPermissionDenied,
    CameraUnavailable(String),
    /// A recognition call failed; the session fell back to manual entry.
    InferenceWarning(String),
    ManualEntryRejected(String),
}
