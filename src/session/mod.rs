//! Scan session: the live recognition and confirmation loop.
//!
//! # Architecture
//!
//! ```text
//! SessionCommand (mpsc) ─┐
//! interval tick ─────────┤
//! InferenceCompletion ───┼─▶ ScanSession::run()  ← async tokio task, never blocks
//! OpenOutcome (camera) ──┘        │
//!                                 ├─ CaptureScheduler      single-flight, tagged requests
//!                                 ├─ ConfirmationController owns SessionState
//!                                 │        └─ IngredientCollector (append-only)
//!                                 └─ SessionEvent (unbounded mpsc) ─▶ UI
//!
//! SharedSession (Arc<Mutex<SessionSnapshot>>) ←─── read by egui update() each frame
//! ```
//!
//! A frame is sampled only when the camera is on, the session is `Idle` and
//! no request is outstanding.  Ingredients enter the list only through an
//! explicit confirmation or a non-empty manual entry.

pub mod collector;
pub mod controller;
pub mod event;
pub mod runner;
pub mod scheduler;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use collector::IngredientCollector;
pub use controller::{ConfirmationController, SessionError};
pub use event::{SessionCommand, SessionEvent};
pub use runner::ScanSession;
pub use scheduler::{CaptureScheduler, InferenceCompletion, RequestTag};
pub use state::{new_shared_session, SessionSnapshot, SessionState, SharedSession};
