//! Live ingredient scanner.
//!
//! A camera feed is sampled on a fixed period, each frame goes to an external
//! recognition service, and the answer is proposed to the user for
//! confirmation (or replaced by manual entry).  Confirmed names accumulate in
//! an ordered list that the recipe assistant turns into suggestions.
//!
//! ```text
//! CameraResource ─▶ FrameSampler ─▶ IngredientRecognizer ─▶ ConfidenceGate
//!        ▲                                                       │
//!        │ pause / resume                                        ▼
//!   ScanSession ◀───────────────────────────── ConfirmationController
//!                                                                │
//!                                                                ▼
//!                                                   IngredientCollector
//! ```

pub mod app;
pub mod camera;
pub mod chat;
pub mod config;
pub mod recipes;
pub mod recognition;
pub mod session;
