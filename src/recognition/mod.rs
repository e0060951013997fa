//! Ingredient recognition: the external vision service and the confidence
//! gate applied to its answers.
//!
//! This module provides:
//! * [`IngredientRecognizer`]: async trait implemented by recognizer backends.
//! * [`ApiRecognizer`]: OpenAI-compatible vision chat backend.
//! * [`RecognitionResult`]: validated `{name, confidence}` answer.
//! * [`ConfidenceGate`] / [`gate`]: accept/reject against a threshold.
//! * [`InferenceError`]: error variants for a recognition call.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ingredient_scanner::camera::ImageBlob;
//! use ingredient_scanner::config::AppConfig;
//! use ingredient_scanner::recognition::{ApiRecognizer, ConfidenceGate, GateOutcome, IngredientRecognizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let recognizer = ApiRecognizer::from_config(&config.recognition);
//!     let gate = ConfidenceGate::new(config.recognition.threshold);
//!
//!     let blob = ImageBlob { bytes: vec![], mime: "image/jpeg", width: 0, height: 0 };
//!     if let Ok(result) = recognizer.identify(&blob).await {
//!         match gate.evaluate(result) {
//!             GateOutcome::Accept(r) => println!("looks like {}", r.name()),
//!             GateOutcome::Reject(_) => println!("not sure"),
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod gate;
pub mod prompt;

pub use client::{ApiRecognizer, InferenceError, IngredientRecognizer, RecognitionResult};
pub use gate::{gate, ConfidenceGate, GateOutcome};

#[cfg(test)]
pub use client::ScriptedRecognizer;
