//! Camera access: device lifecycle and frame sampling.
//!
//! # Pipeline
//!
//! ```text
//! CameraBackend::open ─▶ CameraStream (latest-frame slot, RAII)
//!                              │
//!                 CameraResource (exclusive owner, begin / finish activation,
//!                              │  deactivate hands the stream back)
//!                              │
//!                 FrameSampler::capture ─▶ ImageBlob (JPEG, data URI)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ingredient_scanner::camera::{CameraResource, FrameSampler, UnavailableBackend};
//!
//! let mut camera = CameraResource::new(Arc::new(UnavailableBackend::new("no device")));
//! let sampler = FrameSampler::new(80, 1024);
//!
//! if camera.activate().is_ok() {
//!     if let Some(blob) = sampler.capture(&camera) {
//!         println!("{} bytes of {}", blob.bytes.len(), blob.mime);
//!     }
//! }
//! camera.deactivate();
//! ```

#[cfg(feature = "webcam")]
pub mod nokhwa_backend;
pub mod resource;
pub mod sampler;

#[cfg(feature = "webcam")]
pub use nokhwa_backend::NokhwaBackend;
pub use resource::{
    Activation, CameraBackend, CameraError, CameraResource, CameraState, CameraStream,
    OpenOutcome, PendingOpen, UnavailableBackend,
};
pub use sampler::{FrameSampler, ImageBlob};

#[cfg(test)]
pub use resource::MockCameraBackend;
