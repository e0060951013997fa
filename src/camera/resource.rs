//! Exclusive ownership of the camera device.
//!
//! [`CameraResource`] is the only holder of a [`CameraStream`].  The stream is
//! a RAII guard: dropping it releases the device, so `deactivate`, a failed
//! session and plain `Drop` all end up in the same place.
//!
//! Opening a device can block for a long time (a slow driver, an OS
//! permission prompt), so activation is split in two.  `begin_activation`
//! hands out a [`PendingOpen`] that the caller runs wherever blocking is
//! allowed; its [`OpenOutcome`] comes back through `finish_activation`.
//! [`CameraResource::activate`] chains both for callers that may block.

use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CameraError
// ---------------------------------------------------------------------------

/// Why the camera could not be acquired.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
}

// ---------------------------------------------------------------------------
// CameraState
// ---------------------------------------------------------------------------

/// Observable camera status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraState {
    /// `false` after the platform refused access; `true` once a stream has
    /// been opened at least once.
    pub permission_granted: bool,
    /// A device stream is currently held.
    pub active: bool,
    /// An open was started and has not reported back yet.
    pub opening: bool,
}

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// A live device stream.  Dropping it must release the device.
pub trait CameraStream: Send {
    /// Most recent decoded frame, or `None` before the first frame arrives.
    fn latest_frame(&self) -> Option<RgbImage>;
}

/// Opens device streams.
pub trait CameraBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

// Compile-time assertion: both traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CameraBackend>, _: Box<dyn CameraStream>) {}
};

/// Backend used when no capture support is compiled in.  Every `open` fails
/// with [`CameraError::DeviceUnavailable`].
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CameraBackend for UnavailableBackend {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::DeviceUnavailable(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// Two-step activation
// ---------------------------------------------------------------------------

/// A device open that has been started but not yet performed.
pub struct PendingOpen {
    attempt: u64,
    backend: Arc<dyn CameraBackend>,
}

impl PendingOpen {
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Open the device.  Blocks until the backend answers.
    pub fn open(self) -> OpenOutcome {
        OpenOutcome {
            attempt: self.attempt,
            result: self.backend.open(),
        }
    }
}

/// What a [`PendingOpen`] produced, tagged with its attempt number.
pub struct OpenOutcome {
    pub attempt: u64,
    pub result: Result<Box<dyn CameraStream>, CameraError>,
}

/// How `finish_activation` resolved an [`OpenOutcome`].
pub enum Activation {
    Opened,
    Failed(CameraError),
    /// The attempt was cancelled by a deactivation in the meantime.  A
    /// stream it managed to open is handed back and must be released.
    Superseded(Option<Box<dyn CameraStream>>),
}

// ---------------------------------------------------------------------------
// CameraResource
// ---------------------------------------------------------------------------

/// Owns the (at most one) open camera stream.
pub struct CameraResource {
    backend: Arc<dyn CameraBackend>,
    stream: Option<Box<dyn CameraStream>>,
    permission_granted: bool,
    opening: Option<u64>,
    attempts: u64,
}

impl CameraResource {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            stream: None,
            permission_granted: false,
            opening: None,
            attempts: 0,
        }
    }

    /// Current status.  `active` is derived from the held stream, so an
    /// active camera without a handle cannot be represented.
    pub fn state(&self) -> CameraState {
        CameraState {
            permission_granted: self.permission_granted,
            active: self.stream.is_some(),
            opening: self.opening.is_some(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Start acquiring the device.  Returns `None` while a stream is held or
    /// another open is still outstanding.
    pub fn begin_activation(&mut self) -> Option<PendingOpen> {
        if self.stream.is_some() || self.opening.is_some() {
            log::debug!("camera: activate ignored, already active or opening");
            return None;
        }
        self.attempts += 1;
        self.opening = Some(self.attempts);
        Some(PendingOpen {
            attempt: self.attempts,
            backend: Arc::clone(&self.backend),
        })
    }

    /// Apply the outcome of a [`PendingOpen`].
    ///
    /// [`CameraError::PermissionDenied`] also clears `permission_granted`;
    /// [`CameraError::DeviceUnavailable`] leaves it untouched.  The resource
    /// stays inactive in both cases.  Outcomes of an attempt other than the
    /// outstanding one are [`Activation::Superseded`].
    pub fn finish_activation(&mut self, outcome: OpenOutcome) -> Activation {
        if self.opening != Some(outcome.attempt) {
            log::debug!("camera: open attempt {} superseded", outcome.attempt);
            return Activation::Superseded(outcome.result.ok());
        }
        self.opening = None;

        match outcome.result {
            Ok(stream) => {
                self.stream = Some(stream);
                self.permission_granted = true;
                log::info!("camera: stream opened");
                Activation::Opened
            }
            Err(err) => {
                if err == CameraError::PermissionDenied {
                    self.permission_granted = false;
                }
                log::warn!("camera: activation failed: {err}");
                Activation::Failed(err)
            }
        }
    }

    /// Acquire the device on the calling thread.  A no-op while active.
    ///
    /// # Errors
    ///
    /// As for [`finish_activation`](Self::finish_activation).
    pub fn activate(&mut self) -> Result<(), CameraError> {
        let Some(pending) = self.begin_activation() else {
            return Ok(());
        };
        match self.finish_activation(pending.open()) {
            Activation::Failed(err) => Err(err),
            Activation::Opened | Activation::Superseded(_) => Ok(()),
        }
    }

    /// Give up the device and cancel any outstanding open.  Safe to call
    /// when already inactive.
    ///
    /// The stream is handed back so the caller decides where the (possibly
    /// slow) release happens; dropping it releases the device.
    pub fn deactivate(&mut self) -> Option<Box<dyn CameraStream>> {
        self.opening = None;
        let stream = self.stream.take();
        if stream.is_some() {
            log::info!("camera: stream handed off for release");
        }
        stream
    }

    /// Latest frame from the held stream; `None` while inactive.
    pub fn latest_frame(&self) -> Option<RgbImage> {
        self.stream.as_ref().and_then(|s| s.latest_frame())
    }
}

impl Drop for CameraResource {
    fn drop(&mut self) {
        drop(self.deactivate());
    }
}

// ---------------------------------------------------------------------------
// MockCameraBackend (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockCameraBackend;

#[cfg(test)]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use image::RgbImage;

    use super::{CameraBackend, CameraError, CameraStream};

    /// Scriptable backend that counts opens, live streams and frame reads.
    pub struct MockCameraBackend {
        outcome: Mutex<Result<Option<RgbImage>, CameraError>>,
        opens: AtomicUsize,
        live: Arc<AtomicUsize>,
        reads: Arc<AtomicUsize>,
    }

    impl MockCameraBackend {
        /// Streams deliver `frame` on every read.
        pub fn with_frame(frame: RgbImage) -> Self {
            Self::with_outcome(Ok(Some(frame)))
        }

        /// Streams open but never produce a frame.
        pub fn without_frame() -> Self {
            Self::with_outcome(Ok(None))
        }

        /// Every `open` fails with `err`.
        pub fn failing(err: CameraError) -> Self {
            Self::with_outcome(Err(err))
        }

        fn with_outcome(outcome: Result<Option<RgbImage>, CameraError>) -> Self {
            Self {
                outcome: Mutex::new(outcome),
                opens: AtomicUsize::new(0),
                live: Arc::new(AtomicUsize::new(0)),
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Change what the next `open` does.
        pub fn set_outcome(&self, outcome: Result<Option<RgbImage>, CameraError>) {
            *self.outcome.lock().unwrap() = outcome;
        }

        pub fn open_count(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub fn live_streams(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        pub fn frame_reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl CameraBackend for MockCameraBackend {
        fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let frame = self.outcome.lock().unwrap().clone()?;
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockStream {
                frame,
                live: Arc::clone(&self.live),
                reads: Arc::clone(&self.reads),
            }))
        }
    }

    struct MockStream {
        frame: Option<RgbImage>,
        live: Arc<AtomicUsize>,
        reads: Arc<AtomicUsize>,
    }

    impl CameraStream for MockStream {
        fn latest_frame(&self) -> Option<RgbImage> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.frame.clone()
        }
    }

    impl Drop for MockStream {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
