//! Webcam capture via `nokhwa`.
//!
//! `nokhwa::Camera` is not `Send` on every platform, so each opened stream
//! owns the device on a dedicated `camera-capture` thread.  The thread keeps
//! overwriting a single latest-frame slot; dropping the [`NokhwaStream`]
//! raises a stop flag and joins the thread, which stops the device stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use super::{CameraBackend, CameraError, CameraStream};

/// Pause after a failed frame read before trying again.
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

type FrameSlot = Arc<Mutex<Option<RgbImage>>>;

// ---------------------------------------------------------------------------
// NokhwaBackend
// ---------------------------------------------------------------------------

/// Opens the webcam at a fixed device index.
#[derive(Debug, Clone)]
pub struct NokhwaBackend {
    index: u32,
}

impl NokhwaBackend {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl CameraBackend for NokhwaBackend {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        let latest: FrameSlot = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CameraError>>();

        let index = self.index;
        let thread_latest = Arc::clone(&latest);
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || capture_loop(index, thread_latest, thread_stop, ready_tx))
            .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;

        // Block until the device is open (or refused) so activation reports
        // the real outcome.  Callers run this off the async runtime.
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(NokhwaStream {
                latest,
                stop,
                thread: Some(thread),
            })),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CameraError::DeviceUnavailable(
                    "capture thread exited before opening the device".into(),
                ))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NokhwaStream
// ---------------------------------------------------------------------------

/// RAII guard for one open webcam stream.
pub struct NokhwaStream {
    latest: FrameSlot,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CameraStream for NokhwaStream {
    fn latest_frame(&self) -> Option<RgbImage> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("camera: capture thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

fn capture_loop(
    index: u32,
    latest: FrameSlot,
    stop: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), CameraError>>,
) {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

    let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(classify(&e)));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(classify(&e)));
        return;
    }

    log::info!("camera: device {index} streaming ({})", camera.info().human_name());
    let _ = ready.send(Ok(()));

    while !stop.load(Ordering::Acquire) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("camera: frame read failed: {e}");
                std::thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        };

        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("camera: frame decode failed: {e}");
                continue;
            }
        };

        // Rebuild through raw bytes so the frame type does not depend on the
        // `image` version nokhwa links against.
        let (width, height) = (decoded.width(), decoded.height());
        if let Some(frame) = RgbImage::from_raw(width, height, decoded.into_raw()) {
            *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
        }
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("camera: failed to stop stream: {e}");
    }
}

/// Map a nokhwa error onto the two failure kinds the session distinguishes.
fn classify(err: &NokhwaError) -> CameraError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CameraError::PermissionDenied
    } else {
        CameraError::DeviceUnavailable(message)
    }
}
