//! Scan session runner: drives the capture → recognise → confirm loop.
//!
//! [`ScanSession`] owns the camera, the scheduler and the controller, and
//! reacts to four sources inside one `tokio::select!` loop:
//!
//! ```text
//! SessionCommand (mpsc) ──▶ camera on/off, confirm, retry, manual entry
//! interval tick         ──▶ should_sample? → latest frame → begin_scan → spawn encode + identify
//! InferenceCompletion   ──▶ stale? drop : gate → controller
//! OpenOutcome           ──▶ superseded? release : install stream, resume
//!
//! SharedSession (Arc<Mutex<SessionSnapshot>>) ◀── published after every step
//! ```
//!
//! Everything that mutates session state runs on this one task, so the
//! controller needs no locking.  Nothing on it blocks: device open and
//! release, frame encoding and recognition calls all run elsewhere and
//! report back through channels.

use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::camera::{
    Activation, CameraBackend, CameraError, CameraResource, CameraStream, FrameSampler,
    OpenOutcome,
};
use crate::config::AppConfig;
use crate::recognition::{ConfidenceGate, IngredientRecognizer};

use super::controller::ConfirmationController;
use super::scheduler::{CaptureScheduler, InferenceCompletion};
use super::state::{SessionState, SharedSession};
use super::{SessionCommand, SessionEvent};

/// How long shutdown waits for the camera to be released.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// One live scanning session.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use ingredient_scanner::camera::UnavailableBackend;
/// use ingredient_scanner::config::AppConfig;
/// use ingredient_scanner::recognition::ApiRecognizer;
/// use ingredient_scanner::session::{new_shared_session, ScanSession, SessionCommand};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let (event_tx, _event_rx) = mpsc::unbounded_channel();
/// let (command_tx, command_rx) = mpsc::channel(16);
///
/// let session = ScanSession::new(
///     &config,
///     Arc::new(UnavailableBackend::new("no device")),
///     Arc::new(ApiRecognizer::from_config(&config.recognition)),
///     new_shared_session(),
///     event_tx,
/// );
/// let task = tokio::spawn(session.run(command_rx));
///
/// command_tx.send(SessionCommand::ActivateCamera).await.unwrap();
/// command_tx.send(SessionCommand::Shutdown).await.unwrap();
/// task.await.unwrap();
/// # }
/// ```
pub struct ScanSession {
    camera: CameraResource,
    sampler: FrameSampler,
    recognizer: Arc<dyn IngredientRecognizer>,
    gate: ConfidenceGate,
    scheduler: CaptureScheduler,
    controller: ConfirmationController,
    events: mpsc::UnboundedSender<SessionEvent>,
    shared: SharedSession,
    completions_tx: mpsc::UnboundedSender<InferenceCompletion>,
    completions_rx: mpsc::UnboundedReceiver<InferenceCompletion>,
    opened_tx: mpsc::UnboundedSender<OpenOutcome>,
    opened_rx: mpsc::UnboundedReceiver<OpenOutcome>,
    /// Last stream release still running on the blocking pool.
    releasing: Option<JoinHandle<()>>,
}

impl ScanSession {
    /// Build a session with the camera off and an empty ingredient list.
    pub fn new(
        config: &AppConfig,
        camera: Arc<dyn CameraBackend>,
        recognizer: Arc<dyn IngredientRecognizer>,
        shared: SharedSession,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        Self {
            camera: CameraResource::new(camera),
            sampler: FrameSampler::from_config(&config.camera),
            recognizer,
            gate: ConfidenceGate::new(config.recognition.threshold),
            scheduler: CaptureScheduler::new(config.scan.interval()),
            controller: ConfirmationController::new(events.clone()),
            events,
            shared,
            completions_tx,
            completions_rx,
            opened_tx,
            opened_rx,
            releasing: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        self.controller.state()
    }

    pub fn ingredients(&self) -> &[String] {
        self.controller.collector().items()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `Shutdown` arrives or every command sender is dropped.
    /// The camera is released and any outstanding request aborted on exit.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let mut ticker = tokio::time::interval(self.scheduler.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "session: started (interval {:?}, threshold {:.2})",
            self.scheduler.period(),
            self.gate.threshold()
        );
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                _ = ticker.tick() => self.on_tick(),
                Some(done) = self.completions_rx.recv() => self.on_completion(done),
                Some(opened) = self.opened_rx.recv() => self.on_camera_opened(opened),
            }
            self.publish();
        }

        self.shutdown().await;
        self.publish();
        log::info!("session: stopped");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Apply one command.  `Break` means the session should stop.
    fn handle_command(&mut self, command: SessionCommand) -> ControlFlow<()> {
        log::debug!("session: command {command:?}");
        let outcome = match command {
            SessionCommand::Shutdown => return ControlFlow::Break(()),
            SessionCommand::ActivateCamera => {
                self.activate_camera();
                Ok(())
            }
            SessionCommand::DeactivateCamera => {
                self.deactivate_camera();
                Ok(())
            }
            SessionCommand::Confirm => self.controller.confirm(),
            SessionCommand::Retry => self.controller.retry(),
            SessionCommand::SwitchToManual => self.controller.switch_to_manual(),
            SessionCommand::RequestManualEntry => {
                let opened = self.controller.request_manual_entry();
                if opened.is_ok() {
                    // A scan may be outstanding; its answer is no longer wanted.
                    self.scheduler.advance_generation();
                }
                opened
            }
            SessionCommand::CancelManualEntry => self.controller.cancel_manual_entry(),
            SessionCommand::SubmitManual(text) => self.controller.submit_manual(&text),
        };

        if let Err(e) = outcome {
            log::warn!("session: {e}");
        }
        ControlFlow::Continue(())
    }

    fn on_tick(&mut self) {
        if !self
            .scheduler
            .should_sample(self.camera.is_active(), self.controller.state())
        {
            return;
        }

        let Some(frame) = self.camera.latest_frame() else {
            log::trace!("camera: no frame yet");
            return;
        };

        if self.controller.begin_scan().is_ok() {
            self.scheduler.start(
                Arc::clone(&self.recognizer),
                &self.sampler,
                frame,
                self.completions_tx.clone(),
            );
        }
    }

    fn on_completion(&mut self, done: InferenceCompletion) {
        if !self.scheduler.complete(done.tag) {
            return;
        }

        let outcome = match done.result {
            Ok(result) => self.controller.on_gate_outcome(self.gate.evaluate(result)),
            Err(err) => {
                log::warn!("recognition: {err}");
                self.controller.on_inference_error(&err)
            }
        };

        if let Err(e) = outcome {
            log::debug!("session: {e}");
        }
    }

    /// Start opening the device.  The outcome arrives later as an
    /// [`OpenOutcome`].
    fn activate_camera(&mut self) {
        let Some(pending) = self.camera.begin_activation() else {
            return;
        };
        let previous_release = self.releasing.take();
        let opened = self.opened_tx.clone();
        let attempt = pending.attempt();

        tokio::spawn(async move {
            // The device may still be held by the stream being released.
            if let Some(release) = previous_release {
                let _ = release.await;
            }
            let delivered = opened.clone();
            // Can wait on a slow driver or an OS permission prompt.  A stream
            // nobody receives any more is dropped, and released, right here.
            let open = tokio::task::spawn_blocking(move || {
                let _ = delivered.send(pending.open());
            });
            if let Err(e) = open.await {
                let _ = opened.send(OpenOutcome {
                    attempt,
                    result: Err(CameraError::DeviceUnavailable(e.to_string())),
                });
            }
        });
        log::debug!("camera: open attempt {attempt} started");
    }

    fn on_camera_opened(&mut self, outcome: OpenOutcome) {
        match self.camera.finish_activation(outcome) {
            Activation::Opened => {
                log::info!("camera: active");
                self.controller.resume();
            }
            Activation::Failed(CameraError::PermissionDenied) => {
                log::warn!("camera: permission denied");
                self.emit(SessionEvent::CameraPermissionDenied);
            }
            Activation::Failed(CameraError::DeviceUnavailable(reason)) => {
                log::warn!("camera: unavailable: {reason}");
                self.emit(SessionEvent::CameraUnavailable(reason));
            }
            Activation::Superseded(stream) => {
                if let Some(stream) = stream {
                    self.release(stream);
                }
            }
        }
    }

    fn deactivate_camera(&mut self) {
        self.scheduler.advance_generation();
        if let Some(stream) = self.camera.deactivate() {
            self.release(stream);
        }
        self.controller.pause();
        log::info!("camera: off");
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Drop `stream` on the blocking pool; the capture thread join can stall.
    fn release(&mut self, stream: Box<dyn CameraStream>) {
        let previous = self.releasing.take();
        self.releasing = Some(tokio::task::spawn_blocking(move || {
            if let Some(previous) = previous {
                let _ = tokio::runtime::Handle::current().block_on(previous);
            }
            drop(stream);
        }));
    }

    async fn shutdown(&mut self) {
        self.scheduler.cancel();
        if let Some(stream) = self.camera.deactivate() {
            self.release(stream);
        }
        if let Some(release) = self.releasing.take() {
            if tokio::time::timeout(RELEASE_TIMEOUT, release).await.is_err() {
                log::warn!("camera: release still running after {RELEASE_TIMEOUT:?}");
            }
        }
    }

    fn publish(&self) {
        let mut snap = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        snap.state = self.controller.state().clone();
        snap.camera = self.camera.state();
        snap.inference_in_flight = self.scheduler.is_busy();
        if snap.ingredients.len() != self.controller.collector().len() {
            snap.ingredients = self.controller.collector().to_vec();
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
