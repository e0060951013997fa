//! Periodic, single-flight capture scheduling.
//!
//! [`CaptureScheduler`] answers two questions for the runner on every tick:
//! may a frame be sampled now, and if so, where does the answer go.  At most
//! one recognition request is outstanding.  Each request carries a
//! [`RequestTag`]; bumping the generation (camera off, manual entry) makes
//! every older tag stale so a late answer cannot reach the controller.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::camera::FrameSampler;
use crate::recognition::{InferenceError, IngredientRecognizer, RecognitionResult};

use super::SessionState;

// ---------------------------------------------------------------------------
// RequestTag / InferenceCompletion
// ---------------------------------------------------------------------------

/// Identity of one recognition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTag {
    pub generation: u64,
    pub id: u64,
}

/// A finished recognition request, delivered back to the runner.
#[derive(Debug)]
pub struct InferenceCompletion {
    pub tag: RequestTag,
    pub result: Result<RecognitionResult, InferenceError>,
}

// ---------------------------------------------------------------------------
// CaptureScheduler
// ---------------------------------------------------------------------------

struct InFlight {
    tag: RequestTag,
    handle: JoinHandle<()>,
}

pub struct CaptureScheduler {
    period: Duration,
    generation: u64,
    next_request: u64,
    in_flight: Option<InFlight>,
}

impl CaptureScheduler {
    /// A zero period is raised to one millisecond.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            generation: 0,
            next_request: 0,
            in_flight: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A recognition request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A tick may sample only with the camera on, the session idle and
    /// nothing in flight.
    pub fn should_sample(&self, camera_active: bool, state: &SessionState) -> bool {
        camera_active && state.allows_capture() && !self.is_busy()
    }

    /// Spawn a recognition request for `frame`.
    ///
    /// The frame is encoded on the blocking pool, then sent to the
    /// recognizer.  The outcome is sent on `completions` tagged with the
    /// returned [`RequestTag`].  Returns `None` while another request is
    /// outstanding.
    pub fn start(
        &mut self,
        recognizer: Arc<dyn IngredientRecognizer>,
        sampler: &FrameSampler,
        frame: RgbImage,
        completions: mpsc::UnboundedSender<InferenceCompletion>,
    ) -> Option<RequestTag> {
        if self.is_busy() {
            log::debug!("session: capture skipped, request already in flight");
            return None;
        }

        self.next_request += 1;
        let tag = RequestTag {
            generation: self.generation,
            id: self.next_request,
        };

        let sampler = sampler.clone();
        let handle = tokio::spawn(async move {
            let encoded = tokio::task::spawn_blocking(move || sampler.encode(&frame)).await;
            let result = match encoded {
                Ok(Ok(image)) => recognizer.identify(&image).await,
                Ok(Err(e)) => Err(InferenceError::Frame(e.to_string())),
                Err(e) => Err(InferenceError::Frame(e.to_string())),
            };
            // The runner may already be gone.
            let _ = completions.send(InferenceCompletion { tag, result });
        });

        log::debug!("session: request {}/{} started", tag.generation, tag.id);
        self.in_flight = Some(InFlight { tag, handle });
        Some(tag)
    }

    /// Retire the outstanding request if `tag` names it.
    ///
    /// Returns `true` only for the current request of the current
    /// generation; anything else is stale and must be ignored.
    pub fn complete(&mut self, tag: RequestTag) -> bool {
        match &self.in_flight {
            Some(current) if current.tag == tag && tag.generation == self.generation => {
                self.in_flight = None;
                true
            }
            _ => {
                log::debug!(
                    "session: dropping stale result {}/{}",
                    tag.generation,
                    tag.id
                );
                false
            }
        }
    }

    /// Abort the outstanding request, if any.
    pub fn cancel(&mut self) {
        if let Some(current) = self.in_flight.take() {
            log::debug!(
                "session: cancelling request {}/{}",
                current.tag.generation,
                current.tag.id
            );
            current.handle.abort();
        }
    }

    /// Invalidate every earlier request and abort the outstanding one.
    pub fn advance_generation(&mut self) {
        self.cancel();
        self.generation += 1;
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::ScriptedRecognizer;

    fn frame() -> RgbImage {
        RgbImage::new(4, 3)
    }

    fn sampler() -> FrameSampler {
        FrameSampler::new(80, 0)
    }

    fn tomato() -> Result<RecognitionResult, InferenceError> {
        RecognitionResult::new("Tomato", 0.92)
    }

    #[test]
    fn zero_period_is_raised() {
        assert_eq!(
            CaptureScheduler::new(Duration::ZERO).period(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn samples_only_when_idle_with_camera_on() {
        let s = CaptureScheduler::new(Duration::from_secs(3));
        assert!(s.should_sample(true, &SessionState::Idle));
        assert!(!s.should_sample(false, &SessionState::Idle));
        assert!(!s.should_sample(true, &SessionState::Scanning));
        assert!(!s.should_sample(true, &SessionState::ManualEntry));
        assert!(!s.should_sample(true, &SessionState::Paused));
        let r = RecognitionResult::new("Tomato", 0.9).unwrap();
        assert!(!s.should_sample(true, &SessionState::AwaitingConfirmation(r)));
    }

    #[tokio::test]
    async fn delivers_tagged_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let rec = Arc::new(ScriptedRecognizer::new(vec![tomato()]));
        let mut s = CaptureScheduler::new(Duration::from_secs(3));

        let tag = s.start(rec.clone(), &sampler(), frame(), tx).unwrap();
        assert!(s.is_busy());
        assert!(!s.should_sample(true, &SessionState::Idle));

        let done = rx.recv().await.unwrap();
        assert_eq!(done.tag, tag);
        assert!(s.complete(done.tag));
        assert!(!s.is_busy());
        assert_eq!(done.result.unwrap().name(), "Tomato");
    }

    #[tokio::test]
    async fn second_start_is_refused_while_busy() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let rec = Arc::new(
            ScriptedRecognizer::new(vec![tomato(), tomato()]).with_delay(Duration::from_secs(10)),
        );
        let mut s = CaptureScheduler::new(Duration::from_secs(3));

        assert!(s.start(rec.clone(), &sampler(), frame(), tx.clone()).is_some());
        assert!(s.start(rec, &sampler(), frame(), tx).is_none());
    }

    #[tokio::test]
    async fn completion_after_generation_bump_is_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let rec = Arc::new(ScriptedRecognizer::new(vec![tomato()]));
        let mut s = CaptureScheduler::new(Duration::from_secs(3));

        let tag = s.start(rec, &sampler(), frame(), tx).unwrap();
        // Let the spawned request finish before invalidating it.
        let done = rx.recv().await.unwrap();
        s.advance_generation();

        assert_eq!(s.generation(), tag.generation + 1);
        assert!(!s.complete(done.tag));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_the_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let rec = Arc::new(
            ScriptedRecognizer::new(vec![tomato()]).with_delay(Duration::from_secs(10)),
        );
        let mut s = CaptureScheduler::new(Duration::from_secs(3));

        s.start(rec, &sampler(), frame(), tx).unwrap();
        s.cancel();
        assert!(!s.is_busy());

        tokio::time::sleep(Duration::from_secs(30)).await;
        // The aborted task dropped its sender without sending.
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn unknown_tag_is_stale() {
        let mut s = CaptureScheduler::new(Duration::from_secs(3));
        assert!(!s.complete(RequestTag {
            generation: 0,
            id: 7
        }));
    }
}
