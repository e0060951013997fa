//! Core `IngredientRecognizer` trait and `ApiRecognizer` implementation.
//!
//! `ApiRecognizer` sends a JPEG frame to any OpenAI-compatible vision chat
//! model and expects `{"ingredientName": …, "confidence": …}` back.  It never
//! retries; the capture loop decides when to ask again.

use async_trait::async_trait;
use thiserror::Error;

use crate::camera::ImageBlob;
use crate::chat::{parse_json_reply, ChatClient, ChatEndpoint, ChatError};
use crate::config::RecognitionConfig;
use crate::recognition::prompt::{build_messages, RecognitionReply};

/// Upper bound on reply tokens; the expected JSON is tiny.
const MAX_REPLY_TOKENS: u32 = 128;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

/// Errors that can occur during a recognition call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Transport or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// No answer within the configured timeout.
    #[error("recognition request timed out")]
    Timeout,

    /// The service answered with an error status.
    #[error("recognition service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The answer could not be understood as a recognition result.
    #[error("malformed recognition response: {0}")]
    Malformed(String),

    /// The sampled frame could not be prepared for upload.
    #[error("could not encode camera frame: {0}")]
    Frame(String),
}

impl InferenceError {
    /// `true` for failures of the connection rather than of the service.
    pub fn is_network(&self) -> bool {
        matches!(self, InferenceError::Network(_) | InferenceError::Timeout)
    }
}

impl From<ChatError> for InferenceError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Request(msg) => InferenceError::Network(msg),
            ChatError::Timeout => InferenceError::Timeout,
            ChatError::Status { status, message } => InferenceError::Service { status, message },
            ChatError::Parse(msg) => InferenceError::Malformed(msg),
            ChatError::EmptyResponse => InferenceError::Malformed("empty response".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionResult
// ---------------------------------------------------------------------------

/// A validated recognition answer: non-empty name, confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    name: String,
    confidence: f32,
}

impl RecognitionResult {
    /// Validate and build a result.  The name is trimmed.
    ///
    /// # Errors
    ///
    /// [`InferenceError::Malformed`] for an empty name or a confidence that
    /// is not a finite number in `[0, 1]`.
    pub fn new(name: impl Into<String>, confidence: f32) -> Result<Self, InferenceError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(InferenceError::Malformed("empty ingredient name".into()));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(InferenceError::Malformed(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self { name, confidence })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Turn the model's message content into a [`RecognitionResult`].
pub fn parse_recognition(content: &str) -> Result<RecognitionResult, InferenceError> {
    let reply: RecognitionReply =
        parse_json_reply(content).map_err(|e| InferenceError::Malformed(e.to_string()))?;
    RecognitionResult::new(reply.ingredient_name, reply.confidence)
}

// ---------------------------------------------------------------------------
// IngredientRecognizer trait
// ---------------------------------------------------------------------------

/// Async trait for image → ingredient recognition.
///
/// Implementors must be `Send + Sync` so they can be shared with spawned
/// tasks behind an `Arc<dyn IngredientRecognizer>`.
#[async_trait]
pub trait IngredientRecognizer: Send + Sync {
    async fn identify(&self, image: &ImageBlob) -> Result<RecognitionResult, InferenceError>;
}

// ---------------------------------------------------------------------------
// ApiRecognizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with the frame
/// attached as an `image_url` content part.
pub struct ApiRecognizer {
    chat: ChatClient,
}

impl ApiRecognizer {
    /// Build an `ApiRecognizer` from application config.
    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self {
            chat: ChatClient::new(ChatEndpoint::from(config)),
        }
    }

    pub fn endpoint(&self) -> &ChatEndpoint {
        self.chat.endpoint()
    }
}

#[async_trait]
impl IngredientRecognizer for ApiRecognizer {
    async fn identify(&self, image: &ImageBlob) -> Result<RecognitionResult, InferenceError> {
        log::debug!(
            "recognition: sending {}x{} frame ({} bytes)",
            image.width,
            image.height,
            image.bytes.len()
        );

        let messages = build_messages(&image.to_data_uri());
        let content = self.chat.complete(messages, MAX_REPLY_TOKENS).await?;
        let result = parse_recognition(&content)?;

        log::debug!(
            "recognition: {} ({:.2})",
            result.name(),
            result.confidence()
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// ScriptedRecognizer (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use scripted::ScriptedRecognizer;

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{InferenceError, IngredientRecognizer, RecognitionResult};
    use crate::camera::ImageBlob;

    /// Replays queued answers in order, optionally after a delay, and tracks
    /// how many calls overlap.  Once the script runs out every call fails
    /// with a network error.
    pub struct ScriptedRecognizer {
        script: Mutex<VecDeque<Result<RecognitionResult, InferenceError>>>,
        delay: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ScriptedRecognizer {
        pub fn new(script: Vec<Result<RecognitionResult, InferenceError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn max_concurrent(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    struct ActiveGuard<'a>(&'a AtomicUsize);

    impl Drop for ActiveGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl IngredientRecognizer for ScriptedRecognizer {
        async fn identify(
            &self,
            _image: &ImageBlob,
        ) -> Result<RecognitionResult, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            let _guard = ActiveGuard(&self.active);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(InferenceError::Network("script exhausted".into())))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
