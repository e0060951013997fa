//! Confidence gate: decides whether a recognition result is worth proposing.

use super::RecognitionResult;

/// Threshold used when the configured value is not a number.
const FALLBACK_THRESHOLD: f32 = 0.7;

/// Outcome of gating one result.  The rejected result is kept so callers can
/// log what was turned down.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Accept(RecognitionResult),
    Reject(RecognitionResult),
}

impl GateOutcome {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateOutcome::Accept(_))
    }
}

/// `Accept` iff `result.confidence() >= threshold`.
///
/// ```
/// use ingredient_scanner::recognition::{gate, GateOutcome, RecognitionResult};
///
/// let tomato = RecognitionResult::new("Tomato", 0.92).unwrap();
/// assert!(gate(tomato, 0.7).is_accept());
///
/// let basil = RecognitionResult::new("Basil", 0.4).unwrap();
/// assert!(matches!(gate(basil, 0.7), GateOutcome::Reject(_)));
/// ```
pub fn gate(result: RecognitionResult, threshold: f32) -> GateOutcome {
    if result.confidence() >= threshold {
        GateOutcome::Accept(result)
    } else {
        GateOutcome::Reject(result)
    }
}

/// [`gate`] bound to a threshold fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    /// The threshold is clamped to `[0, 1]`; NaN falls back to 0.7.
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            log::warn!("recognition: threshold is NaN, using {FALLBACK_THRESHOLD}");
            FALLBACK_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn evaluate(&self, result: RecognitionResult) -> GateOutcome {
        gate(result, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(confidence: f32) -> RecognitionResult {
        RecognitionResult::new("Tomato", confidence).unwrap()
    }

    #[test]
    fn accept_iff_confidence_at_least_threshold() {
        let thresholds = [0.0, 0.25, 0.5, 0.7, 0.99, 1.0];
        let confidences = [0.0, 0.1, 0.25, 0.49, 0.5, 0.69, 0.7, 0.71, 0.99, 1.0];
        for &t in &thresholds {
            for &c in &confidences {
                assert_eq!(
                    gate(result(c), t).is_accept(),
                    c >= t,
                    "confidence {c} threshold {t}"
                );
            }
        }
    }

    #[test]
    fn gate_is_deterministic() {
        let r = result(0.55);
        assert_eq!(gate(r.clone(), 0.5), gate(r, 0.5));
    }

    #[test]
    fn reject_keeps_result() {
        match gate(result(0.4), 0.7) {
            GateOutcome::Reject(r) => assert_eq!(r.confidence(), 0.4),
            other => panic!("expected reject, got {other:?}"),
        }
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(ConfidenceGate::new(1.5).threshold(), 1.0);
        assert_eq!(ConfidenceGate::new(-0.2).threshold(), 0.0);
        assert_eq!(ConfidenceGate::new(f32::NAN).threshold(), FALLBACK_THRESHOLD);
    }

    #[test]
    fn evaluate_matches_free_function() {
        let g = ConfidenceGate::new(0.7);
        assert!(g.evaluate(result(0.92)).is_accept());
        assert!(!g.evaluate(result(0.4)).is_accept());
    }
}
