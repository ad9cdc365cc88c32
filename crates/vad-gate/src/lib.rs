//! Voice-activity gate: per-frame speech/silence classification, silence
//! tracking, and a debounced "finalize now" signal used to force-flush the
//! transcript pipeline ahead of the recognizer's own endpoint detection.

mod gate;
mod pcm;

pub use gate::{GateOutcome, VadConfig, VoiceGate};
pub use pcm::{f32_to_i16_samples, i16_to_f32_samples};

/// Per-frame speech/non-speech decision. The concrete classifier is an
/// external collaborator (webrtc, silero, …); the gate only consumes its
/// boolean.
pub trait SpeechClassifier: Send {
    fn is_speech(&mut self, frame: &[f32]) -> bool;
}

impl<F> SpeechClassifier for F
where
    F: FnMut(&[f32]) -> bool + Send,
{
    fn is_speech(&mut self, frame: &[f32]) -> bool {
        self(frame)
    }
}

/// RMS-energy fallback classifier. Good enough for tests and quiet rooms;
/// real deployments plug in a model-backed classifier.
pub struct EnergyClassifier {
    threshold: f32,
}

impl EnergyClassifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self { threshold: 0.01 }
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn is_speech(&mut self, frame: &[f32]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let energy: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        energy.sqrt() >= self.threshold
    }
}
