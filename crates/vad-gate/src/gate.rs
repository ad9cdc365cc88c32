use crate::SpeechClassifier;
use crate::pcm::i16_to_f32_samples;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VadConfig {
    pub sample_rate: u32,
    pub frame_ms: u32,
    /// Silence must accumulate this long before a finalize signal fires.
    pub silence_threshold_ms: u64,
    /// Minimum spacing between two finalize signals.
    pub debounce_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_ms: 30,
            silence_threshold_ms: 800,
            debounce_ms: 300,
        }
    }
}

impl VadConfig {
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as usize * self.frame_ms as usize) / 1000
    }
}

/// Per-frame gate output.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GateOutcome {
    pub is_speech: bool,
    pub silence_ms: u64,
    pub should_finalize: bool,
}

/// Tracks silence duration across frames and emits a debounced finalize
/// signal once silence crosses the threshold.
///
/// Without the debounce, every silent frame past the threshold would re-fire
/// the signal; with it, at most one fires per `debounce_ms`.
pub struct VoiceGate<C: SpeechClassifier> {
    config: VadConfig,
    classifier: C,
    silence_started_ms: Option<u64>,
    last_finalize_ms: Option<u64>,
}

impl<C: SpeechClassifier> VoiceGate<C> {
    pub fn new(config: VadConfig, classifier: C) -> Self {
        Self {
            config,
            classifier,
            silence_started_ms: None,
            last_finalize_ms: None,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Classify one fixed-duration PCM frame.
    pub fn push_frame(&mut self, frame: &[f32], now_ms: u64) -> GateOutcome {
        if frame.len() != self.config.samples_per_frame() {
            tracing::warn!(
                got = frame.len(),
                want = self.config.samples_per_frame(),
                "vad_frame_size_mismatch"
            );
        }

        if self.classifier.is_speech(frame) {
            self.silence_started_ms = None;
            return GateOutcome {
                is_speech: true,
                silence_ms: 0,
                should_finalize: false,
            };
        }

        let started = *self.silence_started_ms.get_or_insert(now_ms);
        let silence_ms = now_ms.saturating_sub(started);

        let past_threshold = silence_ms >= self.config.silence_threshold_ms;
        let debounced = self
            .last_finalize_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.config.debounce_ms);

        let should_finalize = past_threshold && debounced;
        if should_finalize {
            self.last_finalize_ms = Some(now_ms);
        }

        GateOutcome {
            is_speech: false,
            silence_ms,
            should_finalize,
        }
    }

    /// Convenience for 16-bit capture pipelines.
    pub fn push_frame_i16(&mut self, frame: &[i16], now_ms: u64) -> GateOutcome {
        self.push_frame(&i16_to_f32_samples(frame), now_ms)
    }

    pub fn reset(&mut self) {
        self.silence_started_ms = None;
        self.last_finalize_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        frames: Vec<bool>,
        cursor: usize,
    }

    impl Scripted {
        fn new(frames: Vec<bool>) -> Self {
            Self { frames, cursor: 0 }
        }
    }

    impl SpeechClassifier for Scripted {
        fn is_speech(&mut self, _frame: &[f32]) -> bool {
            // Hold the last scripted frame once the script is exhausted.
            let value = self.frames[self.cursor.min(self.frames.len() - 1)];
            self.cursor += 1;
            value
        }
    }

    fn gate(frames: Vec<bool>) -> VoiceGate<Scripted> {
        VoiceGate::new(VadConfig::default(), Scripted::new(frames))
    }

    fn frame() -> Vec<f32> {
        vec![0.0; VadConfig::default().samples_per_frame()]
    }

    #[test]
    fn speech_resets_silence_tracking() {
        let mut g = gate(vec![false, false, true, false]);
        let f = frame();

        g.push_frame(&f, 0);
        let silent = g.push_frame(&f, 30);
        assert_eq!(silent.silence_ms, 30);

        let speech = g.push_frame(&f, 60);
        assert!(speech.is_speech);
        assert_eq!(speech.silence_ms, 0);

        // Silence restarts from zero after speech.
        let again = g.push_frame(&f, 90);
        assert_eq!(again.silence_ms, 0);
    }

    #[test]
    fn finalize_fires_once_threshold_is_reached_then_debounces() {
        // One speech frame, then silence forever.
        let mut g = gate(vec![true, false]);
        let f = frame();

        g.push_frame(&f, 0);

        let mut fired_at = None;
        for i in 1..60u64 {
            let now = i * 30;
            let outcome = g.push_frame(&f, now);
            if outcome.should_finalize {
                fired_at = Some((now, outcome.silence_ms));
                break;
            }
        }

        // Silence started at 30ms; 800ms of accumulated silence lands at 840
        // with 30ms frames.
        let (now, silence_ms) = fired_at.expect("threshold crossing must fire");
        assert_eq!(silence_ms, 810);
        assert_eq!(now, 840);

        // Subsequent silent frames within the debounce window stay quiet.
        assert!(!g.push_frame(&f, 870).should_finalize);
        assert!(!g.push_frame(&f, 900).should_finalize);

        // After the debounce delay it may fire again.
        assert!(g.push_frame(&f, 1_140).should_finalize);
    }

    #[test]
    fn silence_from_start_counts_from_first_frame() {
        let mut g = gate(vec![false]);
        let f = frame();

        let first = g.push_frame(&f, 0);
        assert_eq!(first.silence_ms, 0);
        assert!(!first.should_finalize);

        let outcome = g.push_frame(&f, 800);
        assert!(outcome.should_finalize);
    }

    #[test]
    fn reset_clears_silence_and_debounce_state() {
        let mut g = gate(vec![false]);
        let f = frame();

        g.push_frame(&f, 0);
        g.push_frame(&f, 800); // fires
        g.reset();

        let outcome = g.push_frame(&f, 810);
        assert_eq!(outcome.silence_ms, 0);
        assert!(!outcome.should_finalize);
    }
}
