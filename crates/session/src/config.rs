use livecap_transcript::{MessageConfig, SentenceConfig};
use livecap_vad_gate::VadConfig;

use crate::retry::RetryPolicy;

/// Full configuration surface for one session.
///
/// Set everything before `start`; the controller treats the config as
/// immutable while a session is active.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    pub vad_enabled: bool,
    pub vad: VadConfig,
    /// Sentence policy for the source-text lane (plain chunks).
    pub source_sentences: SentenceConfig,
    /// Sentence policy for the translation lane (token batches).
    pub translation_sentences: SentenceConfig,
    pub messages: MessageConfig,
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vad_enabled: true,
            vad: VadConfig::default(),
            source_sentences: SentenceConfig::plain(),
            translation_sentences: SentenceConfig::token_aware(),
            messages: MessageConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_vad_enabled(mut self, enabled: bool) -> Self {
        self.vad_enabled = enabled;
        self
    }

    pub fn with_vad(mut self, vad: VadConfig) -> Self {
        self.vad = vad;
        self
    }

    pub fn with_source_sentences(mut self, config: SentenceConfig) -> Self {
        self.source_sentences = config;
        self
    }

    pub fn with_translation_sentences(mut self, config: SentenceConfig) -> Self {
        self.translation_sentences = config;
        self
    }

    pub fn with_update_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.messages.update_throttle_ms = throttle_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
