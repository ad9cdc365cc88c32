/// Which logical text stream a token belongs to.
///
/// Recognizers that translate emit two interleaved streams: the source-language
/// transcription (`Original`) and the target-language text (`Translation`).
/// Plain transcription-only providers send `None`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TranslationStatus {
    Original,
    Translation,
    #[default]
    None,
}

/// Atomic unit emitted by the recognizer.
///
/// Tokens are only ever appended or superseded in bulk; nothing in this
/// workspace mutates a token after it has been constructed. Spacing is
/// embedded in `text` by the provider, so concatenation without separators
/// reproduces the spoken sentence.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Token {
    pub text: String,
    pub is_final: bool,
    #[serde(default)]
    pub translation_status: TranslationStatus,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub start_ms: Option<i64>,
    #[serde(default)]
    pub end_ms: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        is_final: bool,
        translation_status: TranslationStatus,
    ) -> Self {
        Self {
            text: text.into(),
            is_final,
            translation_status,
            speaker: None,
            language: None,
            source_language: None,
            start_ms: None,
            end_ms: None,
            confidence: None,
        }
    }

    pub fn final_translation(text: impl Into<String>) -> Self {
        Self::new(text, true, TranslationStatus::Translation)
    }

    pub fn partial_translation(text: impl Into<String>) -> Self {
        Self::new(text, false, TranslationStatus::Translation)
    }

    pub fn final_original(text: impl Into<String>) -> Self {
        Self::new(text, true, TranslationStatus::Original)
    }

    pub fn partial_original(text: impl Into<String>) -> Self {
        Self::new(text, false, TranslationStatus::Original)
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_timing(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.start_ms = Some(start_ms);
        self.end_ms = Some(end_ms);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn is_translation(&self) -> bool {
        self.translation_status == TranslationStatus::Translation
    }

    /// `Original` and untagged tokens both belong to the source stream.
    pub fn is_original(&self) -> bool {
        !self.is_translation()
    }
}

/// Split a batch into (translation stream, source stream).
///
/// Reconcilers are per-stream; callers pre-filter with this before applying
/// a batch so the two non-final buffers stay independent.
pub fn partition_by_stream(tokens: &[Token]) -> (Vec<Token>, Vec<Token>) {
    tokens
        .iter()
        .cloned()
        .partition(|token| token.is_translation())
}
