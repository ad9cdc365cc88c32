/// One committed transcript line.
///
/// Created when a sentence boundary is detected or a hold timer / length cap
/// expires. Immutable after creation; only an explicit transcript clear
/// removes it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sentence {
    pub id: String,
    pub text: String,
    pub speaker: Option<String>,
    pub timestamp_ms: u64,
    /// True iff every chunk/token that contributed was already final when
    /// it was buffered.
    pub is_final: bool,
}

/// One active or completed speaker turn in the chat-style view.
///
/// `final_text` is append-only and never rewritten once appended; only
/// `mutable_text` may be replaced wholesale.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamingMessage {
    pub id: String,
    pub speaker: String,
    pub final_text: String,
    pub mutable_text: String,
    pub is_active: bool,
    pub timestamp_ms: u64,
}

impl StreamingMessage {
    /// Everything the message currently says, committed tail included.
    pub fn combined_text(&self) -> String {
        format!("{}{}", self.final_text, self.mutable_text)
    }
}
