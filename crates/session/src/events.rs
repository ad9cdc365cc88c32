use livecap_transcript::{Sentence, StreamingMessage};

use crate::error::ErrorKind;

/// Which logical text stream a data event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Translation,
    Source,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum SessionLifecycleEvent {
    #[serde(rename = "started")]
    Started { session_id: String },
    /// Emitted before each backoff timer is armed: "reconnecting, attempt N
    /// of max."
    #[serde(rename = "reconnecting")]
    Reconnecting {
        session_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// The backoff delay has elapsed; the host should call
    /// [`crate::SessionController::reconnect`].
    #[serde(rename = "retryReady")]
    RetryReady { session_id: String },
    /// Terminal for this session: a non-retryable error, or retries
    /// exhausted. Committed lines stay valid.
    #[serde(rename = "failed")]
    Failed {
        session_id: String,
        kind: ErrorKind,
        message: String,
    },
    #[serde(rename = "stopped")]
    Stopped { session_id: String },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum SessionDataEvent {
    #[serde(rename = "sentenceCommitted")]
    SentenceCommitted { lane: Lane, sentence: Sentence },
    #[serde(rename = "liveText")]
    LiveText { lane: Lane, text: String },
    #[serde(rename = "messageUpdated")]
    MessageUpdated { message: StreamingMessage },
}

/// Receives everything the session emits. The embedding layer (UI bridge,
/// test harness, …) implements this; emission must be cheap and non-blocking.
pub trait EventSink: Send + Sync {
    fn emit_lifecycle(&self, event: SessionLifecycleEvent);
    fn emit_data(&self, event: SessionDataEvent);
}
