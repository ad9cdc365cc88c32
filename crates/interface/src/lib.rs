mod token;

pub use token::{Token, TranslationStatus, partition_by_stream};

/// Lifecycle callbacks pushed by the recognizer client.
///
/// The reconciliation core never talks to the recognizer transport directly;
/// an adapter converts whatever the SDK emits into this enum and feeds it to
/// the session controller in arrival order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum RecognizerEvent {
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "partial")]
    Partial {
        tokens: Vec<Token>,
        /// Recognizer-reported processing time for this batch, if any.
        processing_ms: Option<u64>,
    },
    #[serde(rename = "finished")]
    Finished,
    #[serde(rename = "error")]
    Error {
        /// HTTP-ish status code. `Some(0)` is how transport-level failures
        /// surface from some SDKs; `None` means no code was reported.
        status: Option<u16>,
        message: String,
        code: Option<String>,
    },
}
