use thiserror::Error;

/// Classified recognizer failure kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Api,
    SessionTerminated,
    PermissionDenied,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// `SessionTerminated` is expected periodic provider behavior and is
    /// always retried rather than surfaced.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::SessionTerminated | ErrorKind::Timeout
        )
    }
}

/// Phrases providers use to announce that the streaming session must be
/// reopened. Matched case-insensitively.
const SESSION_TERMINATED_PHRASES: &[&str] = &["cannot continue request", "session expired"];

/// Map a recognizer-reported error onto the taxonomy. Rules are checked in
/// order; the first match wins.
pub fn classify_error(status: Option<u16>, message: &str) -> ErrorKind {
    let message = message.to_lowercase();

    if SESSION_TERMINATED_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
    {
        return ErrorKind::SessionTerminated;
    }

    if status == Some(403) || message.contains("permission") {
        return ErrorKind::PermissionDenied;
    }

    if matches!(status, Some(0) | Some(503))
        || message.contains("network")
        || message.contains("connection")
    {
        return ErrorKind::Network;
    }

    if status == Some(408) || message.contains("timeout") {
        return ErrorKind::Timeout;
    }

    if status.is_some_and(|code| (400..500).contains(&code)) {
        return ErrorKind::Api;
    }

    ErrorKind::Unknown
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("recognizer error ({kind}): {message}")]
    Recognizer { kind: ErrorKind, message: String },
    #[error("session is already running")]
    AlreadyRunning,
    #[error("no active session")]
    NotRunning,
}

impl SessionError {
    pub fn recognizer(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Recognizer {
            kind,
            message: message.into(),
        }
    }
}
