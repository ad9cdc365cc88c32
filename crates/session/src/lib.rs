//! # Session orchestration
//!
//! Wires the reconciliation pipeline to a recognizer transport: one
//! [`SessionController`] per audio session, reacting to [`RecognizerEvent`]s
//! and emitting lifecycle and data events through an [`EventSink`]. The
//! resilience layer (error taxonomy, exponential backoff) keeps a session
//! alive across provider-side terminations without losing committed lines.
//!
//! [`RecognizerEvent`]: livecap_interface::RecognizerEvent

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod retry;
pub mod state;

pub use config::SessionConfig;
pub use controller::{RecognizerClient, SessionController, unix_now_ms};
pub use error::{ErrorKind, SessionError, classify_error};
pub use events::{EventSink, Lane, SessionDataEvent, SessionLifecycleEvent};
pub use retry::{RetryManager, RetryPolicy};
pub use state::SessionStateManager;
