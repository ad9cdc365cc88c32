//! # Token reconciliation core
//!
//! Turns the recognizer's out-of-order, self-correcting token stream into a
//! stable transcript. The invariant the whole crate protects: text that has
//! been committed is never rewritten. Everything else — the non-final buffer,
//! a message's mutable tail — may be replaced wholesale on any update,
//! because the recognizer always retransmits its complete live state.
//!
//! Pipeline: [`TokenReconciler`] splits a batch into committed vs. live text;
//! [`SentenceBuffer`] stitches committed fragments into whole sentences;
//! [`MessageMachine`] maintains one live message per speaker turn. All three
//! are synchronous state machines driven by `now_ms` parameters, so replaying
//! the same inputs at the same clock values reproduces the same commits.

pub mod id;
pub mod latency;
pub mod message;
pub mod reconcile;
pub mod sentence;
pub mod types;

pub use id::{IdGenerator, SequentialIdGen, UuidIdGen};
pub use latency::{LatencyMetrics, LatencyTracker};
pub use message::{MessageConfig, MessageMachine};
pub use reconcile::{Reconciled, TokenReconciler, reconcile};
pub use sentence::{SentenceBuffer, SentenceConfig};
pub use types::{Sentence, StreamingMessage};
