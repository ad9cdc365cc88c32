use livecap_interface::Token;

use crate::id::{IdGenerator, UuidIdGen};
use crate::sentence::ends_with_terminal;
use crate::types::StreamingMessage;

pub const UNKNOWN_SPEAKER: &str = "unknown";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageConfig {
    /// Coalescing window for update notifications. Multiple updates inside
    /// one window collapse into a single emission carrying the latest state;
    /// intermediate states are dropped.
    pub update_throttle_ms: u64,
}

impl Default for MessageConfig {
    fn default() -> Self {
        // One animation frame.
        Self {
            update_throttle_ms: 16,
        }
    }
}

/// Maintains one live message per speaker turn.
///
/// Final translation tokens append to the current message's `final_text`;
/// non-final tokens wholesale-replace its `mutable_text`. A speaker change
/// commits the current message before any token is attributed to the new
/// speaker. When the combined text ends a sentence with nothing mutable
/// pending, the message auto-deactivates; new final text reactivates it so
/// the turn can keep typing past the boundary.
pub struct MessageMachine<G: IdGenerator = UuidIdGen> {
    config: MessageConfig,
    id_gen: G,
    messages: Vec<StreamingMessage>,
    current: Option<usize>,
    pending_update: Option<StreamingMessage>,
    last_emit_ms: Option<u64>,
}

impl MessageMachine<UuidIdGen> {
    pub fn new(config: MessageConfig) -> Self {
        Self::with_id_gen(config, UuidIdGen)
    }
}

impl<G: IdGenerator> MessageMachine<G> {
    pub fn with_id_gen(config: MessageConfig, id_gen: G) -> Self {
        Self {
            config,
            id_gen,
            messages: Vec::new(),
            current: None,
            pending_update: None,
            last_emit_ms: None,
        }
    }

    /// Apply one token batch. Returns the coalesced update snapshot, if one
    /// is due for emission now.
    pub fn process_tokens(&mut self, tokens: &[Token], now_ms: u64) -> Option<StreamingMessage> {
        if tokens.is_empty() {
            return None;
        }

        // Most recent speaker label wins; only original-stream tokens carry
        // attribution.
        let speaker = tokens
            .iter()
            .rev()
            .find(|t| t.is_original() && t.speaker.is_some())
            .and_then(|t| t.speaker.clone());

        match self.current {
            None => {
                let label = speaker.unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());
                self.open(label, now_ms);
            }
            Some(idx) => {
                if let Some(label) = speaker
                    && self.messages[idx].speaker != label
                {
                    self.commit_current(now_ms);
                    self.open(label, now_ms);
                }
            }
        }

        let Some(idx) = self.current else {
            // Unreachable by construction; keep the session alive regardless.
            tracing::warn!("message_machine_missing_current");
            return None;
        };

        let mut appended = String::new();
        let mut mutable = String::new();
        let mut saw_translation = false;

        for token in tokens.iter().filter(|t| t.is_translation()) {
            saw_translation = true;
            if token.is_final {
                appended.push_str(&token.text);
            } else {
                mutable.push_str(&token.text);
            }
        }

        let message = &mut self.messages[idx];
        if !appended.is_empty() {
            message.final_text.push_str(&appended);
            message.is_active = true;
        }
        if saw_translation {
            // The batch's non-final tokens are the complete live state.
            message.mutable_text = mutable;
        }

        if message.mutable_text.is_empty() && ends_with_terminal(&message.final_text) {
            message.is_active = false;
        }

        self.note_update(now_ms)
    }

    /// Freeze the current message. Terminal for its id; the next batch mints
    /// a new message.
    pub fn commit_current(&mut self, now_ms: u64) -> Option<StreamingMessage> {
        let idx = self.current.take()?;
        let message = &mut self.messages[idx];
        message.is_active = false;
        message.mutable_text.clear();

        let snapshot = message.clone();
        self.pending_update = Some(snapshot);
        self.emit_pending(now_ms)
    }

    /// Emit the pending coalesced update once its throttle window elapses.
    pub fn poll(&mut self, now_ms: u64) -> Option<StreamingMessage> {
        if self.pending_update.is_none() {
            return None;
        }
        if self.emit_due(now_ms) {
            self.emit_now(now_ms)
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        match (&self.pending_update, self.last_emit_ms) {
            (Some(_), Some(last)) => Some(last + self.config.update_throttle_ms),
            (Some(_), None) => Some(0),
            _ => None,
        }
    }

    pub fn current_message(&self) -> Option<&StreamingMessage> {
        self.current.map(|idx| &self.messages[idx])
    }

    /// All messages of the session, ordered by timestamp.
    pub fn all_messages(&self) -> &[StreamingMessage] {
        &self.messages
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.current = None;
        self.pending_update = None;
        self.last_emit_ms = None;
    }

    fn open(&mut self, speaker: String, now_ms: u64) {
        self.messages.push(StreamingMessage {
            id: self.id_gen.next_id(),
            speaker,
            final_text: String::new(),
            mutable_text: String::new(),
            is_active: true,
            timestamp_ms: now_ms,
        });
        self.current = Some(self.messages.len() - 1);
    }

    fn note_update(&mut self, now_ms: u64) -> Option<StreamingMessage> {
        let snapshot = self.current.map(|idx| self.messages[idx].clone())?;
        self.pending_update = Some(snapshot);
        self.emit_pending(now_ms)
    }

    fn emit_pending(&mut self, now_ms: u64) -> Option<StreamingMessage> {
        if self.emit_due(now_ms) {
            self.emit_now(now_ms)
        } else {
            None
        }
    }

    fn emit_due(&self, now_ms: u64) -> bool {
        self.last_emit_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.config.update_throttle_ms)
    }

    fn emit_now(&mut self, now_ms: u64) -> Option<StreamingMessage> {
        let update = self.pending_update.take()?;
        self.last_emit_ms = Some(now_ms);
        Some(update)
    }
}
