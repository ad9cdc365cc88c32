use livecap_interface::Token;

use crate::id::{IdGenerator, UuidIdGen};
use crate::types::Sentence;

/// Tuning for one sentence buffer instance.
///
/// `hold_ms` is the soft hold timer, rearmed on every non-committing update:
/// "wait briefly for a continuation." `max_hold_ms` is the hard cap, measured
/// from the oldest unflushed content, so a steady trickle of fragments cannot
/// postpone a commit forever. Both entry shapes (plain chunks and token
/// batches) share this one policy; only the defaults differ.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SentenceConfig {
    pub enabled: bool,
    pub max_chars: usize,
    pub hold_ms: u64,
    pub max_hold_ms: u64,
}

impl SentenceConfig {
    /// Defaults for plain committed-text chunks.
    pub fn plain() -> Self {
        Self {
            enabled: true,
            max_chars: 280,
            hold_ms: 600,
            max_hold_ms: 1500,
        }
    }

    /// Defaults for token batches. Longer cap so short pauses between
    /// translated fragments don't break sentences apart.
    pub fn token_aware() -> Self {
        Self {
            enabled: true,
            max_chars: 500,
            hold_ms: 600,
            max_hold_ms: 2500,
        }
    }
}

impl Default for SentenceConfig {
    fn default() -> Self {
        Self::plain()
    }
}

/// Accumulates committed fragments into semantically complete sentences.
///
/// Commit triggers, in priority order: terminal punctuation, `max_chars`,
/// hold-timer expiry. Timer state is deadline-based — the owner drives it
/// through [`SentenceBuffer::poll`] / [`SentenceBuffer::next_deadline`] — so
/// a replay with identical inputs and clock values commits identically.
pub struct SentenceBuffer<G: IdGenerator = UuidIdGen> {
    config: SentenceConfig,
    id_gen: G,
    buffer: String,
    speaker: Option<String>,
    all_final: bool,
    hold_deadline_ms: Option<u64>,
    buffered_since_ms: Option<u64>,
    last_arm_ms: Option<u64>,
}

impl SentenceBuffer<UuidIdGen> {
    pub fn new(config: SentenceConfig) -> Self {
        Self::with_id_gen(config, UuidIdGen)
    }
}

impl<G: IdGenerator> SentenceBuffer<G> {
    pub fn with_id_gen(config: SentenceConfig, id_gen: G) -> Self {
        Self {
            config,
            id_gen,
            buffer: String::new(),
            speaker: None,
            all_final: true,
            hold_deadline_ms: None,
            buffered_since_ms: None,
            last_arm_ms: None,
        }
    }

    /// Plain-text entry point: one already-committed chunk.
    pub fn add_chunk(&mut self, text: &str, now_ms: u64) -> Vec<Sentence> {
        self.add(text, true, now_ms)
    }

    /// Token-aware entry point. A speaker change force-flushes whatever is
    /// buffered, attributed to the previous speaker, before switching.
    pub fn add_tokens(&mut self, tokens: &[Token], now_ms: u64) -> Vec<Sentence> {
        let mut committed = Vec::new();

        let incoming_speaker = tokens.iter().rev().find_map(|t| t.speaker.clone());
        if let Some(speaker) = &incoming_speaker {
            let changed = self.speaker.as_deref().is_some_and(|cur| cur != speaker);
            if changed && !self.buffer.is_empty() {
                committed.extend(self.commit(now_ms));
            }
            self.speaker = Some(speaker.clone());
        }

        let chunk: String = tokens.iter().map(|t| t.text.as_str()).collect();
        let chunk_final = tokens.iter().all(|t| t.is_final);
        committed.extend(self.add(&chunk, chunk_final, now_ms));
        committed
    }

    fn add(&mut self, text: &str, chunk_final: bool, now_ms: u64) -> Vec<Sentence> {
        let chunk = normalize(text);
        if chunk.is_empty() {
            return vec![];
        }

        if !self.config.enabled {
            return self
                .make_sentence(chunk, chunk_final, now_ms)
                .into_iter()
                .collect();
        }

        let mut committed = Vec::new();

        if self.buffer.is_empty() {
            self.start(chunk, chunk_final, now_ms);
        } else if merges_with(&self.buffer, &chunk) {
            self.buffer = join(&self.buffer, &chunk);
            self.all_final &= chunk_final;
        } else {
            committed.extend(self.commit(now_ms));
            self.start(chunk, chunk_final, now_ms);
        }

        if ends_with_terminal(&self.buffer) || self.buffer.chars().count() >= self.config.max_chars
        {
            committed.extend(self.commit(now_ms));
        } else {
            self.hold_deadline_ms = Some(now_ms + self.config.hold_ms);
            self.last_arm_ms = Some(now_ms);
        }

        committed
    }

    /// Fire any expired hold timer.
    pub fn poll(&mut self, now_ms: u64) -> Option<Sentence> {
        if self.buffer.is_empty() {
            return None;
        }
        let due = self
            .next_deadline()
            .is_some_and(|deadline| now_ms >= deadline);
        if due { self.commit(now_ms) } else { None }
    }

    /// The earliest instant at which [`SentenceBuffer::poll`] would commit.
    pub fn next_deadline(&self) -> Option<u64> {
        if self.buffer.is_empty() {
            return None;
        }
        let hard = self
            .buffered_since_ms
            .map(|since| since + self.config.max_hold_ms);
        match (self.hold_deadline_ms, hard) {
            (Some(soft), Some(hard)) => Some(soft.min(hard)),
            (soft, hard) => soft.or(hard),
        }
    }

    /// Commit the buffer now if `force`, or if the content has been held at
    /// least `max_hold_ms` since the last timer arm.
    pub fn flush(&mut self, force: bool, now_ms: u64) -> Option<Sentence> {
        if self.buffer.is_empty() {
            return None;
        }
        let overdue = self
            .last_arm_ms
            .is_some_and(|armed| now_ms.saturating_sub(armed) >= self.config.max_hold_ms);
        if force || overdue {
            self.commit(now_ms)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn pending_text(&self) -> &str {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.speaker = None;
        self.all_final = true;
        self.hold_deadline_ms = None;
        self.buffered_since_ms = None;
        self.last_arm_ms = None;
    }

    fn start(&mut self, chunk: String, chunk_final: bool, now_ms: u64) {
        self.buffer = chunk;
        self.all_final = chunk_final;
        self.buffered_since_ms = Some(now_ms);
    }

    fn commit(&mut self, now_ms: u64) -> Option<Sentence> {
        let text = std::mem::take(&mut self.buffer);
        let is_final = self.all_final;

        self.all_final = true;
        self.hold_deadline_ms = None;
        self.buffered_since_ms = None;
        self.last_arm_ms = None;

        let text = text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.make_sentence(text, is_final, now_ms)
    }

    fn make_sentence(&mut self, text: String, is_final: bool, now_ms: u64) -> Option<Sentence> {
        Some(Sentence {
            id: self.id_gen.next_id(),
            text,
            speaker: self.speaker.clone(),
            timestamp_ms: now_ms,
            is_final,
        })
    }
}

// ── Text heuristics ──────────────────────────────────────────────────────────
// Deliberately simple and tuned for latency, not linguistic correctness.

fn merges_with(buffer: &str, chunk: &str) -> bool {
    !ends_with_terminal(buffer) || starts_lowercase(chunk) || starts_with_continuation(chunk)
}

pub(crate) fn ends_with_terminal(text: &str) -> bool {
    let mut chars = text.trim_end().chars().rev();
    let mut last = chars.next();
    if matches!(
        last,
        Some('"' | '\'' | '\u{201d}' | '\u{2019}' | ')' | ']' | '\u{bb}')
    ) {
        last = chars.next();
    }
    matches!(last, Some('.' | '!' | '?' | '\u{2026}'))
}

fn starts_lowercase(chunk: &str) -> bool {
    chunk.chars().next().is_some_and(|c| c.is_lowercase())
}

fn starts_with_continuation(chunk: &str) -> bool {
    matches!(
        chunk.chars().next(),
        Some(',' | ';' | ':' | '\u{2013}' | '-')
    )
}

/// Collapse whitespace runs to single spaces and drop spaces that would land
/// in front of punctuation. Providers embed spacing in token text, so this is
/// what makes `"Hallo" + " Welt" + " ."` read `"Hallo Welt."`.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space && !attaches_left(ch) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

fn attaches_left(ch: char) -> bool {
    matches!(ch, '.' | ',' | '!' | '?' | ';' | ':' | '\u{2026}')
}

fn join(buffer: &str, chunk: &str) -> String {
    normalize(&format!("{buffer} {chunk}"))
}
