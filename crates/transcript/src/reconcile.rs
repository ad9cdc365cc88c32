use livecap_interface::Token;

/// What one reconciliation pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Concatenated text of the batch's final tokens, in order, no separator
    /// (providers embed spacing in the token text).
    pub committed_text: String,
    /// Concatenated text of the replaced non-final buffer.
    pub live_text: String,
}

/// Split an incoming batch into committed and live text.
///
/// The returned buffer is the batch's non-final tokens verbatim — a wholesale
/// replacement, never a merge. The provider always retransmits its complete
/// current non-final state, so replacement is what prevents duplication.
/// An empty batch is a strict no-op: buffer unchanged, both outputs empty.
/// Otherwise the output depends only on `incoming`.
pub fn reconcile(incoming: &[Token], current: &[Token]) -> (Reconciled, Vec<Token>) {
    if incoming.is_empty() {
        return (Reconciled::default(), current.to_vec());
    }

    let mut committed_text = String::new();
    let mut buffer = Vec::new();

    for token in incoming {
        if token.is_final {
            committed_text.push_str(&token.text);
        } else {
            buffer.push(token.clone());
        }
    }

    let outcome = Reconciled {
        committed_text,
        live_text: concat_text(&buffer),
    };
    (outcome, buffer)
}

fn concat_text(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Owns the non-final buffer for one logical stream.
///
/// Run one instance per stream (translation vs. source) and pre-filter each
/// batch on `translation_status` before calling [`TokenReconciler::apply`].
#[derive(Default)]
pub struct TokenReconciler {
    buffer: Vec<Token>,
}

impl TokenReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, incoming: &[Token]) -> Reconciled {
        let (outcome, buffer) = reconcile(incoming, &self.buffer);
        self.buffer = buffer;
        outcome
    }

    pub fn live_text(&self) -> String {
        concat_text(&self.buffer)
    }

    pub fn buffer(&self) -> &[Token] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
