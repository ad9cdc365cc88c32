/// Last-known-good marker for clean resumption.
///
/// This is a staleness/recency signal only — committed lines are never
/// rolled back, so there is nothing to restore beyond "how far had we
/// gotten, and how recently."
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionStateManager {
    committed_lines: usize,
    updated_at_ms: Option<u64>,
}

impl SessionStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, committed_lines: usize, now_ms: u64) {
        self.committed_lines = committed_lines;
        self.updated_at_ms = Some(now_ms);
    }

    pub fn committed_lines(&self) -> usize {
        self.committed_lines
    }

    pub fn updated_at_ms(&self) -> Option<u64> {
        self.updated_at_ms
    }

    /// True when nothing has been marked within `ttl_ms`.
    pub fn is_stale(&self, now_ms: u64, ttl_ms: u64) -> bool {
        match self.updated_at_ms {
            Some(updated) => now_ms.saturating_sub(updated) > ttl_ms,
            None => true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
