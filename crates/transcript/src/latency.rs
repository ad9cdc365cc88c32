/// Derived capture→display timing statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatencyMetrics {
    pub count: u64,
    pub last_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: u64,
}

/// Records capture→display latency samples. Purely observational; nothing in
/// the pipeline branches on these numbers.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    count: u64,
    last_ms: u64,
    min_ms: u64,
    max_ms: u64,
    total_ms: u64,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ms(&mut self, sample_ms: u64) {
        self.min_ms = if self.count == 0 {
            sample_ms
        } else {
            self.min_ms.min(sample_ms)
        };
        self.max_ms = self.max_ms.max(sample_ms);
        self.last_ms = sample_ms;
        self.total_ms += sample_ms;
        self.count += 1;
    }

    pub fn metrics(&self) -> LatencyMetrics {
        LatencyMetrics {
            count: self.count,
            last_ms: self.last_ms,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            mean_ms: if self.count == 0 {
                0
            } else {
                self.total_ms / self.count
            },
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
