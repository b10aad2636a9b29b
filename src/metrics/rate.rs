//! Rate metric: counts boolean samples and the positive ones among them

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe rate metric
#[derive(Debug, Default)]
pub struct RateMetric {
    total: AtomicU64,
    positive: AtomicU64,
}

impl RateMetric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample.
    ///
    /// `total` is bumped before `positive` and read after it, so a
    /// concurrent snapshot never sees more positives than samples.
    pub fn add(&self, outcome: bool) {
        self.total.fetch_add(1, Ordering::SeqCst);
        if outcome {
            self.positive.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn sample(&self) -> RateSample {
        let positive = self.positive.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        RateSample { total, positive }
    }
}

/// Point-in-time copy of a rate metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSample {
    pub total: u64,
    pub positive: u64,
}

impl RateSample {
    /// Fraction of positive samples, `None` when nothing was recorded
    pub fn rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.positive as f64 / self.total as f64)
        }
    }

    pub fn negative(&self) -> u64 {
        self.total.saturating_sub(self.positive)
    }

    /// Samples recorded after `earlier` was taken
    pub fn since(&self, earlier: &RateSample) -> RateSample {
        RateSample {
            total: self.total.saturating_sub(earlier.total),
            positive: self.positive.saturating_sub(earlier.positive),
        }
    }
}

impl std::fmt::Display for RateSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rate() {
            Some(rate) => write!(
                f,
                "{:.2}% ✓ {} ✗ {}",
                rate * 100.0,
                self.positive,
                self.negative()
            ),
            None => write!(f, "n/a (no samples)"),
        }
    }
}
