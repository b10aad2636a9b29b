//! Aggregate metrics shared by every virtual user of a run

use crate::metrics::rate::{RateMetric, RateSample};

use std::sync::atomic::{AtomicU64, Ordering};

/// Rate metrics tracked for every run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    /// Handshake answered with 101 Switching Protocols
    Connected,
    /// `CREATED` acknowledgements
    RoomCreated,
    /// `SELECTED` acknowledgements
    CardSelected,
    /// Room-read shaped responses
    RoomRead,
    /// Protocol, application and transport errors
    Error,
}

impl MetricName {
    pub const ALL: [MetricName; 5] = [
        MetricName::Connected,
        MetricName::RoomCreated,
        MetricName::CardSelected,
        MetricName::RoomRead,
        MetricName::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Connected => "connected_successfully",
            MetricName::RoomCreated => "room_created_rate",
            MetricName::CardSelected => "card_selected_rate",
            MetricName::RoomRead => "room_read_rate",
            MetricName::Error => "error_rate",
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe aggregate metrics for all virtual users
#[derive(Debug, Default)]
pub struct AggregateMetrics {
    connected: RateMetric,
    room_created: RateMetric,
    card_selected: RateMetric,
    room_read: RateMetric,
    errors: RateMetric,
    pub total_messages_sent: AtomicU64,
    pub total_messages_received: AtomicU64,
    pub total_sends_dropped: AtomicU64,
    pub total_sessions_opened: AtomicU64,
    pub total_iterations_completed: AtomicU64,
    pub total_iterations_interrupted: AtomicU64,
}

impl AggregateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn metric(&self, name: MetricName) -> &RateMetric {
        match name {
            MetricName::Connected => &self.connected,
            MetricName::RoomCreated => &self.room_created,
            MetricName::CardSelected => &self.card_selected,
            MetricName::RoomRead => &self.room_read,
            MetricName::Error => &self.errors,
        }
    }

    /// Record one boolean sample for a rate metric
    pub fn record(&self, name: MetricName, outcome: bool) {
        self.metric(name).add(outcome);
    }

    /// Final rate for a metric, `None` when it has no samples
    pub fn rate(&self, name: MetricName) -> Option<f64> {
        self.metric(name).sample().rate()
    }

    pub fn sample(&self, name: MetricName) -> RateSample {
        self.metric(name).sample()
    }

    /// Record an outbound frame handed to the transport
    pub fn record_message_sent(&self) {
        self.total_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound text frame
    pub fn record_message_received(&self) {
        self.total_messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a send skipped because the connection was not open
    pub fn record_send_dropped(&self) {
        self.total_sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection that reached the open state
    pub fn record_session_opened(&self) {
        self.total_sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the end of a script iteration
    pub fn record_iteration(&self, completed: bool) {
        if completed {
            self.total_iterations_completed
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_iterations_interrupted
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn counters(&self) -> Counters {
        Counters {
            messages_sent: self.total_messages_sent.load(Ordering::Relaxed),
            messages_received: self.total_messages_received.load(Ordering::Relaxed),
            sends_dropped: self.total_sends_dropped.load(Ordering::Relaxed),
            sessions_opened: self.total_sessions_opened.load(Ordering::Relaxed),
            iterations_completed: self.total_iterations_completed.load(Ordering::Relaxed),
            iterations_interrupted: self.total_iterations_interrupted.load(Ordering::Relaxed),
        }
    }

    /// Copy every metric and counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rates: MetricName::ALL.map(|name| (name, self.sample(name))),
            counters: self.counters(),
        }
    }
}

/// Plain counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub sends_dropped: u64,
    pub sessions_opened: u64,
    pub iterations_completed: u64,
    pub iterations_interrupted: u64,
}

impl Counters {
    pub fn since(&self, earlier: &Counters) -> Counters {
        Counters {
            messages_sent: self.messages_sent.saturating_sub(earlier.messages_sent),
            messages_received: self
                .messages_received
                .saturating_sub(earlier.messages_received),
            sends_dropped: self.sends_dropped.saturating_sub(earlier.sends_dropped),
            sessions_opened: self.sessions_opened.saturating_sub(earlier.sessions_opened),
            iterations_completed: self
                .iterations_completed
                .saturating_sub(earlier.iterations_completed),
            iterations_interrupted: self
                .iterations_interrupted
                .saturating_sub(earlier.iterations_interrupted),
        }
    }
}

/// Point-in-time copy of the aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub rates: [(MetricName, RateSample); 5],
    pub counters: Counters,
}

impl MetricsSnapshot {
    pub fn sample(&self, name: MetricName) -> RateSample {
        self.rates
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, sample)| *sample)
            .unwrap_or_default()
    }

    pub fn rate(&self, name: MetricName) -> Option<f64> {
        self.sample(name).rate()
    }

    /// Activity between `earlier` and this snapshot
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            rates: self
                .rates
                .map(|(name, sample)| (name, sample.since(&earlier.sample(name)))),
            counters: self.counters.since(&earlier.counters),
        }
    }
}
