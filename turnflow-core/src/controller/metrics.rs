//! Lock-free dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use enum_map::{EnumMap, enum_map};

use crate::controller::event_label::EventLabel;

/// Performance metrics with lock‑free counters.
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Turns that passed precondition checks.
    total_turns: AtomicU64,

    /// Turns whose terminal chain ran out of handlers.
    completed_turns: AtomicU64,

    /// Turns a handler stopped by not continuing.
    short_circuited_turns: AtomicU64,

    /// Turns ended by a handler failure.
    failed_turns: AtomicU64,

    /// Calls refused by a precondition check.
    rejected_turns: AtomicU64,

    /// Chain entries per label.
    label_counts: EnumMap<EventLabel, AtomicU64>,

    /// Exponentially weighted moving average of turn latency in
    /// nanoseconds.
    avg_latency_ns: AtomicU64,
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self {
            total_turns: AtomicU64::new(0),
            completed_turns: AtomicU64::new(0),
            short_circuited_turns: AtomicU64::new(0),
            failed_turns: AtomicU64::new(0),
            rejected_turns: AtomicU64::new(0),
            label_counts: enum_map! { _ => AtomicU64::new(0) },
            avg_latency_ns: AtomicU64::new(0),
        }
    }
}

impl DispatchMetrics {
    pub(crate) fn record_chain(&self, label: EventLabel) {
        self.label_counts[label].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected_turns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_turn(&self, completed: bool, elapsed: Duration) {
        self.total_turns.fetch_add(1, Ordering::Relaxed);

        if completed {
            self.completed_turns.fetch_add(1, Ordering::Relaxed);
        } else {
            self.short_circuited_turns.fetch_add(1, Ordering::Relaxed);
        }

        self.update_latency(elapsed);
    }

    pub(crate) fn record_failed(&self, elapsed: Duration) {
        self.total_turns.fetch_add(1, Ordering::Relaxed);
        self.failed_turns.fetch_add(1, Ordering::Relaxed);
        self.update_latency(elapsed);
    }

    fn update_latency(&self, elapsed: Duration) {
        let elapsed_ns: u64 = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        // Always `Some`, so the update cannot fail; it retries until no other
        // turn has written in between.
        let _ = self
            .avg_latency_ns
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current_avg| {
                Some(ewma_step(current_avg, elapsed_ns))
            });
    }

    /// Get a snapshot of the current metrics.
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            total_turns: self.total_turns.load(Ordering::Relaxed),
            completed_turns: self.completed_turns.load(Ordering::Relaxed),
            short_circuited_turns: self.short_circuited_turns.load(Ordering::Relaxed),
            failed_turns: self.failed_turns.load(Ordering::Relaxed),
            rejected_turns: self.rejected_turns.load(Ordering::Relaxed),
            label_counts: EnumMap::from_fn(|label| self.label_counts[label].load(Ordering::Relaxed)),
            avg_latency_ns: self.avg_latency_ns.load(Ordering::Relaxed),
        }
    }
}

/// One EWMA step with weight 0.1 on the new sample. Zero means no samples yet.
fn ewma_step(current_avg: u64, sample_ns: u64) -> u64 {
    if current_avg == 0 {
        sample_ns
    } else {
        current_avg / 10 * 9 + sample_ns / 10
    }
}

/// Snapshot of metrics for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub total_turns: u64,
    pub completed_turns: u64,
    pub short_circuited_turns: u64,
    pub failed_turns: u64,
    pub rejected_turns: u64,
    pub label_counts: EnumMap<EventLabel, u64>,
    pub avg_latency_ns: u64,
}

impl DispatchMetricsSnapshot {
    /// Average latency in microseconds.
    pub fn avg_latency_us(&self) -> f64 {
        self.avg_latency_ns as f64 / 1_000.0
    }

    /// Average latency in milliseconds.
    pub fn avg_latency_ms(&self) -> f64 {
        self.avg_latency_ns as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_outcomes_are_counted_separately() {
        let metrics = DispatchMetrics::default();

        metrics.record_turn(true, Duration::from_micros(10));
        metrics.record_turn(false, Duration::from_micros(10));
        metrics.record_failed(Duration::from_micros(10));
        metrics.record_rejected();
        metrics.record_chain(EventLabel::Turn);
        metrics.record_chain(EventLabel::Turn);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_turns, 3);
        assert_eq!(snap.completed_turns, 1);
        assert_eq!(snap.short_circuited_turns, 1);
        assert_eq!(snap.failed_turns, 1);
        assert_eq!(snap.rejected_turns, 1);
        assert_eq!(snap.label_counts[EventLabel::Turn], 2);
        assert_eq!(snap.label_counts[EventLabel::Dialog], 0);
    }

    #[test]
    fn test_latency_average_seeds_with_first_sample() {
        let metrics = DispatchMetrics::default();
        metrics.record_turn(true, Duration::from_micros(100));

        let snap = metrics.snapshot();
        assert_eq!(snap.avg_latency_ns, 100_000);
        assert!((snap.avg_latency_us() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ewma_step_weights_new_sample() {
        assert_eq!(ewma_step(0, 500), 500);
        assert_eq!(ewma_step(1_000, 2_000), 1_100);
        assert_eq!(ewma_step(50_000, 50_000), 50_000);
    }

    #[test]
    fn test_concurrent_turns_keep_counts_and_average() {
        let metrics = DispatchMetrics::default();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for i in 0..100 {
                        metrics.record_turn(i % 2 == 0, Duration::from_micros(50));
                    }
                });
            }
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.total_turns, 800);
        assert_eq!(snap.completed_turns, 400);
        assert_eq!(snap.short_circuited_turns, 400);
        assert_eq!(snap.avg_latency_ns, 50_000);
    }
}
