//! Loopback latency metrics
//!
//! Report-and-reset timing counters, logged on a fixed interval. Diagnostics
//! only; nothing here feeds back into the pipeline.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Running latency statistics for one measurement point
#[derive(Debug, Default)]
pub struct Metric {
    count: u64,
    total: Duration,
    max: Duration,
}

impl Metric {
    /// Fold one measurement into the window
    pub fn record(&mut self, d: Duration) {
        self.count += 1;
        self.total += d;
        if d > self.max {
            self.max = d;
        }
    }

    /// Log the window and reset it. Silent when nothing was recorded.
    pub fn report(&mut self, label: &str) {
        if self.count == 0 {
            return;
        }
        let avg = self.total / self.count as u32;
        tracing::info!(
            "[perf] {label}: avg={:.1}ms max={:.1}ms samples={}",
            avg.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
            self.count
        );
        *self = Self::default();
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Metric shared between a measuring loop and its reporter task
pub type SharedMetric = Arc<Mutex<Metric>>;

/// Create a new shared metric
pub fn shared_metric() -> SharedMetric {
    Arc::new(Mutex::new(Metric::default()))
}

/// Periodically report a metric until the task is dropped or aborted
pub fn spawn_reporter(metric: SharedMetric, label: &'static str, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            metric.lock().report(label);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tracks_count_and_max() {
        let mut metric = Metric::default();
        metric.record(Duration::from_millis(2));
        metric.record(Duration::from_millis(8));
        assert_eq!(metric.count(), 2);
        assert_eq!(metric.max, Duration::from_millis(8));
        assert_eq!(metric.total, Duration::from_millis(10));
    }

    #[test]
    fn report_resets_window() {
        let mut metric = Metric::default();
        metric.record(Duration::from_millis(5));
        metric.report("test");
        assert_eq!(metric.count(), 0);
        assert_eq!(metric.max, Duration::ZERO);
    }

    #[test]
    fn empty_report_is_silent_noop() {
        let mut metric = Metric::default();
        metric.report("test");
        assert_eq!(metric.count(), 0);
    }
}
