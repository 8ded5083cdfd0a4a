// Performance metrics module
//
// Provides lightweight counters for the reconciliation loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Engine metrics
///
/// Uses atomic operations for thread-safe tracking without locks. The loop task,
/// input events and the frontend drain all record into the same instance, which is
/// logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Reconciliation ticks completed
    pub ticks: AtomicU64,

    /// Output items executed across all ticks
    pub items_executed: AtomicU64,

    /// Items that failed with a dangling reference
    pub item_errors: AtomicU64,

    /// Hardware input events received
    pub input_events: AtomicU64,

    /// Frontend drains performed
    pub frontend_drains: AtomicU64,

    /// Items published to the frontend
    pub items_published: AtomicU64,

    /// Total time spent inside ticks, in microseconds
    pub total_tick_time_us: AtomicU64,

    /// Loop faults
    pub loop_faults: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            items_executed: AtomicU64::new(0),
            item_errors: AtomicU64::new(0),
            input_events: AtomicU64::new(0),
            frontend_drains: AtomicU64::new(0),
            items_published: AtomicU64::new(0),
            total_tick_time_us: AtomicU64::new(0),
            loop_faults: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished tick and how many items it executed
    pub fn record_tick(&self, items: usize, duration: Duration) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.items_executed.fetch_add(items as u64, Ordering::Relaxed);
        self.total_tick_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_item_error(&self) {
        self.item_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_input_event(&self) {
        self.input_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frontend drain and the number of items it published
    pub fn record_drain(&self, items: usize) {
        self.frontend_drains.fetch_add(1, Ordering::Relaxed);
        self.items_published.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn record_loop_fault(&self) {
        self.loop_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average tick duration in milliseconds
    pub fn avg_tick_time_ms(&self) -> f64 {
        let total = self.total_tick_time_us.load(Ordering::Relaxed);
        let count = self.ticks.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64 / 1000.0
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Performance Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Ticks: {} (avg: {:.3}ms), items executed: {}, item errors: {}",
            self.ticks.load(Ordering::Relaxed),
            self.avg_tick_time_ms(),
            self.items_executed.load(Ordering::Relaxed),
            self.item_errors.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Input events: {}, frontend drains: {}, items published: {}, loop faults: {}",
            self.input_events.load(Ordering::Relaxed),
            self.frontend_drains.load(Ordering::Relaxed),
            self.items_published.load(Ordering::Relaxed),
            self.loop_faults.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
