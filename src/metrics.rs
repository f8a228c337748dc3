//! Metrics Collection for AcadPay Observability
//!
//! In-process metrics for the verification pipeline with:
//! - Atomic counters for verification outcomes and fraud rejections
//! - A memory-efficient ring buffer for verification duration percentiles
//! - Prometheus-compatible text format export served at `/metrics`
//!
//! # Example
//!
//! ```rust,no_run
//! use acadpay::metrics::global_metrics;
//! use std::time::Duration;
//!
//! global_metrics().record_verification("verified", Duration::from_millis(150));
//! let output = global_metrics().to_prometheus_format();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

/// Maximum number of duration samples kept in the ring buffer
const MAX_HISTOGRAM_SAMPLES: usize = 1000;

/// Metrics collection for the verification pipeline
///
/// Thread-safe via atomics and RwLocks; shared as a process-wide instance.
#[derive(Debug)]
pub struct Metrics {
    // === Counters ===
    /// Verification requests received
    pub verifications_total: AtomicU64,
    /// Requests that reached RECORDED
    pub verified_total: AtomicU64,
    /// Replayed references blocked
    pub replays_blocked_total: AtomicU64,
    /// Amount/ownership fraud rejections
    pub fraud_rejections_total: AtomicU64,
    /// Gateway unavailability or declines
    pub gateway_failures_total: AtomicU64,
    /// Offline payment claims forwarded to review
    pub manual_submissions_total: AtomicU64,

    // === Histogram (memory-efficient ring buffer) ===
    /// Verification durations for percentile calculation
    verification_durations: RwLock<RingBuffer<Duration>>,

    // === Labeled counters ===
    /// Terminal outcomes broken down by label
    outcomes_by_label: RwLock<HashMap<String, u64>>,
}

/// Memory-efficient ring buffer for histogram samples
#[derive(Debug)]
struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Position of next write (wraps around)
    write_pos: usize,
}

impl<T: Clone + Ord> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.write_pos] = value;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    /// Calculate percentile (0.0 to 1.0)
    fn percentile(&self, p: f64) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort();
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted.get(idx).cloned()
    }
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            verifications_total: AtomicU64::new(0),
            verified_total: AtomicU64::new(0),
            replays_blocked_total: AtomicU64::new(0),
            fraud_rejections_total: AtomicU64::new(0),
            gateway_failures_total: AtomicU64::new(0),
            manual_submissions_total: AtomicU64::new(0),
            verification_durations: RwLock::new(RingBuffer::new(MAX_HISTOGRAM_SAMPLES)),
            outcomes_by_label: RwLock::new(HashMap::new()),
        }
    }

    /// Record one verification attempt with its terminal outcome label
    /// (`verified`, `replay`, `amount_mismatch`, `gateway_unavailable`, ...).
    pub fn record_verification(&self, outcome: &str, duration: Duration) {
        self.verifications_total.fetch_add(1, Ordering::Relaxed);

        match outcome {
            "verified" => {
                self.verified_total.fetch_add(1, Ordering::Relaxed);
            }
            "replay" => {
                self.replays_blocked_total.fetch_add(1, Ordering::Relaxed);
            }
            "amount_mismatch" | "ownership_mismatch" => {
                self.fraud_rejections_total.fetch_add(1, Ordering::Relaxed);
            }
            "gateway_unavailable" | "gateway_declined" => {
                self.gateway_failures_total.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if let Ok(mut durations) = self.verification_durations.write() {
            durations.push(duration);
        }
        if let Ok(mut breakdown) = self.outcomes_by_label.write() {
            *breakdown.entry(outcome.to_string()).or_insert(0) += 1;
        }
    }

    /// Record an offline payment claim forwarded to the review queue
    pub fn record_manual_submission(&self) {
        self.manual_submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        // Counters
        output.push_str(&format!(
            "acadpay_verifications_total {}\n",
            self.verifications_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "acadpay_verified_total {}\n",
            self.verified_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "acadpay_replays_blocked_total {}\n",
            self.replays_blocked_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "acadpay_fraud_rejections_total {}\n",
            self.fraud_rejections_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "acadpay_gateway_failures_total {}\n",
            self.gateway_failures_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "acadpay_manual_submissions_total {}\n",
            self.manual_submissions_total.load(Ordering::Relaxed)
        ));

        // Outcome breakdown
        if let Ok(breakdown) = self.outcomes_by_label.read() {
            let mut labels: Vec<_> = breakdown.iter().collect();
            labels.sort();
            for (label, count) in labels {
                output.push_str(&format!(
                    "acadpay_outcomes_total{{outcome=\"{label}\"}} {count}\n"
                ));
            }
        }

        // Histogram metrics (simple percentile calculation)
        if let Ok(durations) = self.verification_durations.read() {
            if durations.len() > 0 {
                if let Some(p50) = durations.percentile(0.5) {
                    output.push_str(&format!(
                        "acadpay_verification_duration_p50_ms {}\n",
                        p50.as_millis()
                    ));
                }
                if let Some(p95) = durations.percentile(0.95) {
                    output.push_str(&format!(
                        "acadpay_verification_duration_p95_ms {}\n",
                        p95.as_millis()
                    ));
                }
                if let Some(p99) = durations.percentile(0.99) {
                    output.push_str(&format!(
                        "acadpay_verification_duration_p99_ms {}\n",
                        p99.as_millis()
                    ));
                }
            }
        }

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Global metrics instance for the service
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get or initialize the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
