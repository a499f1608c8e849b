//! Allocation and reconciliation metrics using the `metrics` crate.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `exam_registry_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix
//! - Gauges: no suffix
//!
//! No exporter is installed here; the embedding process chooses a recorder.

use std::time::Instant;

use metrics::{counter, gauge, histogram};

// =============================================================================
// Metric Names
// =============================================================================

const ALLOCATIONS_TOTAL: &str = "exam_registry_allocations_total";
const ALLOCATION_LATENCY: &str = "exam_registry_allocation_latency_seconds";
const RECONCILIATIONS_TOTAL: &str = "exam_registry_reconciliations_total";
const MALFORMED_NUMBERS_TOTAL: &str = "exam_registry_malformed_registration_numbers_total";
const COUNTER_VALUE: &str = "exam_registry_counter_value";
const ENROLLMENTS_TOTAL: &str = "exam_registry_enrollments_total";

// =============================================================================
// Allocation
// =============================================================================

/// Records one `next` call.
///
/// `status` is `"success"` or the failing [`ErrorCode`](exam_registry_types::ErrorCode)
/// rendered as a label (`"unknown_section"`, `"capacity_exceeded"`, `"store_unavailable"`).
#[inline]
pub fn record_allocation(section: &str, status: &'static str, latency_secs: f64) {
    counter!(ALLOCATIONS_TOTAL, "section" => section.to_string(), "status" => status)
        .increment(1);
    histogram!(ALLOCATION_LATENCY, "status" => status).record(latency_secs);
}

/// Sets the last observed counter value for a section.
#[inline]
pub fn set_counter_value(section: &str, value: u64) {
    gauge!(COUNTER_VALUE, "section" => section.to_string()).set(value as f64);
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Records a per-section reconciliation. `raised` is whether the counter moved.
#[inline]
pub fn record_reconciliation(section: &str, raised: bool) {
    let outcome = if raised { "raised" } else { "unchanged" };
    counter!(RECONCILIATIONS_TOTAL, "section" => section.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Records registration numbers skipped because they do not parse.
#[inline]
pub fn record_malformed_numbers(section: &str, count: u64) {
    if count > 0 {
        counter!(MALFORMED_NUMBERS_TOTAL, "section" => section.to_string()).increment(count);
    }
}

// =============================================================================
// Enrollment
// =============================================================================

/// Records an enrollment attempt.
#[inline]
pub fn record_enrollment(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(ENROLLMENTS_TOTAL, "status" => status).increment(1);
}

// =============================================================================
// Timer Helper
// =============================================================================

/// Measures elapsed wall time for a latency histogram.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Starts a timer.
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
