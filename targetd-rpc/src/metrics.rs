//! Metrics for targetd RPC calls
//!
//! Recorded through the `metrics` facade. The command-line utilities do not
//! install a recorder, so these are no-ops unless the library is embedded in
//! a process that does.

use std::time::Instant;

use metrics::{counter, histogram};

/// Metric names
pub mod names {
    /// Counter: Total number of RPC calls by method and outcome
    pub const RPC_CALLS_TOTAL: &str = "targetd_rpc_calls_total";
    /// Histogram: Duration of RPC calls in seconds, including any fallback attempt
    pub const RPC_CALL_DURATION_SECONDS: &str = "targetd_rpc_call_duration_seconds";
    /// Counter: Calls that were resent over TLS after a plaintext transport failure
    pub const RPC_TLS_FALLBACKS_TOTAL: &str = "targetd_rpc_tls_fallbacks_total";
    /// Counter: Error objects carrying a non-negative code
    pub const RPC_ANOMALOUS_ERRORS_TOTAL: &str = "targetd_rpc_anomalous_errors_total";
}

/// Record a completed RPC call with its outcome
pub fn record_call(method: &str, outcome: &str, duration_secs: f64) {
    counter!(names::RPC_CALLS_TOTAL, "method" => method.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    histogram!(names::RPC_CALL_DURATION_SECONDS, "method" => method.to_string())
        .record(duration_secs);
}

/// Record a plaintext-to-TLS fallback
pub fn record_tls_fallback(method: &str) {
    counter!(names::RPC_TLS_FALLBACKS_TOTAL, "method" => method.to_string()).increment(1);
}

/// Record an error object with a non-negative code
pub fn record_anomalous_error(code: i64) {
    counter!(names::RPC_ANOMALOUS_ERRORS_TOTAL, "code" => code.to_string()).increment(1);
}

/// Helper for timing calls
pub struct CallTimer {
    method: String,
    start: Instant,
}

impl CallTimer {
    /// Start timing a call
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            start: Instant::now(),
        }
    }

    /// Complete the call with success
    pub fn success(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_call(&self.method, "success", duration);
    }

    /// Complete the call with failure
    pub fn failure(self, kind: &str) {
        let duration = self.start.elapsed().as_secs_f64();
        record_call(&self.method, kind, duration);
    }
}
