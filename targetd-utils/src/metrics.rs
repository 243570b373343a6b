//! Workflow metrics
//!
//! Complements the per-call metrics in `targetd_rpc::metrics`.

use std::time::Instant;

use metrics::{counter, histogram};

/// Metric names
pub mod names {
    /// Counter: Workflows run, by workflow and outcome
    pub const WORKFLOWS_TOTAL: &str = "targetd_workflows_total";
    /// Histogram: Duration of workflows in seconds
    pub const WORKFLOW_DURATION_SECONDS: &str = "targetd_workflow_duration_seconds";
    /// Counter: Compensating calls, by method and status
    pub const WORKFLOW_COMPENSATIONS_TOTAL: &str = "targetd_workflow_compensations_total";
}

pub fn record_workflow(workflow: &str, status: &str, duration_secs: f64) {
    counter!(names::WORKFLOWS_TOTAL, "workflow" => workflow.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::WORKFLOW_DURATION_SECONDS, "workflow" => workflow.to_string())
        .record(duration_secs);
}

pub fn record_compensation(method: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(names::WORKFLOW_COMPENSATIONS_TOTAL, "method" => method.to_string(), "status" => status)
        .increment(1);
}

pub struct WorkflowTimer {
    workflow: &'static str,
    start: Instant,
}

impl WorkflowTimer {
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            start: Instant::now(),
        }
    }

    pub fn finish<T, E>(self, result: &Result<T, E>) {
        let status = if result.is_ok() { "success" } else { "failure" };
        record_workflow(self.workflow, status, self.start.elapsed().as_secs_f64());
    }
}
