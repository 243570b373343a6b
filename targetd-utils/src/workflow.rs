//! Provisioning workflows
//!
//! Each workflow is a short list of `ProvisioningStep`s run in order on one
//! session. A step that the daemon rejects (negative error code) runs its own
//! compensating call, if it has one, and ends the workflow. Transport,
//! protocol and HTTP failures end the workflow at once with no compensation.
//! No step is ever retried.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use targetd_rpc::{RpcError, RpcSession, Transport};

use crate::metrics::{self, WorkflowTimer};
use crate::resources::{
    DestroyLunSpec, ExportSpec, FilesystemSpec, Initiator, NfsExportSpec, VolumeSpec,
};

/// Forward actions a workflow can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    VolCreate,
    ExportCreate,
    ExportDestroy,
    VolDestroy,
    FilesysDestroy,
    NfsExportRemove,
    InitiatorList,
}

impl Step {
    pub fn method(&self) -> &'static str {
        match self {
            Step::VolCreate => "vol_create",
            Step::ExportCreate => "export_create",
            Step::ExportDestroy => "export_destroy",
            Step::VolDestroy => "vol_destroy",
            Step::FilesysDestroy => "filesys_destroy",
            Step::NfsExportRemove => "nfs_export_remove",
            Step::InitiatorList => "initiator_list",
        }
    }

    fn failure_context(&self) -> String {
        match self {
            Step::ExportCreate => "Problem creating export".to_string(),
            Step::VolDestroy => "Problem removing volume".to_string(),
            other => format!("Problem executing {}", other.method()),
        }
    }
}

/// A single RPC invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: &'static str,
    pub params: Option<Map<String, Value>>,
}

impl RpcCall {
    pub fn new(method: &'static str, params: Map<String, Value>) -> Self {
        Self {
            method,
            params: Some(params),
        }
    }
}

/// A forward call plus the call that undoes it if the daemon rejects it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningStep {
    pub step: Step,
    pub params: Option<Map<String, Value>>,
    pub compensation: Option<RpcCall>,
}

impl ProvisioningStep {
    pub fn new(step: Step, params: Option<Map<String, Value>>) -> Self {
        Self {
            step,
            params,
            compensation: None,
        }
    }

    pub fn compensated_by(mut self, call: RpcCall) -> Self {
        self.compensation = Some(call);
        self
    }
}

/// Outcome of a compensating call.
#[derive(Debug)]
pub struct Compensation {
    pub method: &'static str,
    pub result: Result<(), RpcError>,
}

impl Compensation {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// A workflow that stopped at `step`.
#[derive(Error, Debug)]
#[error("{}: {}", .step.failure_context(), .source)]
pub struct WorkflowError {
    pub step: Step,
    pub source: RpcError,
    /// Set when the failed step had a compensating call and it was run.
    pub compensation: Option<Compensation>,
}

/// Run `steps` in order, returning each step's result.
pub async fn run_steps<T: Transport>(
    session: &mut RpcSession<T>,
    steps: Vec<ProvisioningStep>,
) -> Result<Vec<Value>, WorkflowError> {
    let mut results = Vec::with_capacity(steps.len());

    for ProvisioningStep {
        step,
        params,
        compensation,
    } in steps
    {
        match session.call(step.method(), params).await {
            Ok(result) => {
                debug!(method = step.method(), "Step completed");
                results.push(result);
            }
            Err(source) if source.is_application() => {
                warn!(method = step.method(), error = %source, "Step rejected by daemon");
                let compensation = match compensation {
                    Some(call) => Some(compensate(session, call).await),
                    None => None,
                };
                return Err(WorkflowError {
                    step,
                    source,
                    compensation,
                });
            }
            Err(source) => {
                error!(
                    method = step.method(),
                    error = %source,
                    "Step failed, aborting workflow without compensation"
                );
                return Err(WorkflowError {
                    step,
                    source,
                    compensation: None,
                });
            }
        }
    }

    Ok(results)
}

/// Best-effort cleanup after a rejected step.
///
/// Assumes the target method is safe to call on a resource that may never
/// have been created; the daemon's destroy calls are treated as idempotent.
/// The outcome is logged and returned to the caller, never raised.
async fn compensate<T: Transport>(session: &mut RpcSession<T>, call: RpcCall) -> Compensation {
    info!(method = call.method, "Running compensating call");

    let result = session.call(call.method, call.params).await.map(|_| ());
    match &result {
        Ok(()) => info!(method = call.method, "Compensating call succeeded"),
        Err(e) => warn!(method = call.method, error = %e, "Compensating call failed"),
    }
    metrics::record_compensation(call.method, result.is_ok());

    Compensation {
        method: call.method,
        result,
    }
}

/// Create a volume and export it to an initiator.
///
/// If `vol_create` is rejected, `vol_destroy` is attempted. If
/// `export_create` is rejected, only `export_destroy` is attempted; the
/// volume created by the first step is left in place.
pub async fn create_lun<T: Transport>(
    session: &mut RpcSession<T>,
    volume: &VolumeSpec,
    export: &ExportSpec,
) -> Result<(), WorkflowError> {
    let timer = WorkflowTimer::new("create_lun");
    info!(
        pool = %volume.pool,
        name = %volume.name,
        size = volume.size_bytes,
        lun = export.lun,
        initiator = %export.initiator_wwn,
        "Creating LUN"
    );

    let steps = vec![
        ProvisioningStep::new(Step::VolCreate, Some(volume.create_params()))
            .compensated_by(RpcCall::new("vol_destroy", volume.destroy_params())),
        ProvisioningStep::new(Step::ExportCreate, Some(export.create_params()))
            .compensated_by(RpcCall::new("export_destroy", export.cleanup_params())),
    ];

    let result = run_steps(session, steps).await.map(|_| ());
    timer.finish(&result);
    result
}

/// Remove an export and then its volume. Stops at the first failure and
/// never undoes a completed step.
pub async fn destroy_lun<T: Transport>(
    session: &mut RpcSession<T>,
    spec: &DestroyLunSpec,
) -> Result<(), WorkflowError> {
    let timer = WorkflowTimer::new("destroy_lun");
    info!(
        pool = %spec.pool,
        name = %spec.volume_name,
        initiator = %spec.initiator_wwn,
        "Destroying LUN"
    );

    let steps = vec![
        ProvisioningStep::new(Step::ExportDestroy, Some(spec.export_destroy_params())),
        ProvisioningStep::new(Step::VolDestroy, Some(spec.vol_destroy_params())),
    ];

    let result = run_steps(session, steps).await.map(|_| ());
    timer.finish(&result);
    result
}

pub async fn filesys_destroy<T: Transport>(
    session: &mut RpcSession<T>,
    spec: &FilesystemSpec,
) -> Result<(), WorkflowError> {
    let timer = WorkflowTimer::new("filesys_destroy");
    let steps = vec![ProvisioningStep::new(
        Step::FilesysDestroy,
        Some(spec.destroy_params()),
    )];

    let result = run_steps(session, steps).await.map(|_| ());
    timer.finish(&result);
    result
}

pub async fn nfs_export_remove<T: Transport>(
    session: &mut RpcSession<T>,
    spec: &NfsExportSpec,
) -> Result<(), WorkflowError> {
    let timer = WorkflowTimer::new("nfs_export_remove");
    let steps = vec![ProvisioningStep::new(
        Step::NfsExportRemove,
        Some(spec.remove_params()),
    )];

    let result = run_steps(session, steps).await.map(|_| ());
    timer.finish(&result);
    result
}

/// List the initiators known to the daemon. An empty (null) result yields
/// an empty list.
pub async fn initiator_list<T: Transport>(
    session: &mut RpcSession<T>,
) -> Result<Vec<Initiator>, WorkflowError> {
    let timer = WorkflowTimer::new("initiator_list");
    let steps = vec![ProvisioningStep::new(Step::InitiatorList, None)];

    let result = run_steps(session, steps).await.and_then(|mut results| {
        match results.pop().unwrap_or(Value::Null) {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value).map_err(|e| WorkflowError {
                step: Step::InitiatorList,
                source: RpcError::Protocol(format!("unexpected initiator_list result: {}", e)),
                compensation: None,
            }),
        }
    });
    timer.finish(&result);
    result
}
