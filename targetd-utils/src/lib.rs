//! targetd command-line utilities
//!
//! Provisioning workflows over the targetd JSON-RPC API, and the pieces the
//! `create-lun`, `destroy-lun`, `filesys-destroy`, `nfs-export-remove` and
//! `initiator-list` binaries share.
//!
//! This library provides:
//! - Volume/export create and destroy workflows with compensating calls
//! - Parameter bundles for each daemon method
//! - Local initiator name discovery
//! - Shared command-line arguments and logging setup

pub mod cli;
pub mod initiator;
pub mod metrics;
pub mod resources;
pub mod workflow;

pub use resources::{
    DestroyLunSpec, ExportSpec, FilesystemSpec, Initiator, NfsExportSpec, VolumeSpec,
};
pub use workflow::{
    Compensation, ProvisioningStep, RpcCall, Step, WorkflowError, create_lun, destroy_lun,
    filesys_destroy, initiator_list, nfs_export_remove, run_steps,
};
