//! Parameter bundles for the provisioning workflows.
//!
//! Each bundle knows the exact parameter names the daemon expects for the
//! methods it feeds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// A block volume carved from a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub pool: String,
    pub name: String,
    pub size_bytes: u64,
}

impl VolumeSpec {
    /// `vol_create(pool, name, size)`
    pub fn create_params(&self) -> Map<String, Value> {
        params([
            ("pool", Value::from(self.pool.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("size", Value::from(self.size_bytes)),
        ])
    }

    /// `vol_destroy(pool, name)`
    pub fn destroy_params(&self) -> Map<String, Value> {
        vol_destroy_params(&self.pool, &self.name)
    }
}

fn vol_destroy_params(pool: &str, name: &str) -> Map<String, Value> {
    params([("pool", Value::from(pool)), ("name", Value::from(name))])
}

/// An iSCSI export of a volume to one initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    pub pool: String,
    pub volume_name: String,
    pub lun: u32,
    pub initiator_wwn: String,
}

impl ExportSpec {
    /// `export_create(pool, vol, lun, initiator_wwn)`
    pub fn create_params(&self) -> Map<String, Value> {
        params([
            ("pool", Value::from(self.pool.as_str())),
            ("vol", Value::from(self.volume_name.as_str())),
            ("lun", Value::from(self.lun)),
            ("initiator_wwn", Value::from(self.initiator_wwn.as_str())),
        ])
    }

    /// `export_destroy(pool, name, initiator_wwn)`, the cleanup form used
    /// when `export_create` is rejected.
    pub fn cleanup_params(&self) -> Map<String, Value> {
        params([
            ("pool", Value::from(self.pool.as_str())),
            ("name", Value::from(self.volume_name.as_str())),
            ("initiator_wwn", Value::from(self.initiator_wwn.as_str())),
        ])
    }
}

/// An exported volume to tear down: the export first, then the volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyLunSpec {
    pub pool: String,
    pub volume_name: String,
    pub initiator_wwn: String,
}

impl DestroyLunSpec {
    /// `export_destroy(pool, vol, initiator_wwn)`
    pub fn export_destroy_params(&self) -> Map<String, Value> {
        params([
            ("pool", Value::from(self.pool.as_str())),
            ("vol", Value::from(self.volume_name.as_str())),
            ("initiator_wwn", Value::from(self.initiator_wwn.as_str())),
        ])
    }

    /// `vol_destroy(pool, name)`
    pub fn vol_destroy_params(&self) -> Map<String, Value> {
        vol_destroy_params(&self.pool, &self.volume_name)
    }
}

/// A filesystem volume. `client` is sent as `null` when not given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemSpec {
    pub pool: String,
    pub name: String,
    pub client: Option<String>,
}

impl FilesystemSpec {
    /// `filesys_destroy(pool, name, client)`
    pub fn destroy_params(&self) -> Map<String, Value> {
        params([
            ("pool", Value::from(self.pool.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("client", Value::from(self.client.as_deref())),
        ])
    }
}

/// An NFS export of a filesystem volume to a client (`*` for any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsExportSpec {
    pub client: String,
    pub pool: String,
    pub name: String,
}

impl NfsExportSpec {
    /// `nfs_export_remove(client, pool, name)`
    pub fn remove_params(&self) -> Map<String, Value> {
        params([
            ("client", Value::from(self.client.as_str())),
            ("pool", Value::from(self.pool.as_str())),
            ("name", Value::from(self.name.as_str())),
        ])
    }
}

/// One entry of `initiator_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiator {
    pub init_type: String,
    pub init_id: String,
}
