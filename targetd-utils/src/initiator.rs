//! Local iSCSI initiator name discovery.
//!
//! open-iscsi records the host's initiator IQN in
//! `/etc/iscsi/initiatorname.iscsi` as `InitiatorName=<iqn>`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Default location of the open-iscsi initiator name file
pub const INITIATOR_NAME_PATH: &str = "/etc/iscsi/initiatorname.iscsi";

static INITIATOR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^InitiatorName=(.*)$").expect("valid initiator name pattern")
});

#[derive(Error, Debug)]
pub enum InitiatorNameError {
    #[error("{} is missing, is iscsi-initiator-utils installed?", .0.display())]
    Missing(PathBuf),

    #[error("no InitiatorName entry in {}", .0.display())]
    NoEntry(PathBuf),

    #[error("failed to read {}: {}", .path.display(), .source)]
    Io { path: PathBuf, source: io::Error },
}

/// First `InitiatorName=` value in `contents`, if any.
pub fn parse_initiator_name(contents: &str) -> Option<String> {
    INITIATOR_NAME_RE
        .captures(contents)
        .map(|caps| caps[1].trim_end_matches('\r').to_string())
}

/// Read the initiator name from an open-iscsi style file.
pub async fn read_initiator_name(path: impl AsRef<Path>) -> Result<String, InitiatorNameError> {
    let path = path.as_ref();

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InitiatorNameError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(InitiatorNameError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let name = parse_initiator_name(&contents)
        .ok_or_else(|| InitiatorNameError::NoEntry(path.to_path_buf()))?;
    debug!(path = %path.display(), initiator = %name, "Discovered local initiator name");
    Ok(name)
}
