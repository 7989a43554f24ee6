//! Device-transport collaborator interface
//!
//! Pulling archives off a connected device is the job of an external
//! adapter (a wrapper around the platform debug tool). The analysis core
//! only consumes these four operations; implementations live with the
//! front-ends.

use crate::error::Result;
use std::path::Path;

/// A device visible to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Transport identifier (serial or address)
    pub serial: String,
    /// Human-readable state, e.g. `device`, `unauthorized`
    pub state: String,
}

/// Operations the analysis front-ends need from a device transport.
pub trait DeviceTransport {
    /// Enumerate connected devices.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Whether a device at `address` answers.
    fn is_reachable(&self, address: &str) -> bool;

    /// On-device archive paths (base plus splits/expansions) of an
    /// installed package.
    fn package_archives(&self, serial: &str, package: &str) -> Result<Vec<String>>;

    /// Copy one remote path to a local file.
    fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<()>;
}
