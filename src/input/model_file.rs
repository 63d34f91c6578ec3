//! Input model file
//!
//! Serde layout of the desired-state YAML: the declared servers with their
//! disk models and the ring specifications of every deployment region.

use crate::error::{Error, Result};
use crate::model::{optional_rack_id, RackTable, RingSpecRecord};
use serde::Deserialize;
use std::path::Path;

/// Consumer name that marks a disk or volume for Swift
pub const SWIFT_CONSUMER: &str = "swift";

/// Root of the desired-state file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputModel {
    #[serde(default)]
    pub global: GlobalSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalSection {
    #[serde(default)]
    pub all_servers: Vec<ServerRecord>,
    #[serde(default)]
    pub all_ring_specifications: Vec<RegionRingsRecord>,
}

// =============================================================================
// Servers
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServerRecord {
    /// Server host name
    pub name: String,
    /// Deployment region the server's rings belong to
    pub region_name: String,
    #[serde(default, deserialize_with = "optional_rack_id")]
    pub rack_id: Option<String>,
    #[serde(default)]
    pub disk_model: DiskModel,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskModel {
    #[serde(default)]
    pub device_groups: Vec<DeviceGroup>,
    #[serde(default)]
    pub volume_groups: Vec<VolumeGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceGroup {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<BlockDevice>,
    #[serde(default)]
    pub consumer: Option<Consumer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeGroup {
    pub name: String,
    #[serde(default)]
    pub physical_volumes: Vec<String>,
    #[serde(default)]
    pub logical_volumes: Vec<LogicalVolume>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogicalVolume {
    pub name: String,
    /// Share of the volume group, e.g. `"20%"`
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub consumer: Option<Consumer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Consumer {
    pub name: String,
    #[serde(default)]
    pub attrs: ConsumerAttrs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsumerAttrs {
    #[serde(default)]
    pub rings: Vec<RingRef>,
}

/// Ring reference, written either as a bare name or as `{name: ...}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RingRef {
    Name(String),
    Named { name: String },
}

impl RingRef {
    pub fn name(&self) -> &str {
        match self {
            RingRef::Name(name) | RingRef::Named { name } => name,
        }
    }
}

impl Consumer {
    /// Ring names fed by this consumer, if it is Swift
    pub fn swift_rings(consumer: Option<&Consumer>) -> Option<Vec<String>> {
        let consumer = consumer?;
        if consumer.name != SWIFT_CONSUMER {
            return None;
        }
        Some(consumer.attrs.rings.iter().map(|r| r.name().to_string()).collect())
    }
}

// =============================================================================
// Ring Specifications
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegionRingsRecord {
    pub region_name: String,
    #[serde(default)]
    pub rings: Vec<RingSpecRecord>,
    #[serde(default)]
    pub swift_regions: RackTable,
    #[serde(default)]
    pub swift_zones: RackTable,
}

impl InputModel {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_yaml_str(&content)
    }
}
