//! Delta Store
//!
//! Persists a [`Delta`] as YAML or JSON so it can be reviewed before it is
//! applied. The file layout flattens the keyed maps into lists:
//!
//! ```yaml
//! delta_rings:
//!   - {region_name, ring_name, ring_specification}
//! delta_ring_actions:
//!   - {region_name, ring_name, action}   # one entry per action
//! delta_devices:
//!   - <device>
//! ```
//!
//! Loading re-checks the ring action rules and that every device names a
//! ring present in `delta_rings`.

use crate::error::{Error, Result};
use crate::model::{Delta, Device, RingAction, RingKey, RingSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

// =============================================================================
// Format
// =============================================================================

/// Serialization format of a delta file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeltaFormat {
    #[default]
    Yaml,
    Json,
}

impl DeltaFormat {
    /// `.json` files are JSON; everything else is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DeltaFormat::Json,
            _ => DeltaFormat::Yaml,
        }
    }
}

impl FromStr for DeltaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(DeltaFormat::Yaml),
            "json" => Ok(DeltaFormat::Json),
            other => Err(Error::Configuration(format!(
                "Unknown delta format '{}' (expected yaml or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for DeltaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaFormat::Yaml => write!(f, "yaml"),
            DeltaFormat::Json => write!(f, "json"),
        }
    }
}

// =============================================================================
// File Schema
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct RingEntry {
    region_name: String,
    ring_name: String,
    ring_specification: RingSpec,
}

#[derive(Debug, Serialize, Deserialize)]
struct RingActionEntry {
    region_name: String,
    ring_name: String,
    action: RingAction,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeltaFile {
    #[serde(default)]
    delta_rings: Vec<RingEntry>,
    #[serde(default)]
    delta_ring_actions: Vec<RingActionEntry>,
    #[serde(default)]
    delta_devices: Vec<Device>,
}

impl DeltaFile {
    fn from_delta(delta: &Delta) -> Self {
        let delta_rings = delta
            .delta_rings
            .iter()
            .map(|(key, spec)| RingEntry {
                region_name: key.region_name.clone(),
                ring_name: key.ring_name.clone(),
                ring_specification: spec.clone(),
            })
            .collect();
        let delta_ring_actions = delta
            .delta_ring_actions
            .iter()
            .flat_map(|(key, actions)| {
                actions.iter().map(move |action| RingActionEntry {
                    region_name: key.region_name.clone(),
                    ring_name: key.ring_name.clone(),
                    action,
                })
            })
            .collect();
        Self {
            delta_rings,
            delta_ring_actions,
            delta_devices: delta.delta_devices.clone(),
        }
    }

    fn into_delta(self) -> Result<Delta> {
        let DeltaFile {
            delta_rings,
            mut delta_ring_actions,
            delta_devices,
        } = self;
        // present must be seen before set-replica-count
        delta_ring_actions.sort_by_key(|e| e.action);

        let mut delta = Delta::new();
        for entry in delta_rings {
            let key = RingKey::new(entry.region_name, entry.ring_name);
            if delta.delta_rings.contains_key(&key) {
                return Err(Error::model(format!("ring {} appears twice in delta_rings", key)));
            }
            delta.register_ring(key, entry.ring_specification);
        }
        for entry in delta_ring_actions {
            let key = RingKey::new(entry.region_name, entry.ring_name);
            if !delta.delta_rings.contains_key(&key) {
                return Err(Error::model(format!(
                    "action {} references unknown ring {}",
                    entry.action, key
                )));
            }
            delta.tag_ring(&key, entry.action)?;
        }
        delta.delta_devices = delta_devices;
        delta.validate()?;
        Ok(delta)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Reads and writes delta files
#[derive(Debug, Clone)]
pub struct DeltaStore {
    path: PathBuf,
    format: DeltaFormat,
}

impl DeltaStore {
    /// Store at `path`, with the format inferred from its extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = DeltaFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: DeltaFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DeltaFormat {
        self.format
    }

    pub fn write(&self, delta: &Delta) -> Result<()> {
        let content = to_string(delta, self.format)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        info!(
            "Wrote delta ({} rings, {} devices) to {:?} as {}",
            delta.delta_rings.len(),
            delta.delta_devices.len(),
            self.path,
            self.format
        );
        Ok(())
    }

    pub fn read(&self) -> Result<Delta> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::file_read(&self.path, e))?;
        from_str(&content, self.format)
    }
}

/// Serialize a delta
pub fn to_string(delta: &Delta, format: DeltaFormat) -> Result<String> {
    let file = DeltaFile::from_delta(delta);
    Ok(match format {
        DeltaFormat::Yaml => serde_yaml::to_string(&file)?,
        DeltaFormat::Json => serde_json::to_string_pretty(&file)?,
    })
}

/// Parse and validate a delta
pub fn from_str(content: &str, format: DeltaFormat) -> Result<Delta> {
    let file: DeltaFile = match format {
        DeltaFormat::Yaml => serde_yaml::from_str(content)?,
        DeltaFormat::Json => serde_json::from_str(content)?,
    };
    file.into_delta()
}
