//! Drive Catalog
//!
//! Probed drive sizes per host, loaded from the
//! `<osconfig_dir>/<host>/drive_configuration.yml` files written by the
//! hardware-probing agent. Used only to compute device weights.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// File name of a host's drive configuration
pub const DRIVE_CONFIGURATION_FILE: &str = "drive_configuration.yml";

// =============================================================================
// Catalog Entries
// =============================================================================

/// Size of one drive or partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSize {
    pub size_bytes: u64,
    /// False for partitions of a drive
    pub is_full_drive: bool,
}

/// Drives of one host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostDrives {
    pub hostname: String,
    pub ipaddr: String,
    /// Keyed by device name without the `/dev/` prefix
    pub drives: BTreeMap<String, DriveSize>,
}

impl HostDrives {
    fn matches(&self, names: &[String]) -> bool {
        names.iter().any(|n| *n == self.hostname || *n == self.ipaddr)
    }
}

// =============================================================================
// Probe File Format
// =============================================================================

#[derive(Debug, Deserialize)]
struct DriveConfigurationFile {
    #[serde(default)]
    hlm_drive_configuration: Vec<ProbedHost>,
}

#[derive(Debug, Deserialize)]
struct ProbedHost {
    #[serde(default)]
    ipaddr: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    drives: Vec<ProbedDrive>,
}

#[derive(Debug, Deserialize)]
struct ProbedDrive {
    name: String,
    bytes: u64,
    #[serde(default)]
    partitions: Vec<ProbedPartition>,
}

#[derive(Debug, Deserialize)]
struct ProbedPartition {
    partition: String,
    bytes: u64,
}

/// Strip the `/dev/` prefix from a device name
pub fn short_device_name(name: &str) -> &str {
    name.strip_prefix("/dev/").unwrap_or(name)
}

// =============================================================================
// Drive Catalog
// =============================================================================

/// Probed drive sizes for every host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveCatalog {
    hosts: Vec<HostDrives>,
}

impl DriveCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or extend) a host's drives
    pub fn insert_host(&mut self, host: HostDrives) {
        if let Some(existing) = self
            .hosts
            .iter_mut()
            .find(|h| h.hostname == host.hostname && h.ipaddr == host.ipaddr)
        {
            existing.drives.extend(host.drives);
        } else {
            self.hosts.push(host);
        }
    }

    /// Record one drive for a host
    pub fn insert_drive(&mut self, hostname: &str, ipaddr: &str, name: &str, size: DriveSize) {
        let mut drives = BTreeMap::new();
        drives.insert(short_device_name(name).to_string(), size);
        self.insert_host(HostDrives {
            hostname: hostname.to_string(),
            ipaddr: ipaddr.to_string(),
            drives,
        });
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Look up a device on any host known under one of `names` (hostnames or IPs)
    pub fn lookup(&self, names: &[String], device: &str) -> Option<DriveSize> {
        let device = short_device_name(device);
        self.hosts
            .iter()
            .filter(|h| h.matches(names))
            .find_map(|h| h.drives.get(device).copied())
    }

    /// Parse one drive configuration document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: DriveConfigurationFile = serde_yaml::from_str(content)?;
        let mut catalog = Self::new();
        for probed in file.hlm_drive_configuration {
            let mut drives = BTreeMap::new();
            for drive in probed.drives {
                for partition in &drive.partitions {
                    drives.insert(
                        short_device_name(&partition.partition).to_string(),
                        DriveSize {
                            size_bytes: partition.bytes,
                            is_full_drive: false,
                        },
                    );
                }
                drives.insert(
                    short_device_name(&drive.name).to_string(),
                    DriveSize {
                        size_bytes: drive.bytes,
                        is_full_drive: true,
                    },
                );
            }
            catalog.insert_host(HostDrives {
                hostname: probed.hostname,
                ipaddr: probed.ipaddr,
                drives,
            });
        }
        Ok(catalog)
    }

    /// Load every `<dir>/<host>/drive_configuration.yml`
    ///
    /// A missing directory yields an empty catalog; unreadable or malformed
    /// files are errors.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut catalog = Self::new();
        if !dir.exists() {
            debug!("No drive catalog directory at {:?}", dir);
            return Ok(catalog);
        }

        let pattern = dir.join("*").join(DRIVE_CONFIGURATION_FILE);
        let pattern = pattern.to_string_lossy();
        let mut paths: Vec<_> = glob::glob(&pattern)?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
            let partial = Self::from_yaml_str(&content)?;
            debug!("Loaded drive configuration {:?} ({} hosts)", path, partial.host_count());
            for host in partial.hosts {
                catalog.insert_host(host);
            }
        }

        info!("Drive catalog loaded for {} hosts", catalog.host_count());
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROBE: &str = r#"
hlm_drive_configuration:
  - ipaddr: 192.168.10.5
    hostname: ccp-c1-m1
    drives:
      - name: /dev/sdb
        bytes: 21474836480
        partitions: []
      - name: /dev/sda
        bytes: 107374182400
        partitions:
          - partition: /dev/sda1
            bytes: 524288000
          - partition: /dev/sda_root
            bytes: 53687091200
"#;

    #[test]
    fn test_parse_drives_and_partitions() {
        let catalog = DriveCatalog::from_yaml_str(PROBE).unwrap();
        let names = vec!["ccp-c1-m1".to_string()];

        let sdb = catalog.lookup(&names, "/dev/sdb").unwrap();
        assert_eq!(sdb.size_bytes, 20 * 1024 * 1024 * 1024);
        assert!(sdb.is_full_drive);

        let root = catalog.lookup(&names, "sda_root").unwrap();
        assert!(!root.is_full_drive);
        assert_eq!(root.size_bytes, 53687091200);
    }

    #[test]
    fn test_lookup_by_ip_alias() {
        let catalog = DriveCatalog::from_yaml_str(PROBE).unwrap();
        let by_ip = vec!["10.0.0.9".to_string(), "192.168.10.5".to_string()];
        assert!(catalog.lookup(&by_ip, "/dev/sdb").is_some());

        let unknown = vec!["10.0.0.9".to_string()];
        assert!(catalog.lookup(&unknown, "/dev/sdb").is_none());
    }

    #[test]
    fn test_load_dir() {
        let tmp = TempDir::new().unwrap();
        let host_dir = tmp.path().join("ccp-c1-m1");
        std::fs::create_dir_all(&host_dir).unwrap();
        std::fs::write(host_dir.join(DRIVE_CONFIGURATION_FILE), PROBE).unwrap();

        let catalog = DriveCatalog::load_dir(tmp.path()).unwrap();
        assert_eq!(catalog.host_count(), 1);

        let missing = DriveCatalog::load_dir(&tmp.path().join("nope")).unwrap();
        assert_eq!(missing.host_count(), 0);
    }
}
