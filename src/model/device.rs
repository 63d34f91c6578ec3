//! Ring Device
//!
//! A device is one drive (or logical volume) of one server placed in one
//! ring. Desired devices come from the declared disk model; actual devices
//! come from the ring builder listing. Both share this record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Region/zone id meaning "no table configured"
pub const UNCONFIGURED_ID: i64 = -1;

/// Region/zone id used when no table is configured
pub const DEFAULT_ID: i64 = 1;

// =============================================================================
// Enumerations
// =============================================================================

/// How the device is backed on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Whole block device (or a partition of one)
    Disk,
    /// LVM logical volume
    Lvm,
}

impl GroupType {
    /// Drive-name prefix used when numbering units of this type
    pub fn prefix(&self) -> &'static str {
        match self {
            GroupType::Disk => "disk",
            GroupType::Lvm => "lvm",
        }
    }

    /// Infer the group type from a generated drive name
    pub fn from_drive_name(drive_name: &str) -> Self {
        if drive_name.starts_with(GroupType::Lvm.prefix()) {
            GroupType::Lvm
        } else {
            GroupType::Disk
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// What the reconciler decided for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    /// Not yet in the ring; add it
    Add,
    /// In the ring but no longer declared; remove it
    Remove,
    /// In the ring with a different weight; change it
    SetWeight,
    /// In the ring and unchanged
    Present,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Add => write!(f, "add"),
            Presence::Remove => write!(f, "remove"),
            Presence::SetWeight => write!(f, "set-weight"),
            Presence::Present => write!(f, "present"),
        }
    }
}

// =============================================================================
// Backing
// =============================================================================

/// Physical backing of an LVM device, used to derive its size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backing {
    /// Share of the volume group given to this logical volume
    pub percentage: f64,
    /// Physical volumes of the volume group
    pub physical_volumes: Vec<String>,
}

// =============================================================================
// Device Identity
// =============================================================================

/// Identity of a device: two devices are the same iff their keys match
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub region_name: String,
    pub ring_name: String,
    pub server_ip: String,
    pub drive_name: String,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.region_name, self.ring_name, self.server_ip, self.drive_name
        )
    }
}

// =============================================================================
// Device
// =============================================================================

/// A device placed (or to be placed) in a ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Deployment region owning the ring
    pub region_name: String,
    /// Ring name (account, container, object-N)
    pub ring_name: String,
    /// Opaque topology key of the server's rack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_id: Option<String>,
    /// Swift region id (-1 until resolved)
    pub region_id: i64,
    /// Swift zone id (-1 until resolved)
    pub zone_id: i64,
    pub server_name: String,
    pub server_ip: String,
    pub server_port: u16,
    pub replication_ip: String,
    pub replication_port: u16,
    /// Generated unit name (disk0, lvm1, ...)
    pub drive_name: String,
    /// Block device or logical volume path on the server
    pub device_path: String,
    pub group_type: GroupType,
    pub presence: Presence,
    pub weight: f64,
    #[serde(default)]
    pub balance: f64,
    /// Audit string stored with the device in the builder
    #[serde(default)]
    pub meta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing: Option<Backing>,
    /// Builder-assigned id, known only for actual devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u32>,
}

impl Device {
    /// Identity of this device
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            region_name: self.region_name.clone(),
            ring_name: self.ring_name.clone(),
            server_ip: self.server_ip.clone(),
            drive_name: self.drive_name.clone(),
        }
    }

    /// Whether both devices have the same identity
    pub fn same_as(&self, other: &Device) -> bool {
        self.region_name == other.region_name
            && self.ring_name == other.ring_name
            && self.server_ip == other.server_ip
            && self.drive_name == other.drive_name
    }

    /// Key used to order delta devices
    pub fn sort_key(&self) -> String {
        format!(
            "{}{}{}{}",
            self.region_name, self.ring_name, self.server_ip, self.drive_name
        )
    }

    /// The audit string recorded for a device
    pub fn build_meta(server_name: &str, drive_name: &str, device_path: &str) -> String {
        format!("{}:{}:{}", server_name, drive_name, device_path)
    }

    /// Split an audit string back into (server_name, device_path)
    pub fn parse_meta(meta: &str) -> Option<(String, String)> {
        let mut parts = meta.splitn(3, ':');
        let server = parts.next()?;
        let _drive = parts.next()?;
        let path = parts.next()?;
        if server.is_empty() {
            return None;
        }
        Some((server.to_string(), path.to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} {} ({}) weight {:.2} [{}]",
            self.ring_name,
            self.server_ip,
            self.server_port,
            self.drive_name,
            self.device_path,
            self.weight,
            self.presence
        )
    }
}

// =============================================================================
// Weights
// =============================================================================

/// Round a weight to the precision reported by the ring builder
pub fn round_weight(weight: f64) -> f64 {
    (weight * 100.0).round() / 100.0
}

/// Compare two weights at ring builder precision
pub fn weights_equal(a: f64, b: f64) -> bool {
    (round_weight(a) - round_weight(b)).abs() < 0.005
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn device(region: &str, ring: &str, ip: &str, drive: &str) -> Device {
        let server_name = format!("server-{}", ip.replace('.', "-"));
        let device_path = format!("/dev/sd{}", drive.len());
        Device {
            region_name: region.into(),
            ring_name: ring.into(),
            rack_id: None,
            region_id: UNCONFIGURED_ID,
            zone_id: UNCONFIGURED_ID,
            meta: Device::build_meta(&server_name, drive, &device_path),
            server_name,
            server_ip: ip.into(),
            server_port: 6000,
            replication_ip: ip.into(),
            replication_port: 6000,
            drive_name: drive.into(),
            device_path,
            group_type: GroupType::from_drive_name(drive),
            presence: Presence::Present,
            weight: 0.0,
            balance: 0.0,
            backing: None,
            device_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::device;
    use super::*;

    #[test]
    fn test_identity_ignores_weight_and_meta() {
        let a = device("r1", "object-0", "10.0.0.1", "disk0");
        let mut b = a.clone();
        b.weight = 42.0;
        b.balance = 3.5;
        b.meta = "other".into();
        assert!(a.same_as(&b));
        assert_eq!(a.key(), b.key());

        let mut c = a.clone();
        c.drive_name = "disk1".into();
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_meta_round_trip() {
        let meta = Device::build_meta("ccp-c1-m1", "disk0", "/dev/sdb");
        assert_eq!(meta, "ccp-c1-m1:disk0:/dev/sdb");
        assert_eq!(
            Device::parse_meta(&meta),
            Some(("ccp-c1-m1".to_string(), "/dev/sdb".to_string()))
        );
        assert_eq!(Device::parse_meta("garbage"), None);
    }

    #[test]
    fn test_weight_rounding() {
        assert_eq!(round_weight(20.004), 20.0);
        assert_eq!(round_weight(1.239), 1.24);
        assert!(weights_equal(20.0, 20.001));
        assert!(!weights_equal(20.0, 20.02));
    }

    #[test]
    fn test_presence_serialization() {
        let yaml = serde_yaml::to_string(&Presence::SetWeight).unwrap();
        assert_eq!(yaml.trim(), "set-weight");
        assert_eq!(GroupType::from_drive_name("lvm3"), GroupType::Lvm);
        assert_eq!(GroupType::from_drive_name("disk0"), GroupType::Disk);
    }
}
