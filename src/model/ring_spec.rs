//! Ring Specifications
//!
//! Desired (or observed) properties of one ring: partitioning, durability
//! policy and the rack tables used to place devices in Swift regions and
//! zones.

use super::device::{DEFAULT_ID, UNCONFIGURED_ID};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Default minimum hours between partition moves
pub const DEFAULT_MIN_PART_HOURS: u32 = 24;

// =============================================================================
// Ring Key
// =============================================================================

/// A ring is identified by its deployment region and its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RingKey {
    pub region_name: String,
    pub ring_name: String,
}

impl RingKey {
    pub fn new(region_name: impl Into<String>, ring_name: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            ring_name: ring_name.into(),
        }
    }
}

impl fmt::Display for RingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (region {})", self.ring_name, self.region_name)
    }
}

/// Default server port for a ring
pub fn default_port(ring_name: &str) -> u16 {
    match ring_name {
        "account" => 6002,
        "container" => 6001,
        _ => 6000,
    }
}

// =============================================================================
// Rack Tables
// =============================================================================

/// Outcome of resolving a rack to a Swift region or zone id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No table configured at any level
    NotConfigured,
    /// A table is configured but does not list the rack
    Unknown,
    /// The rack maps to this id
    Resolved(i64),
}

impl Resolution {
    /// Raw id with the -1 sentinel for "not configured"
    pub fn raw_id(self) -> Option<i64> {
        match self {
            Resolution::NotConfigured => Some(UNCONFIGURED_ID),
            Resolution::Unknown => None,
            Resolution::Resolved(id) => Some(id),
        }
    }

    /// Effective id, mapping "not configured" to the default id
    pub fn effective_id(self) -> Option<i64> {
        match self {
            Resolution::NotConfigured => Some(DEFAULT_ID),
            Resolution::Unknown => None,
            Resolution::Resolved(id) => Some(id),
        }
    }
}

/// One id and the racks assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackGroup {
    pub id: i64,
    #[serde(deserialize_with = "rack_ids")]
    pub rack_ids: Vec<String>,
}

/// Table mapping rack ids to a Swift region or zone id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RackTable(pub Vec<RackGroup>);

impl RackTable {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a rack against this table alone
    pub fn resolve(&self, rack_id: Option<&str>) -> Resolution {
        if self.is_empty() {
            return Resolution::NotConfigured;
        }
        let Some(rack_id) = rack_id else {
            return Resolution::Unknown;
        };
        self.0
            .iter()
            .find(|group| group.rack_ids.iter().any(|r| r == rack_id))
            .map(|group| Resolution::Resolved(group.id))
            .unwrap_or(Resolution::Unknown)
    }

    /// Resolve with ring-level precedence over the region-level table
    pub fn resolve_layered(ring_level: &RackTable, region_level: &RackTable, rack_id: Option<&str>) -> Resolution {
        if !ring_level.is_empty() {
            ring_level.resolve(rack_id)
        } else {
            region_level.resolve(rack_id)
        }
    }
}

/// Rack ids are opaque keys; the input model writes them as strings or numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RackIdRepr {
    Text(String),
    Integer(i64),
}

impl From<RackIdRepr> for String {
    fn from(repr: RackIdRepr) -> Self {
        match repr {
            RackIdRepr::Text(s) => s,
            RackIdRepr::Integer(i) => i.to_string(),
        }
    }
}

fn rack_ids<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    let raw: Vec<RackIdRepr> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(String::from).collect())
}

/// Deserialize an optional rack id written as a string or a number
pub fn optional_rack_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let raw: Option<RackIdRepr> = Option::deserialize(deserializer)?;
    Ok(raw.map(String::from))
}

// =============================================================================
// Ring Policy
// =============================================================================

/// Durability policy of a ring: exactly one of replication or erasure coding
#[derive(Debug, Clone, PartialEq)]
pub enum RingPolicy {
    Replication {
        replica_count: f64,
    },
    ErasureCoding {
        ec_type: String,
        data_fragments: u32,
        parity_fragments: u32,
        segment_size: Option<u64>,
    },
}

impl RingPolicy {
    /// Replica count the ring builder is created with
    pub fn replicas(&self) -> f64 {
        match self {
            RingPolicy::Replication { replica_count } => *replica_count,
            RingPolicy::ErasureCoding {
                data_fragments,
                parity_fragments,
                ..
            } => f64::from(data_fragments + parity_fragments),
        }
    }

    pub fn is_erasure_coded(&self) -> bool {
        matches!(self, RingPolicy::ErasureCoding { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationPolicyRecord {
    pub replica_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErasureCodingPolicyRecord {
    pub ec_type: String,
    pub ec_num_data_fragments: u32,
    pub ec_num_parity_fragments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_object_segment_size: Option<u64>,
}

// =============================================================================
// Ring Specification
// =============================================================================

/// Serialized form of a ring specification (input model and delta file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSpecRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub partition_power: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_part_hours: Option<u32>,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_policy: Option<ReplicationPolicyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erasure_coding_policy: Option<ErasureCodingPolicyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_step: Option<f64>,
    #[serde(default, skip_serializing_if = "RackTable::is_empty")]
    pub swift_regions: RackTable,
    #[serde(default, skip_serializing_if = "RackTable::is_empty")]
    pub swift_zones: RackTable,
}

/// A validated ring specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RingSpecRecord", into = "RingSpecRecord")]
pub struct RingSpec {
    pub name: String,
    pub display_name: String,
    pub partition_power: u32,
    pub min_part_hours: u32,
    pub default: bool,
    pub network_name: Option<String>,
    pub port: u16,
    pub policy: RingPolicy,
    /// Observed balance; only known for rings read from a builder
    pub balance: Option<f64>,
    pub weight_step: Option<f64>,
    pub swift_regions: RackTable,
    pub swift_zones: RackTable,
}

impl RingSpec {
    /// Build a replicated ring specification with defaults
    pub fn replicated(name: impl Into<String>, partition_power: u32, replica_count: f64) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            port: default_port(&name),
            name,
            partition_power,
            min_part_hours: DEFAULT_MIN_PART_HOURS,
            default: false,
            network_name: None,
            policy: RingPolicy::Replication { replica_count },
            balance: None,
            weight_step: None,
            swift_regions: RackTable::default(),
            swift_zones: RackTable::default(),
        }
    }

    pub fn replicas(&self) -> f64 {
        self.policy.replicas()
    }

    /// Validate a record, enforcing the policy XOR
    pub fn from_record(record: RingSpecRecord) -> Result<Self> {
        let policy = match (record.replication_policy, record.erasure_coding_policy) {
            (Some(replication), None) => {
                if replication.replica_count <= 0.0 {
                    return Err(Error::model(format!(
                        "ring {}: replica_count must be positive",
                        record.name
                    )));
                }
                RingPolicy::Replication {
                    replica_count: replication.replica_count,
                }
            }
            (None, Some(ec)) => {
                if ec.ec_num_data_fragments == 0 {
                    return Err(Error::model(format!(
                        "ring {}: ec_num_data_fragments must be positive",
                        record.name
                    )));
                }
                RingPolicy::ErasureCoding {
                    ec_type: ec.ec_type,
                    data_fragments: ec.ec_num_data_fragments,
                    parity_fragments: ec.ec_num_parity_fragments,
                    segment_size: ec.ec_object_segment_size,
                }
            }
            (Some(_), Some(_)) => {
                return Err(Error::model(format!(
                    "ring {}: replication_policy and erasure_coding_policy are mutually exclusive",
                    record.name
                )))
            }
            (None, None) => {
                return Err(Error::model(format!(
                    "ring {}: one of replication_policy or erasure_coding_policy is required",
                    record.name
                )))
            }
        };

        if let Some(step) = record.weight_step {
            if step.is_nan() || step <= 0.0 {
                return Err(Error::model(format!(
                    "ring {}: weight_step must be positive",
                    record.name
                )));
            }
        }

        Ok(Self {
            display_name: record.display_name.unwrap_or_else(|| record.name.clone()),
            port: record.port.unwrap_or_else(|| default_port(&record.name)),
            min_part_hours: record.min_part_hours.unwrap_or(DEFAULT_MIN_PART_HOURS),
            name: record.name,
            partition_power: record.partition_power,
            default: record.default,
            network_name: record.network_name,
            policy,
            balance: record.balance,
            weight_step: record.weight_step,
            swift_regions: record.swift_regions,
            swift_zones: record.swift_zones,
        })
    }
}

impl TryFrom<RingSpecRecord> for RingSpec {
    type Error = Error;

    fn try_from(record: RingSpecRecord) -> Result<Self> {
        RingSpec::from_record(record)
    }
}

impl From<RingSpec> for RingSpecRecord {
    fn from(spec: RingSpec) -> Self {
        let (replication_policy, erasure_coding_policy) = match spec.policy {
            RingPolicy::Replication { replica_count } => {
                (Some(ReplicationPolicyRecord { replica_count }), None)
            }
            RingPolicy::ErasureCoding {
                ec_type,
                data_fragments,
                parity_fragments,
                segment_size,
            } => (
                None,
                Some(ErasureCodingPolicyRecord {
                    ec_type,
                    ec_num_data_fragments: data_fragments,
                    ec_num_parity_fragments: parity_fragments,
                    ec_object_segment_size: segment_size,
                }),
            ),
        };
        Self {
            name: spec.name,
            display_name: Some(spec.display_name),
            partition_power: spec.partition_power,
            min_part_hours: Some(spec.min_part_hours),
            default: spec.default,
            network_name: spec.network_name,
            port: Some(spec.port),
            replication_policy,
            erasure_coding_policy,
            balance: spec.balance,
            weight_step: spec.weight_step,
            swift_regions: spec.swift_regions,
            swift_zones: spec.swift_zones,
        }
    }
}

// =============================================================================
// Region Rings
// =============================================================================

/// Ring specifications of one deployment region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionRings {
    pub region_name: String,
    /// Rings in declaration order
    pub rings: Vec<RingSpec>,
    pub swift_regions: RackTable,
    pub swift_zones: RackTable,
}

impl RegionRings {
    pub fn ring(&self, ring_name: &str) -> Option<&RingSpec> {
        self.rings.iter().find(|r| r.name == ring_name)
    }

    /// Resolve a rack to a Swift zone for one ring
    pub fn resolve_zone(&self, ring: &RingSpec, rack_id: Option<&str>) -> Resolution {
        RackTable::resolve_layered(&ring.swift_zones, &self.swift_zones, rack_id)
    }

    /// Resolve a rack to a Swift region for one ring
    pub fn resolve_region(&self, ring: &RingSpec, rack_id: Option<&str>) -> Resolution {
        RackTable::resolve_layered(&ring.swift_regions, &self.swift_regions, rack_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn table(groups: &[(i64, &[&str])]) -> RackTable {
        RackTable(
            groups
                .iter()
                .map(|(id, racks)| RackGroup {
                    id: *id,
                    rack_ids: racks.iter().map(|r| r.to_string()).collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_policy_xor() {
        let yaml = r#"
name: object-0
partition_power: 10
replication_policy: {replica_count: 3}
erasure_coding_policy: {ec_type: jerasure_rs_vand, ec_num_data_fragments: 4, ec_num_parity_fragments: 2}
"#;
        assert!(serde_yaml::from_str::<RingSpec>(yaml).is_err());

        let neither = "name: object-0\npartition_power: 10\n";
        assert!(serde_yaml::from_str::<RingSpec>(neither).is_err());

        let record: RingSpecRecord = serde_yaml::from_str(neither).unwrap();
        assert_matches!(RingSpec::from_record(record), Err(Error::Model(_)));
    }

    #[test]
    fn test_weight_step_must_be_positive() {
        for step in ["-5", "0", ".nan"] {
            let yaml = format!(
                "name: object-0\npartition_power: 10\nweight_step: {}\nreplication_policy: {{replica_count: 3}}\n",
                step
            );
            let record: RingSpecRecord = serde_yaml::from_str(&yaml).unwrap();
            assert_matches!(
                RingSpec::from_record(record),
                Err(Error::Model(ref msgs)) if msgs[0].contains("weight_step must be positive"),
                "weight_step {}", step
            );
        }

        let record: RingSpecRecord = serde_yaml::from_str(
            "name: object-0\npartition_power: 10\nweight_step: 2.5\nreplication_policy: {replica_count: 3}\n",
        )
        .unwrap();
        assert_eq!(RingSpec::from_record(record).unwrap().weight_step, Some(2.5));
    }

    #[test]
    fn test_defaults_applied() {
        let spec: RingSpec =
            serde_yaml::from_str("name: account\npartition_power: 12\nreplication_policy: {replica_count: 3}\n")
                .unwrap();
        assert_eq!(spec.port, 6002);
        assert_eq!(spec.display_name, "account");
        assert_eq!(spec.min_part_hours, DEFAULT_MIN_PART_HOURS);
        assert_eq!(spec.replicas(), 3.0);

        assert_eq!(default_port("container"), 6001);
        assert_eq!(default_port("object-3"), 6000);
    }

    #[test]
    fn test_ec_replicas() {
        let yaml = r#"
name: object-1
partition_power: 14
erasure_coding_policy:
  ec_type: jerasure_rs_vand
  ec_num_data_fragments: 10
  ec_num_parity_fragments: 4
  ec_object_segment_size: 1048576
"#;
        let spec: RingSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.policy.is_erasure_coded());
        assert_eq!(spec.replicas(), 14.0);
    }

    #[test]
    fn test_rack_ids_accept_numbers() {
        let yaml = "- id: 2\n  rack_ids: [1, rack-b]\n";
        let table: RackTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.resolve(Some("1")), Resolution::Resolved(2));
        assert_eq!(table.resolve(Some("rack-b")), Resolution::Resolved(2));
    }

    #[test]
    fn test_three_valued_resolution() {
        let empty = RackTable::default();
        assert_eq!(empty.resolve(Some("r1")), Resolution::NotConfigured);
        assert_eq!(Resolution::NotConfigured.raw_id(), Some(-1));
        assert_eq!(Resolution::NotConfigured.effective_id(), Some(1));

        let zones = table(&[(1, &["r1"]), (0, &["r0"])]);
        assert_eq!(zones.resolve(Some("r1")), Resolution::Resolved(1));
        assert_eq!(zones.resolve(Some("r0")), Resolution::Resolved(0));
        assert_eq!(zones.resolve(Some("r9")), Resolution::Unknown);
        assert_eq!(zones.resolve(None), Resolution::Unknown);
        assert_eq!(Resolution::Unknown.effective_id(), None);
    }

    #[test]
    fn test_ring_table_takes_precedence() {
        let mut ring = RingSpec::replicated("object-0", 10, 3.0);
        ring.swift_zones = table(&[(5, &["r1"])]);
        let region = RegionRings {
            region_name: "r".into(),
            rings: vec![ring.clone()],
            swift_regions: RackTable::default(),
            swift_zones: table(&[(2, &["r1", "r2"])]),
        };
        assert_eq!(region.resolve_zone(&ring, Some("r1")), Resolution::Resolved(5));
        assert_eq!(region.resolve_zone(&ring, Some("r2")), Resolution::Unknown);

        let plain = RingSpec::replicated("account", 10, 3.0);
        assert_eq!(region.resolve_zone(&plain, Some("r2")), Resolution::Resolved(2));
        assert_eq!(region.resolve_region(&plain, Some("r2")), Resolution::NotConfigured);
    }
}
