//! Reports
//!
//! Human-readable views of a delta and of the declared rings: a per-ring
//! summary of what a delta would change, and the `swift.conf` storage
//! policy sections for a region's object rings.

use crate::error::{Error, Result};
use crate::input::DesiredRings;
use crate::model::{Delta, Presence, RingKey, RingPolicy, RingSpec};
use std::fmt::{self, Write};

// =============================================================================
// Delta Summary
// =============================================================================

/// What a delta does to one ring
#[derive(Debug, Clone, PartialEq)]
pub struct RingSummary {
    pub key: RingKey,
    pub actions: String,
    pub replicas: f64,
    pub added: usize,
    pub removed: usize,
    pub reweighted: usize,
    pub unchanged: usize,
    /// Weight of devices being added
    pub weight_added: f64,
    /// Weight of devices being removed
    pub weight_removed: f64,
    /// Total weight once the delta is applied
    pub weight_total: f64,
}

impl RingSummary {
    fn new(delta: &Delta, key: &RingKey, spec: &RingSpec) -> Self {
        let mut summary = Self {
            key: key.clone(),
            actions: delta.actions(key).map(|a| a.to_string()).unwrap_or_else(|| "[]".into()),
            replicas: spec.replicas(),
            added: 0,
            removed: 0,
            reweighted: 0,
            unchanged: 0,
            weight_added: 0.0,
            weight_removed: 0.0,
            weight_total: 0.0,
        };
        for device in delta.ring_devices(key) {
            match device.presence {
                Presence::Add => {
                    summary.added += 1;
                    summary.weight_added += device.weight;
                }
                Presence::Remove => {
                    summary.removed += 1;
                    summary.weight_removed += device.weight;
                    continue;
                }
                Presence::SetWeight => summary.reweighted += 1,
                Presence::Present => summary.unchanged += 1,
            }
            summary.weight_total += device.weight;
        }
        summary
    }
}

impl fmt::Display for RingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} replicas={}", self.key, self.actions, self.replicas)?;
        writeln!(
            f,
            "  devices: {} add, {} set-weight, {} remove, {} present",
            self.added, self.reweighted, self.removed, self.unchanged
        )?;
        write!(
            f,
            "  weight: +{:.2} -{:.2} => {:.2}",
            self.weight_added, self.weight_removed, self.weight_total
        )
    }
}

/// Per-ring summaries in (region, ring) order
pub fn summarize(delta: &Delta) -> Vec<RingSummary> {
    delta
        .delta_rings
        .iter()
        .map(|(key, spec)| RingSummary::new(delta, key, spec))
        .collect()
}

/// Text report of a delta
pub fn render_delta_report(delta: &Delta) -> String {
    let mut out = String::new();
    for summary in summarize(delta) {
        let _ = writeln!(out, "{}", summary);
    }
    let _ = writeln!(
        out,
        "total: {} rings, {} devices ({} add, {} set-weight, {} remove, {} present)",
        delta.delta_rings.len(),
        delta.delta_devices.len(),
        delta.count(Presence::Add),
        delta.count(Presence::SetWeight),
        delta.count(Presence::Remove),
        delta.count(Presence::Present)
    );
    out
}

// =============================================================================
// Storage Policies
// =============================================================================

/// Storage policy index of an object ring (`object-N` => N)
pub fn policy_index(ring_name: &str) -> Option<u32> {
    ring_name.strip_prefix("object-")?.parse().ok()
}

/// `swift.conf` storage policy sections for one region
pub fn render_storage_policies(rings: &DesiredRings, region_name: &str) -> Result<String> {
    let region = rings.get(region_name).ok_or_else(|| {
        Error::Configuration(format!("No ring specifications for region {}", region_name))
    })?;

    let mut policies: Vec<(u32, &RingSpec)> = region
        .rings
        .iter()
        .filter_map(|ring| policy_index(&ring.name).map(|index| (index, ring)))
        .collect();
    policies.sort_by_key(|(index, _)| *index);

    let mut out = String::new();
    for (index, ring) in policies {
        let _ = writeln!(out, "[storage-policy:{}]", index);
        let _ = writeln!(out, "name = {}", ring.display_name);
        if ring.default {
            let _ = writeln!(out, "default = yes");
        }
        match &ring.policy {
            RingPolicy::Replication { .. } => {
                let _ = writeln!(out, "policy_type = replication");
            }
            RingPolicy::ErasureCoding {
                ec_type,
                data_fragments,
                parity_fragments,
                segment_size,
            } => {
                let _ = writeln!(out, "policy_type = erasure_coding");
                let _ = writeln!(out, "ec_type = {}", ec_type);
                let _ = writeln!(out, "ec_num_data_fragments = {}", data_fragments);
                let _ = writeln!(out, "ec_num_parity_fragments = {}", parity_fragments);
                if let Some(size) = segment_size {
                    let _ = writeln!(out, "ec_object_segment_size = {}", size);
                }
            }
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::fixtures::device;
    use crate::model::{RegionRings, RingAction};
    use assert_matches::assert_matches;

    #[test]
    fn test_delta_report() {
        let mut delta = Delta::new();
        let key = RingKey::new("r1", "object-0");
        delta.register_ring(key.clone(), RingSpec::replicated("object-0", 10, 3.0));
        delta.tag_ring(&key, RingAction::Present).unwrap();

        for (ip, presence, weight) in [
            ("10.0.0.1", Presence::Add, 5.0),
            ("10.0.0.2", Presence::Remove, 20.0),
            ("10.0.0.3", Presence::Present, 20.0),
        ] {
            let mut d = device("r1", "object-0", ip, "disk0");
            d.presence = presence;
            d.weight = weight;
            delta.delta_devices.push(d);
        }

        let summaries = summarize(&delta);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].weight_total, 25.0);

        let report = render_delta_report(&delta);
        assert!(report.contains("object-0 (region r1) [present] replicas=3"), "{}", report);
        assert!(report.contains("1 add, 0 set-weight, 1 remove, 1 present"));
        assert!(report.contains("weight: +5.00 -20.00 => 25.00"));
    }

    #[test]
    fn test_storage_policies() {
        let mut account = RingSpec::replicated("account", 10, 3.0);
        account.default = true;
        let mut gold = RingSpec::replicated("object-0", 10, 3.0);
        gold.display_name = "General".into();
        gold.default = true;
        let mut ec = RingSpec::replicated("object-1", 12, 1.0);
        ec.display_name = "EC".into();
        ec.policy = RingPolicy::ErasureCoding {
            ec_type: "jerasure_rs_vand".into(),
            data_fragments: 10,
            parity_fragments: 4,
            segment_size: Some(1_048_576),
        };

        let mut rings = DesiredRings::new();
        rings.insert(
            "r1".into(),
            RegionRings {
                region_name: "r1".into(),
                rings: vec![ec, account, gold],
                ..Default::default()
            },
        );

        let conf = render_storage_policies(&rings, "r1").unwrap();
        assert_eq!(
            conf,
            "[storage-policy:0]\nname = General\ndefault = yes\npolicy_type = replication\n\n\
             [storage-policy:1]\nname = EC\npolicy_type = erasure_coding\nec_type = jerasure_rs_vand\n\
             ec_num_data_fragments = 10\nec_num_parity_fragments = 4\nec_object_segment_size = 1048576\n\n"
        );
        assert_matches!(render_storage_policies(&rings, "r9"), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_policy_index() {
        assert_eq!(policy_index("object-12"), Some(12));
        assert_eq!(policy_index("account"), None);
        assert_eq!(policy_index("object-x"), None);
    }
}
