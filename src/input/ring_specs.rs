//! Ring Specification Reader
//!
//! Turns the declared `all_ring_specifications` into validated
//! [`RegionRings`] keyed by deployment region. Every invalid ring is
//! reported, not just the first.

use super::model_file::{InputModel, RegionRingsRecord};
use crate::error::{Error, Result};
use crate::model::{RegionRings, RingSpec};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Desired rings of every deployment region
pub type DesiredRings = BTreeMap<String, RegionRings>;

/// Reads and validates ring specifications
pub struct RingSpecReader;

impl RingSpecReader {
    /// Validate the ring specifications of an input model
    pub fn read(model: &InputModel) -> Result<DesiredRings> {
        Self::from_records(model.global.all_ring_specifications.clone())
    }

    /// Validate region records, collecting every failure
    pub fn from_records(records: Vec<RegionRingsRecord>) -> Result<DesiredRings> {
        let mut errors = Vec::new();
        let mut regions: DesiredRings = BTreeMap::new();

        for record in records {
            let region = regions
                .entry(record.region_name.clone())
                .or_insert_with(|| RegionRings {
                    region_name: record.region_name.clone(),
                    ..Default::default()
                });
            if !record.swift_regions.is_empty() {
                region.swift_regions = record.swift_regions;
            }
            if !record.swift_zones.is_empty() {
                region.swift_zones = record.swift_zones;
            }

            let mut seen: BTreeSet<String> = region.rings.iter().map(|r| r.name.clone()).collect();
            for ring in record.rings {
                let name = ring.name.clone();
                if !seen.insert(name.clone()) {
                    errors.push(format!(
                        "ring {} is specified more than once in region {}",
                        name, record.region_name
                    ));
                    continue;
                }
                match RingSpec::from_record(ring) {
                    Ok(spec) => {
                        debug!(
                            "Ring {} in region {}: partition power {}, replicas {}",
                            spec.name,
                            record.region_name,
                            spec.partition_power,
                            spec.replicas()
                        );
                        region.rings.push(spec);
                    }
                    Err(e) => errors.extend(
                        e.messages()
                            .into_iter()
                            .map(|m| format!("region {}: {}", record.region_name, m)),
                    ),
                }
            }
        }

        if errors.is_empty() {
            Ok(regions)
        } else {
            Err(Error::Model(errors))
        }
    }
}
