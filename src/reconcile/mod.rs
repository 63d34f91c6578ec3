//! Reconciliation
//!
//! Cross-references desired devices and ring specifications with the actual
//! ring state and the drive catalog to produce a [`Delta`]. Validation
//! failures are collected across the whole model and reported together; a
//! delta is only returned when there are none.

pub mod weight;

pub use weight::*;

use crate::domain::ports::ActualState;
use crate::error::{Error, Result};
use crate::input::{DesiredRings, HostsTable};
use crate::model::{
    Delta, Device, DeviceKey, DriveCatalog, Presence, RingAction, RingKey, weights_equal,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Bytes per unit of weight by default (1 GiB)
pub const DEFAULT_SIZE_TO_WEIGHT: f64 = 1024.0 * 1024.0 * 1024.0;

// =============================================================================
// Options
// =============================================================================

/// Tunables for a reconciliation run
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    /// Bytes per unit of weight
    pub size_to_weight: f64,
    /// Overrides every ring's configured weight step
    pub weight_step: Option<f64>,
    /// Accept devices that are partitions of a drive
    pub allow_partitions: bool,
    /// Treat warnings as errors
    pub stop_on_warnings: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            size_to_weight: DEFAULT_SIZE_TO_WEIGHT,
            weight_step: None,
            allow_partitions: false,
            stop_on_warnings: false,
        }
    }
}

impl ReconcileOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.size_to_weight > 0.0) {
            return Err(Error::Configuration(format!(
                "size_to_weight must be positive, got {}",
                self.size_to_weight
            )));
        }
        if let Some(step) = self.weight_step {
            if !(step > 0.0) {
                return Err(Error::Configuration(format!(
                    "weight_step must be positive, got {}",
                    step
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Result
// =============================================================================

/// A delta plus the non-fatal findings of the run
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub delta: Delta,
    pub warnings: Vec<String>,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Computes deltas between the declared model and the actual rings
pub struct Reconciler<'a> {
    rings: &'a DesiredRings,
    actual: &'a ActualState,
    catalog: &'a DriveCatalog,
    hosts: &'a HostsTable,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        rings: &'a DesiredRings,
        actual: &'a ActualState,
        catalog: &'a DriveCatalog,
        hosts: &'a HostsTable,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            rings,
            actual,
            catalog,
            hosts,
            options,
        }
    }

    /// Produce the delta for a set of desired devices
    pub fn generate_delta(&self, desired: Vec<Device>) -> Result<Reconciliation> {
        self.options.validate()?;

        let mut delta = Delta::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Desired rings; a ring without a builder is new
        for (region_name, region) in self.rings {
            for ring in &region.rings {
                let key = RingKey::new(region_name, &ring.name);
                delta.register_ring(key.clone(), ring.clone());
                if self.actual.ring(&key).is_none() {
                    delta.tag_ring(&key, RingAction::Add)?;
                }
            }
        }

        // Every device needs a ring specification; every ring should have devices
        let mut missing = BTreeSet::new();
        let mut used = HashSet::new();
        for device in &desired {
            let key = RingKey::new(&device.region_name, &device.ring_name);
            if delta.delta_rings.contains_key(&key) {
                used.insert(key);
            } else {
                missing.insert(key);
            }
        }
        for key in &missing {
            errors.push(format!(
                "region {} has no specification for ring {}, which devices are declared for",
                key.region_name, key.ring_name
            ));
        }
        for key in delta.delta_rings.keys().filter(|k| !used.contains(*k)) {
            let message = format!(
                "ring {} in region {} is specified but no devices are declared for it",
                key.ring_name, key.region_name
            );
            warn!("{}", message);
            if self.options.stop_on_warnings {
                errors.push(message.clone());
            }
            warnings.push(message);
        }

        // Actual rings: kept, resized or orphaned
        for (key, actual_ring) in &self.actual.rings {
            if let Some(desired_ring) = delta.delta_rings.get(key) {
                let replicas_differ = (desired_ring.replicas() - actual_ring.replicas()).abs() > 1e-6;
                delta.tag_ring(key, RingAction::Present)?;
                if replicas_differ {
                    info!(
                        "{}: replica count {} -> {}",
                        key,
                        actual_ring.replicas(),
                        delta.delta_rings[key].replicas()
                    );
                    delta.tag_ring(key, RingAction::SetReplicaCount)?;
                }
            } else {
                delta.register_ring(key.clone(), actual_ring.clone());
                delta.tag_ring(key, RingAction::Remove)?;
            }
        }

        // Desired devices
        let actual_index: HashMap<DeviceKey, &Device> =
            self.actual.devices.iter().map(|d| (d.key(), d)).collect();
        let mut desired_keys = HashSet::new();
        let mut devices = Vec::with_capacity(desired.len());

        for mut device in desired {
            let ring_key = RingKey::new(&device.region_name, &device.ring_name);
            if missing.contains(&ring_key) {
                continue;
            }
            let key = device.key();
            let actual = actual_index.get(&key).copied();
            self.resolve_placement(&mut device, &mut errors);
            self.assign_weight(&mut device, actual, &mut errors);
            desired_keys.insert(key);
            devices.push(device);
        }
        devices.sort_by_cached_key(Device::sort_key);
        delta.delta_devices = devices;

        // Devices no longer declared
        for actual in &self.actual.devices {
            if !desired_keys.contains(&actual.key()) {
                let mut removed = actual.clone();
                removed.presence = Presence::Remove;
                debug!("Removing {}", removed);
                delta.delta_devices.push(removed);
            }
        }

        if !errors.is_empty() {
            return Err(Error::Model(errors));
        }

        info!(
            "Delta: {} rings, {} add, {} set-weight, {} remove, {} present",
            delta.delta_rings.len(),
            delta.count(Presence::Add),
            delta.count(Presence::SetWeight),
            delta.count(Presence::Remove),
            delta.count(Presence::Present)
        );
        Ok(Reconciliation { delta, warnings })
    }

    /// Resolve the Swift region and zone of a desired device
    fn resolve_placement(&self, device: &mut Device, errors: &mut Vec<String>) {
        let Some(region) = self.rings.get(&device.region_name) else {
            return;
        };
        let Some(ring) = region.ring(&device.ring_name) else {
            return;
        };
        let rack = device.rack_id.as_deref();

        match region.resolve_region(ring, rack).effective_id() {
            Some(id) => device.region_id = id,
            None => errors.push(format!(
                "ring {} in region {}: rack {} of server {} is not in any swift region",
                ring.name,
                region.region_name,
                rack.unwrap_or("<none>"),
                device.server_name
            )),
        }
        match region.resolve_zone(ring, rack).effective_id() {
            Some(id) => device.zone_id = id,
            None => errors.push(format!(
                "ring {} in region {}: rack {} of server {} is not in any swift zone",
                ring.name,
                region.region_name,
                rack.unwrap_or("<none>"),
                device.server_name
            )),
        }
    }

    /// Weight step applying to a ring: the global override wins
    fn weight_step(&self, device: &Device) -> Option<f64> {
        self.options.weight_step.or_else(|| {
            self.rings
                .get(&device.region_name)
                .and_then(|region| region.ring(&device.ring_name))
                .and_then(|ring| ring.weight_step)
        })
    }

    /// Decide presence and weight of a desired device
    fn assign_weight(&self, device: &mut Device, actual: Option<&Device>, errors: &mut Vec<String>) {
        let step = self.weight_step(device);
        let size = device_size(device, self.catalog, self.hosts).filter(|s| s.size_bytes > 0);

        match actual {
            None => {
                device.presence = Presence::Add;
                let Some(size) = size else {
                    errors.push(format!(
                        "no drive size known for {} ({}) on {} ({}); cannot add it to ring {}",
                        device.drive_name, device.device_path, device.server_name, device.server_ip, device.ring_name
                    ));
                    return;
                };
                if !size.is_full_drive && !self.options.allow_partitions {
                    errors.push(format!(
                        "{} ({}) on {} is a partition; partitions are not allowed in ring {}",
                        device.drive_name, device.device_path, device.server_name, device.ring_name
                    ));
                    return;
                }
                let target = target_weight(size.size_bytes, self.options.size_to_weight);
                device.weight = initial_weight(target, step);
            }
            Some(actual) => {
                device.presence = Presence::Present;
                device.weight = actual.weight;
                device.balance = actual.balance;
                device.device_id = actual.device_id;
                if let Some(size) = size {
                    let target = target_weight(size.size_bytes, self.options.size_to_weight);
                    if !weights_equal(target, actual.weight) {
                        device.presence = Presence::SetWeight;
                        device.weight = converge(actual.weight, target, step);
                        debug!(
                            "{}: weight {:.2} -> {:.2} (target {:.2})",
                            device.key(),
                            actual.weight,
                            device.weight,
                            target
                        );
                    }
                }
            }
        }
    }
}

/// Reconcile in one call
pub fn generate_delta(
    desired: Vec<Device>,
    rings: &DesiredRings,
    actual: &ActualState,
    catalog: &DriveCatalog,
    hosts: &HostsTable,
    options: ReconcileOptions,
) -> Result<Reconciliation> {
    Reconciler::new(rings, actual, catalog, hosts, options).generate_delta(desired)
}
