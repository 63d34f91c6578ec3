//! Desired Model Reader
//!
//! Walks every declared server's disk model and yields one desired
//! [`Device`] per (unit, ring) pair. Units are numbered per server in
//! declaration order: block devices as `disk0, disk1, ...` and logical
//! volumes as `lvm0, lvm1, ...`.

use super::consumes::{NetworkBindings, SwiftService};
use super::hosts::HostsTable;
use super::model_file::{Consumer, InputModel, ServerRecord};
use super::ring_specs::DesiredRings;
use crate::error::{Error, Result};
use crate::model::{default_port, Backing, Device, GroupType, Presence, UNCONFIGURED_ID};
use tracing::debug;

/// A Swift unit of a server before it is paired with rings
#[derive(Debug, Clone)]
struct Unit {
    drive_name: String,
    device_path: String,
    group_type: GroupType,
    backing: Option<Backing>,
    rings: Vec<String>,
}

/// Produces desired devices from the declared model
pub struct DesiredModelReader<'a> {
    servers: &'a [ServerRecord],
    bindings: &'a NetworkBindings,
    hosts: &'a HostsTable,
    rings: &'a DesiredRings,
}

impl<'a> DesiredModelReader<'a> {
    pub fn new(
        model: &'a InputModel,
        bindings: &'a NetworkBindings,
        hosts: &'a HostsTable,
        rings: &'a DesiredRings,
    ) -> Self {
        Self {
            servers: &model.global.all_servers,
            bindings,
            hosts,
            rings,
        }
    }

    /// Lazily walk every server, yielding its devices
    ///
    /// An item is an error when a host name bound to Swift cannot be
    /// resolved to an address.
    pub fn devices(&self) -> impl Iterator<Item = Result<Device>> + '_ {
        self.servers
            .iter()
            .flat_map(move |server| self.server_devices(server))
    }

    /// Collect every desired device, stopping at the first error
    pub fn read_all(&self) -> Result<Vec<Device>> {
        self.devices().collect()
    }

    fn server_devices(&self, server: &ServerRecord) -> Vec<Result<Device>> {
        let units = match Self::units(server) {
            Ok(units) => units,
            Err(e) => return vec![Err(e)],
        };

        let mut devices = Vec::new();
        for unit in &units {
            for ring_name in &unit.rings {
                match self.pair(server, unit, ring_name) {
                    Ok(Some(device)) => devices.push(Ok(device)),
                    Ok(None) => {}
                    Err(e) => devices.push(Err(e)),
                }
            }
        }
        devices
    }

    /// Number the server's Swift units in declaration order
    fn units(server: &ServerRecord) -> Result<Vec<Unit>> {
        let mut units = Vec::new();

        let mut disk_seq = 0usize;
        for group in &server.disk_model.device_groups {
            let Some(rings) = Consumer::swift_rings(group.consumer.as_ref()) else {
                continue;
            };
            for device in &group.devices {
                units.push(Unit {
                    drive_name: format!("{}{}", GroupType::Disk.prefix(), disk_seq),
                    device_path: device.name.clone(),
                    group_type: GroupType::Disk,
                    backing: None,
                    rings: rings.clone(),
                });
                disk_seq += 1;
            }
        }

        let mut lvm_seq = 0usize;
        for vg in &server.disk_model.volume_groups {
            for lv in &vg.logical_volumes {
                let Some(rings) = Consumer::swift_rings(lv.consumer.as_ref()) else {
                    continue;
                };
                let percentage = parse_percentage(lv.size.as_deref()).ok_or_else(|| {
                    Error::model(format!(
                        "server {}: logical volume {}/{} needs a size such as \"20%\", got {:?}",
                        server.name, vg.name, lv.name, lv.size
                    ))
                })?;
                units.push(Unit {
                    drive_name: format!("{}{}", GroupType::Lvm.prefix(), lvm_seq),
                    device_path: format!("/dev/{}/{}", vg.name, lv.name),
                    group_type: GroupType::Lvm,
                    backing: Some(Backing {
                        percentage,
                        physical_volumes: vg.physical_volumes.clone(),
                    }),
                    rings,
                });
                lvm_seq += 1;
            }
        }

        Ok(units)
    }

    /// Build the device for one (unit, ring) pair
    ///
    /// Returns `Ok(None)` when the ring's service is not wired to this
    /// server: the server legitimately does not run it.
    fn pair(&self, server: &ServerRecord, unit: &Unit, ring_name: &str) -> Result<Option<Device>> {
        let Some(endpoint) = self.bindings.resolve_ring(ring_name, &server.name) else {
            debug!(
                "Skipping {} on {} for ring {}: {} not bound to this host",
                unit.drive_name,
                server.name,
                ring_name,
                SwiftService::for_ring(ring_name)
            );
            return Ok(None);
        };

        let server_ip = self.address_of(&endpoint.network_hostname, server)?;
        let server_port = endpoint
            .port
            .unwrap_or_else(|| self.ring_port(&server.region_name, ring_name));

        let (replication_ip, replication_port) =
            match self.bindings.resolve(SwiftService::Replication, &server.name) {
                Some(replication) => (
                    self.address_of(&replication.network_hostname, server)?,
                    replication.port.unwrap_or(server_port),
                ),
                None => (server_ip.clone(), server_port),
            };

        Ok(Some(Device {
            region_name: server.region_name.clone(),
            ring_name: ring_name.to_string(),
            rack_id: server.rack_id.clone(),
            region_id: UNCONFIGURED_ID,
            zone_id: UNCONFIGURED_ID,
            server_name: server.name.clone(),
            server_ip,
            server_port,
            replication_ip,
            replication_port,
            drive_name: unit.drive_name.clone(),
            device_path: unit.device_path.clone(),
            group_type: unit.group_type,
            presence: Presence::Present,
            weight: 0.0,
            balance: 0.0,
            meta: Device::build_meta(&server.name, &unit.drive_name, &unit.device_path),
            backing: unit.backing.clone(),
            device_id: None,
        }))
    }

    fn address_of(&self, network_hostname: &str, server: &ServerRecord) -> Result<String> {
        self.hosts
            .resolve(network_hostname)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::model(format!(
                    "server {}: host name {} has no address in the hosts file",
                    server.name, network_hostname
                ))
            })
    }

    fn ring_port(&self, region_name: &str, ring_name: &str) -> u16 {
        self.rings
            .get(region_name)
            .and_then(|region| region.ring(ring_name))
            .map(|ring| ring.port)
            .unwrap_or_else(|| default_port(ring_name))
    }
}

/// Parse a logical volume size written as a percentage
fn parse_percentage(size: Option<&str>) -> Option<f64> {
    let value: f64 = size?.trim().strip_suffix('%')?.trim().parse().ok()?;
    (value > 0.0 && value <= 100.0).then_some(value)
}
