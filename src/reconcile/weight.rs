//! Weight computation
//!
//! Turns probed sizes into ring weights and moves existing weights toward
//! their target by at most one step per run.

use crate::input::HostsTable;
use crate::model::{round_weight, Device, DriveCatalog, DriveSize, GroupType};

/// Target weight of a device of `size_bytes`
pub fn target_weight(size_bytes: u64, size_to_weight: f64) -> f64 {
    round_weight(size_bytes as f64 / size_to_weight)
}

/// Weight of a newly added device, capped at one step from zero
pub fn initial_weight(target: f64, step: Option<f64>) -> f64 {
    match step {
        Some(step) => round_weight(target.min(step)),
        None => target,
    }
}

/// Move `current` toward `target` by at most `step`, never overshooting
pub fn converge(current: f64, target: f64, step: Option<f64>) -> f64 {
    let Some(step) = step else {
        return target;
    };
    let next = if target > current {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    };
    round_weight(next)
}

/// Probed size of a device, searched under every alias of its server
///
/// LVM devices take their share of the summed physical volumes and count as
/// full drives only when every physical volume is one.
pub fn device_size(device: &Device, catalog: &DriveCatalog, hosts: &HostsTable) -> Option<DriveSize> {
    let aliases = hosts.aliases(&device.server_name, &device.server_ip);

    match (device.group_type, device.backing.as_ref()) {
        (GroupType::Lvm, Some(backing)) => {
            if backing.physical_volumes.is_empty() {
                return None;
            }
            let mut total = 0u64;
            let mut full = true;
            for pv in &backing.physical_volumes {
                let size = catalog.lookup(&aliases, pv)?;
                total = total.saturating_add(size.size_bytes);
                full &= size.is_full_drive;
            }
            Some(DriveSize {
                size_bytes: (total as f64 * backing.percentage / 100.0) as u64,
                is_full_drive: full,
            })
        }
        _ => catalog.lookup(&aliases, &device.device_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::fixtures::device;
    use crate::model::Backing;

    const GIB: u64 = 1 << 30;

    #[test]
    fn test_target_weight() {
        assert_eq!(target_weight(20 * GIB, GIB as f64), 20.0);
        assert_eq!(target_weight(GIB + GIB / 3, GIB as f64), 1.33);
    }

    #[test]
    fn test_initial_weight_capped() {
        assert_eq!(initial_weight(20.0, Some(5.0)), 5.0);
        assert_eq!(initial_weight(3.0, Some(5.0)), 3.0);
        assert_eq!(initial_weight(20.0, None), 20.0);
    }

    #[test]
    fn test_converge_bounded_by_step() {
        let step = 4.0;
        for (current, target) in [(10.0, 30.0), (30.0, 10.0), (10.0, 12.5), (12.5, 10.0), (7.0, 7.0)] {
            let next = converge(current, target, Some(step));
            assert!((next - current).abs() <= step + 1e-9, "{} -> {} moved too far", current, next);
            let (lo, hi) = if current < target { (current, target) } else { (target, current) };
            assert!(next >= lo - 1e-9 && next <= hi + 1e-9, "{} outside [{}, {}]", next, lo, hi);
        }
        assert_eq!(converge(10.0, 30.0, Some(step)), 14.0);
        assert_eq!(converge(30.0, 10.0, Some(step)), 26.0);
        assert_eq!(converge(10.0, 12.5, Some(step)), 12.5);
    }

    #[test]
    fn test_converge_unlimited() {
        assert_eq!(converge(10.0, 30.0, None), 30.0);
        assert_eq!(converge(30.0, 0.5, None), 0.5);
    }

    #[test]
    fn test_lvm_size_from_backing() {
        let mut catalog = DriveCatalog::new();
        catalog.insert_drive("m1", "10.0.0.1", "/dev/sda_root", DriveSize { size_bytes: 100 * GIB, is_full_drive: false });
        catalog.insert_drive("m1", "10.0.0.1", "/dev/sdb", DriveSize { size_bytes: 100 * GIB, is_full_drive: true });

        let mut d = device("r", "object-0", "10.0.0.1", "lvm0");
        d.server_name = "m1".into();
        d.backing = Some(Backing {
            percentage: 25.0,
            physical_volumes: vec!["/dev/sda_root".into(), "/dev/sdb".into()],
        });

        let size = device_size(&d, &catalog, &HostsTable::new()).unwrap();
        assert_eq!(size.size_bytes, 50 * GIB);
        assert!(!size.is_full_drive);

        d.backing.as_mut().unwrap().physical_volumes.push("/dev/sdz".into());
        assert!(device_size(&d, &catalog, &HostsTable::new()).is_none());
    }

    #[test]
    fn test_disk_size_via_alias() {
        let mut catalog = DriveCatalog::new();
        catalog.insert_drive("m1-mgmt", "192.168.1.1", "/dev/sdb", DriveSize { size_bytes: GIB, is_full_drive: true });

        let mut hosts = HostsTable::new();
        hosts.insert("m1-mgmt", "192.168.1.1");
        hosts.insert("m1-obj", "192.168.2.1");

        let mut d = device("r", "object-0", "192.168.2.1", "disk0");
        d.server_name = "m1".into();
        d.device_path = "/dev/sdb".into();
        assert_eq!(device_size(&d, &catalog, &hosts).unwrap().size_bytes, GIB);
        assert!(device_size(&d, &catalog, &HostsTable::new()).is_none());
    }
}
