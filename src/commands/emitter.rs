//! Command Emitter
//!
//! Pure translation of a [`Delta`] into ring builder commands. For each ring,
//! in (region, ring) order:
//! 1. `create` and/or `set_replicas`
//! 2. one `add`, `set_weight` or `remove` per changed device
//! 3. a single `rebalance`
//!
//! Rings tagged for removal produce nothing; their builder files are left for
//! the operator.

use super::Command;
use crate::actual::builder_path;
use crate::model::{Delta, Device, Presence, RingAction, RingKey, RingSpec};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Emits the command queue for a delta
pub struct CommandEmitter {
    builder_dir: PathBuf,
}

impl CommandEmitter {
    pub fn new(builder_dir: impl Into<PathBuf>) -> Self {
        Self {
            builder_dir: builder_dir.into(),
        }
    }

    pub fn builder_dir(&self) -> &Path {
        &self.builder_dir
    }

    /// Commands for every ring of the delta
    pub fn emit(&self, delta: &Delta) -> Vec<Command> {
        let mut commands = Vec::new();
        for (key, spec) in &delta.delta_rings {
            commands.extend(self.emit_ring(delta, key, spec));
        }
        debug!("Emitted {} commands for {} rings", commands.len(), delta.delta_rings.len());
        commands
    }

    /// Commands for one ring
    pub fn emit_ring(&self, delta: &Delta, key: &RingKey, spec: &RingSpec) -> Vec<Command> {
        let builder = builder_path(&self.builder_dir, key);
        let actions = delta.actions(key);
        let has = |action| actions.map(|a| a.contains(action)).unwrap_or(false);

        if has(RingAction::Remove) {
            warn!(
                "{} is no longer declared; leaving {} in place",
                key,
                builder.display()
            );
            return Vec::new();
        }

        let mut commands = Vec::new();
        if has(RingAction::Add) {
            commands.push(Command::new(
                &builder,
                [
                    "create".to_string(),
                    spec.partition_power.to_string(),
                    spec.replicas().to_string(),
                    spec.min_part_hours.to_string(),
                ],
            ));
        }
        if has(RingAction::SetReplicaCount) {
            commands.push(Command::new(
                &builder,
                ["set_replicas".to_string(), spec.replicas().to_string()],
            ));
        }

        commands.extend(delta.ring_devices(key).filter_map(|d| device_command(&builder, d)));

        if !commands.is_empty() {
            commands.push(Command::new(&builder, ["rebalance"]));
        }
        commands
    }
}

/// The mutation a device needs, if any
pub fn device_command(builder: &Path, device: &Device) -> Option<Command> {
    let args: Vec<String> = match device.presence {
        Presence::Present => return None,
        Presence::Add => vec![
            "add".into(),
            "--region".into(),
            device.region_id.to_string(),
            "--zone".into(),
            device.zone_id.to_string(),
            "--ip".into(),
            device.server_ip.clone(),
            "--port".into(),
            device.server_port.to_string(),
            "--replication-ip".into(),
            device.replication_ip.clone(),
            "--replication-port".into(),
            device.replication_port.to_string(),
            "--device".into(),
            device.drive_name.clone(),
            "--weight".into(),
            format!("{:.2}", device.weight),
            "--meta".into(),
            device.meta.clone(),
        ],
        Presence::SetWeight => vec![
            "set_weight".into(),
            "--ip".into(),
            device.server_ip.clone(),
            "--device".into(),
            device.drive_name.clone(),
            format!("{:.2}", device.weight),
        ],
        Presence::Remove => vec![
            "remove".into(),
            "--ip".into(),
            device.server_ip.clone(),
            "--device".into(),
            device.drive_name.clone(),
        ],
    };
    Some(Command::new(builder, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::fixtures::device;

    const REGION: &str = "r1";

    fn delta_with(ring: &str, actions: &[RingAction], replicas: f64) -> (Delta, RingKey) {
        let mut delta = Delta::new();
        let key = RingKey::new(REGION, ring);
        delta.register_ring(key.clone(), RingSpec::replicated(ring, 10, replicas));
        for action in actions {
            delta.tag_ring(&key, *action).unwrap();
        }
        (delta, key)
    }

    fn with_presence(ip: &str, presence: Presence, weight: f64) -> Device {
        let mut d = device(REGION, "object-0", ip, "disk0");
        d.region_id = 1;
        d.zone_id = 2;
        d.presence = presence;
        d.weight = weight;
        d
    }

    #[test]
    fn test_new_ring_order() {
        let (mut delta, _) = delta_with("object-0", &[RingAction::Add], 3.0);
        delta.delta_devices.push(with_presence("10.0.0.1", Presence::Add, 20.0));
        delta.delta_devices.push(with_presence("10.0.0.2", Presence::Add, 20.0));

        let commands = CommandEmitter::new("/b").emit(&delta);
        let names: Vec<_> = commands.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["create", "add", "add", "rebalance"]);
        assert_eq!(commands[0].args, vec!["create", "10", "3", "24"]);
        assert_eq!(commands[0].builder, PathBuf::from("/b/region-r1/object-0.builder"));
        assert_eq!(
            commands[1].to_string(),
            "/b/region-r1/object-0.builder add --region 1 --zone 2 --ip 10.0.0.1 --port 6000 \
             --replication-ip 10.0.0.1 --replication-port 6000 --device disk0 --weight 20.00 \
             --meta server-10-0-0-1:disk0:/dev/sd5"
        );
    }

    #[test]
    fn test_existing_ring_changes() {
        let (mut delta, _) = delta_with(
            "object-0",
            &[RingAction::Present, RingAction::SetReplicaCount],
            2.5,
        );
        delta.delta_devices.push(with_presence("10.0.0.1", Presence::Present, 20.0));
        delta.delta_devices.push(with_presence("10.0.0.2", Presence::SetWeight, 12.5));
        delta.delta_devices.push(with_presence("10.0.0.3", Presence::Remove, 20.0));

        let commands = CommandEmitter::new("/b").emit(&delta);
        let names: Vec<_> = commands.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["set_replicas", "set_weight", "remove", "rebalance"]);
        assert_eq!(commands[0].args, vec!["set_replicas", "2.5"]);
        assert_eq!(
            commands[1].args,
            vec!["set_weight", "--ip", "10.0.0.2", "--device", "disk0", "12.50"]
        );
        assert_eq!(commands[2].args, vec!["remove", "--ip", "10.0.0.3", "--device", "disk0"]);
    }

    #[test]
    fn test_unchanged_ring_emits_nothing() {
        let (mut delta, _) = delta_with("object-0", &[RingAction::Present], 3.0);
        delta.delta_devices.push(with_presence("10.0.0.1", Presence::Present, 20.0));
        assert!(CommandEmitter::new("/b").emit(&delta).is_empty());
    }

    #[test]
    fn test_removed_ring_is_skipped() {
        let (mut delta, _) = delta_with("object-0", &[RingAction::Remove], 3.0);
        delta.delta_devices.push(with_presence("10.0.0.1", Presence::Remove, 20.0));
        assert!(CommandEmitter::new("/b").emit(&delta).is_empty());
    }

    #[test]
    fn test_rings_in_key_order_with_rebalance_last() {
        let mut delta = Delta::new();
        for ring in ["object-0", "account"] {
            let key = RingKey::new(REGION, ring);
            delta.register_ring(key.clone(), RingSpec::replicated(ring, 8, 3.0));
            delta.tag_ring(&key, RingAction::Add).unwrap();
        }
        let mut account = with_presence("10.0.0.1", Presence::Add, 1.0);
        account.ring_name = "account".into();
        delta.delta_devices.push(account);
        delta.delta_devices.push(with_presence("10.0.0.1", Presence::Add, 1.0));

        let commands = CommandEmitter::new("/b").emit(&delta);
        let rendered: Vec<_> = commands
            .iter()
            .map(|c| format!("{} {}", c.builder.file_name().unwrap().to_string_lossy(), c.name()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "account.builder create",
                "account.builder add",
                "account.builder rebalance",
                "object-0.builder create",
                "object-0.builder add",
                "object-0.builder rebalance",
            ]
        );
    }
}
