//! Delta
//!
//! The reviewable change plan produced by reconciliation: which rings to
//! create or adjust and what to do with every device.

use super::device::{Device, Presence};
use super::ring_spec::{RingKey, RingSpec};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// Ring Actions
// =============================================================================

/// Action to take on a ring as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RingAction {
    /// The ring has no builder yet
    Add,
    /// The ring exists and is declared
    Present,
    /// The ring exists but is no longer declared
    Remove,
    /// The ring exists with a different replica count
    SetReplicaCount,
}

impl fmt::Display for RingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingAction::Add => write!(f, "add"),
            RingAction::Present => write!(f, "present"),
            RingAction::Remove => write!(f, "remove"),
            RingAction::SetReplicaCount => write!(f, "set-replica-count"),
        }
    }
}

/// Accumulated actions for one ring
///
/// `add`, `present` and `remove` exclude each other; `set-replica-count`
/// only accompanies `present`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingActions(BTreeSet<RingAction>);

impl RingActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action, rejecting combinations that cannot hold together
    pub fn insert(&mut self, action: RingAction) -> std::result::Result<(), String> {
        let lifecycle = [RingAction::Add, RingAction::Present, RingAction::Remove];
        if lifecycle.contains(&action) {
            if let Some(existing) = self.0.iter().find(|a| lifecycle.contains(a) && **a != action) {
                return Err(format!("{} conflicts with {}", action, existing));
            }
            if action != RingAction::Present && self.contains(RingAction::SetReplicaCount) {
                return Err(format!("{} conflicts with {}", action, RingAction::SetReplicaCount));
            }
        }
        if action == RingAction::SetReplicaCount && !self.contains(RingAction::Present) {
            return Err(format!("{} requires {}", action, RingAction::Present));
        }
        self.0.insert(action);
        Ok(())
    }

    pub fn contains(&self, action: RingAction) -> bool {
        self.0.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = RingAction> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for RingActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

// =============================================================================
// Delta
// =============================================================================

/// Change plan for a set of rings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    pub delta_rings: BTreeMap<RingKey, RingSpec>,
    pub delta_ring_actions: BTreeMap<RingKey, RingActions>,
    pub delta_devices: Vec<Device>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ring, keeping the first specification seen
    pub fn register_ring(&mut self, key: RingKey, spec: RingSpec) {
        self.delta_rings.entry(key).or_insert(spec);
    }

    /// Record an action for a ring
    pub fn tag_ring(&mut self, key: &RingKey, action: RingAction) -> Result<()> {
        self.delta_ring_actions
            .entry(key.clone())
            .or_default()
            .insert(action)
            .map_err(|reason| Error::RingActionConflict {
                region: key.region_name.clone(),
                ring: key.ring_name.clone(),
                reason,
            })
    }

    pub fn actions(&self, key: &RingKey) -> Option<&RingActions> {
        self.delta_ring_actions.get(key)
    }

    /// Devices of one ring, in delta order
    pub fn ring_devices<'a>(&'a self, key: &'a RingKey) -> impl Iterator<Item = &'a Device> + 'a {
        self.delta_devices
            .iter()
            .filter(move |d| d.region_name == key.region_name && d.ring_name == key.ring_name)
    }

    /// Number of devices with the given presence
    pub fn count(&self, presence: Presence) -> usize {
        self.delta_devices.iter().filter(|d| d.presence == presence).count()
    }

    /// Check that every device references a registered ring
    pub fn validate(&self) -> Result<()> {
        let missing: BTreeSet<String> = self
            .delta_devices
            .iter()
            .filter(|d| !self.delta_rings.contains_key(&RingKey::new(&d.region_name, &d.ring_name)))
            .map(|d| format!("device {} references unknown ring {} in region {}", d.key(), d.ring_name, d.region_name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Model(missing.into_iter().collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::fixtures::device;
    use assert_matches::assert_matches;

    #[test]
    fn test_present_and_set_replica_count_coexist() {
        let mut actions = RingActions::new();
        actions.insert(RingAction::Present).unwrap();
        actions.insert(RingAction::SetReplicaCount).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions.to_string(), "[present, set-replica-count]");
    }

    #[test]
    fn test_lifecycle_actions_are_exclusive() {
        let mut actions = RingActions::new();
        actions.insert(RingAction::Add).unwrap();
        assert!(actions.insert(RingAction::Remove).is_err());
        assert!(actions.insert(RingAction::Present).is_err());
        assert!(actions.insert(RingAction::SetReplicaCount).is_err());
        // re-inserting is harmless
        actions.insert(RingAction::Add).unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_set_replica_count_requires_present() {
        let mut actions = RingActions::new();
        assert!(actions.insert(RingAction::SetReplicaCount).is_err());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_tag_ring_conflict_is_error() {
        let mut delta = Delta::new();
        let key = RingKey::new("r1", "object-0");
        delta.tag_ring(&key, RingAction::Add).unwrap();
        assert_matches!(
            delta.tag_ring(&key, RingAction::Remove),
            Err(Error::RingActionConflict { .. })
        );
    }

    #[test]
    fn test_validate_unknown_ring() {
        let mut delta = Delta::new();
        delta.delta_devices.push(device("r1", "object-0", "10.0.0.1", "disk0"));
        assert_matches!(delta.validate(), Err(Error::Model(msgs)) if msgs.len() == 1);

        delta.register_ring(
            RingKey::new("r1", "object-0"),
            RingSpec::replicated("object-0", 10, 3.0),
        );
        assert!(delta.validate().is_ok());
        assert_eq!(delta.count(Presence::Present), 1);
    }
}
