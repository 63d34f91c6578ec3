//! Reconciliation data model
//!
//! This module contains the records shared by every phase:
//! - Device: one drive of one server in one ring
//! - RingSpec / RegionRings: desired ring topology per deployment region
//! - Delta: the change plan
//! - DriveCatalog: probed drive sizes

pub mod device;
pub mod ring_spec;
pub mod delta;
pub mod drive_catalog;

pub use device::*;
pub use ring_spec::*;
pub use delta::*;
pub use drive_catalog::*;
