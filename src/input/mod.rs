//! Desired-state inputs
//!
//! Readers for the declared model: the input model file (servers and ring
//! specifications), the hosts table and the network bindings.

pub mod model_file;
pub mod hosts;
pub mod consumes;
pub mod ring_specs;
pub mod desired;

pub use model_file::*;
pub use hosts::*;
pub use consumes::*;
pub use ring_specs::*;
pub use desired::*;
