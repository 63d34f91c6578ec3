//! Domain layer - port definitions
//!
//! Traits (ports) for the ring builder process and the actual-state source;
//! adapters in `actual` and `commands` implement and consume them.

pub mod ports;

pub use ports::*;
