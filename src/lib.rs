//! Swift Ring Reconciler
//!
//! Reconciles a declared Swift deployment (servers, disk models and ring
//! specifications) against the rings recorded in `swift-ring-builder`
//! builder files, and produces a reviewable delta that is applied as a
//! sequence of ring builder commands.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────┐
//! │    Desired Model     │   │     Actual State     │   │   Drive Catalog  │
//! │ input model, hosts,  │   │ builder dir listing  │   │ probed drive     │
//! │ network bindings     │   │ via ring builder     │   │ sizes            │
//! └──────────┬───────────┘   └──────────┬───────────┘   └────────┬─────────┘
//!            │                          │                        │
//!            └──────────────────────────┼────────────────────────┘
//!                                       │
//!                            ┌──────────┴──────────┐
//!                            │     Reconciler      │
//!                            │  (generate_delta)   │
//!                            └──────────┬──────────┘
//!                                       │
//!                  ┌────────────────────┼────────────────────┐
//!                  │                    │                    │
//!         ┌────────┴───────┐   ┌────────┴───────┐   ┌────────┴───────┐
//!         │   DeltaStore   │   │    Reports     │   │ CommandEmitter │
//!         │  (YAML/JSON)   │   │                │   │  + Executor    │
//!         └────────────────┘   └────────────────┘   └────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`model`]: Devices, ring specifications, deltas and the drive catalog
//! - [`input`]: Readers for the declared model
//! - [`actual`]: Builder directory reader and ring builder adapter
//! - [`reconcile`]: Delta computation and weight convergence
//! - [`commands`]: Command emission and execution
//! - [`store`]: Delta persistence
//! - [`report`]: Delta summaries and storage policies
//! - [`pipeline`]: End-to-end runs of each mode
//! - [`domain`]: Ports to the external ring builder
//! - [`error`]: Error types and handling

pub mod actual;
pub mod commands;
pub mod domain;
pub mod error;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use actual::{BuilderDirReader, RingBuilderConfig, SwiftRingBuilder};

pub use commands::{Command, CommandEmitter, CommandExecutor, ExecutionReport, ExecutorConfig};

pub use domain::ports::{
    ActualState, ActualStateReader, RingBuilderTool, ToolOutcome, ToolOutput,
};

pub use error::{Error, Result};

pub use input::{DesiredModelReader, DesiredRings, HostsTable, InputModel, NetworkBindings, RingSpecReader};

pub use model::{
    Delta, Device, DeviceKey, DriveCatalog, DriveSize, Presence, RegionRings, RingAction,
    RingActions, RingKey, RingPolicy, RingSpec,
};

pub use pipeline::{Paths, Pipeline, PipelineConfig};

pub use reconcile::{generate_delta, ReconcileOptions, Reconciler, Reconciliation};

pub use store::{DeltaFormat, DeltaStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
