//! Pipeline - one reconciliation run end to end
//!
//! Wires the readers, the reconciler, the delta store and the command
//! executor together for each mode of the binary:
//! - make-delta: read desired and actual state, write the delta
//! - rebalance: load the delta, emit and run the commands
//! - report: summarize the stored delta
//! - storage-policies: render `swift.conf` policy sections

use crate::actual::BuilderDirReader;
use crate::commands::{CommandEmitter, CommandExecutor, ExecutionReport, ExecutorConfig};
use crate::domain::ports::{ActualState, ActualStateReader, RingBuilderToolRef};
use crate::error::{Error, Result};
use crate::input::{DesiredModelReader, DesiredRings, HostsTable, InputModel, NetworkBindings, RingSpecReader};
use crate::model::{Device, DriveCatalog};
use crate::reconcile::{generate_delta, ReconcileOptions, Reconciliation};
use crate::report::{render_delta_report, render_storage_policies};
use crate::store::{DeltaFormat, DeltaStore};
use std::path::PathBuf;
use tracing::{info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Locations of every input and output
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub input_model: PathBuf,
    pub hosts: PathBuf,
    pub consumes: PathBuf,
    pub osconfig_dir: PathBuf,
    pub builder_dir: PathBuf,
    pub delta: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input_model: PathBuf::from("/etc/swiftlm/input-model.yml"),
            hosts: PathBuf::from("/etc/hosts"),
            consumes: PathBuf::from("/etc/swiftlm/swift-consumes.yml"),
            osconfig_dir: PathBuf::from("/etc/swiftlm/osconfig"),
            builder_dir: PathBuf::from("/etc/swiftlm/builder_dir"),
            delta: PathBuf::from("/etc/swiftlm/reports/ring-delta.yml"),
        }
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub paths: Paths,
    pub options: ReconcileOptions,
    /// Restrict the run to one deployment region
    pub region: Option<String>,
    /// Delta file format; inferred from the extension when unset
    pub format: Option<DeltaFormat>,
    pub dry_run: bool,
}

/// Everything the declared side of a run needs
#[derive(Debug, Clone, Default)]
pub struct DesiredInputs {
    pub rings: DesiredRings,
    pub devices: Vec<Device>,
    pub hosts: HostsTable,
    pub catalog: DriveCatalog,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Runs the reconciler's modes against one set of paths
pub struct Pipeline {
    config: PipelineConfig,
    tool: RingBuilderToolRef,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, tool: RingBuilderToolRef) -> Self {
        Self { config, tool }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn store(&self) -> DeltaStore {
        let store = DeltaStore::new(&self.config.paths.delta);
        match self.config.format {
            Some(format) => store.with_format(format),
            None => store,
        }
    }

    fn in_scope(&self, region_name: &str) -> bool {
        self.config.region.as_deref().map_or(true, |r| r == region_name)
    }

    /// Load the declared model, hosts, bindings and drive catalog
    pub fn load_desired(&self) -> Result<DesiredInputs> {
        let paths = &self.config.paths;
        let model = InputModel::load(&paths.input_model)?;
        let hosts = HostsTable::load(&paths.hosts)?;
        let bindings = NetworkBindings::load(&paths.consumes)?;
        let mut rings = RingSpecReader::read(&model)?;
        let catalog = DriveCatalog::load_dir(&paths.osconfig_dir)?;

        let reader = DesiredModelReader::new(&model, &bindings, &hosts, &rings);
        let mut devices = Vec::new();
        let mut errors = Vec::new();
        for device in reader.devices() {
            match device {
                Ok(device) if self.in_scope(&device.region_name) => devices.push(device),
                Ok(_) => {}
                Err(e) => errors.extend(e.messages()),
            }
        }
        if !errors.is_empty() {
            return Err(Error::Model(errors));
        }

        rings.retain(|region_name, _| self.in_scope(region_name));
        info!(
            "Desired model: {} regions, {} devices, {} hosts",
            rings.len(),
            devices.len(),
            hosts.len()
        );
        Ok(DesiredInputs {
            rings,
            devices,
            hosts,
            catalog,
        })
    }

    /// Read the rings recorded in the builder directory
    pub async fn load_actual(&self) -> Result<ActualState> {
        let reader = BuilderDirReader::new(&self.config.paths.builder_dir, self.tool.clone());
        let mut state = reader.read().await?;
        state.rings.retain(|key, _| self.in_scope(&key.region_name));
        state.devices.retain(|d| self.in_scope(&d.region_name));
        Ok(state)
    }

    /// Compute the delta and write it to the delta file
    pub async fn make_delta(&self) -> Result<Reconciliation> {
        let desired = self.load_desired()?;
        let actual = self.load_actual().await?;

        let reconciliation = generate_delta(
            desired.devices,
            &desired.rings,
            &actual,
            &desired.catalog,
            &desired.hosts,
            self.config.options.clone(),
        )?;
        for warning in &reconciliation.warnings {
            warn!("{}", warning);
        }

        self.store().write(&reconciliation.delta)?;
        Ok(reconciliation)
    }

    /// Apply the stored delta to the builder files
    pub async fn rebalance(&self) -> Result<ExecutionReport> {
        let delta = self.store().read()?;
        let commands = CommandEmitter::new(&self.config.paths.builder_dir).emit(&delta);
        let executor = CommandExecutor::new(
            self.tool.clone(),
            ExecutorConfig {
                dry_run: self.config.dry_run,
            },
        );
        executor.execute(&commands).await
    }

    /// Text summary of the stored delta
    pub fn report(&self) -> Result<String> {
        let delta = self.store().read()?;
        Ok(render_delta_report(&delta))
    }

    /// `swift.conf` storage policies of the selected region
    pub fn storage_policies(&self) -> Result<String> {
        let model = InputModel::load(&self.config.paths.input_model)?;
        let rings = RingSpecReader::read(&model)?;
        let region = match &self.config.region {
            Some(region) => region.clone(),
            None if rings.len() == 1 => rings.keys().next().cloned().unwrap_or_default(),
            None => {
                return Err(Error::Configuration(format!(
                    "{} regions declared; choose one with --region",
                    rings.len()
                )))
            }
        };
        render_storage_policies(&rings, &region)
    }
}
