//! Swift Ring Reconciler
//!
//! Command-line entry point. Exactly one mode runs per invocation:
//!
//! - `--make-delta`: compare the declared model with the builder files and
//!   write the delta file
//! - `--rebalance`: apply the delta file with `swift-ring-builder`
//! - `--report`: print a summary of the delta file
//! - `--storage-policies`: print the `swift.conf` storage policy sections

use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swift_ring_reconciler::{
    DeltaFormat, Paths, Pipeline, PipelineConfig, ReconcileOptions, Result, RingBuilderConfig,
    SwiftRingBuilder,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Swift Ring Reconciler - keeps ring builder files in line with the declared model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["make_delta", "rebalance", "report", "storage_policies"]),
))]
struct Args {
    /// Compute the delta and write it to the delta file
    #[arg(long, env = "SWIFT_RING_MAKE_DELTA")]
    make_delta: bool,

    /// Apply the delta file to the builder files
    #[arg(long, env = "SWIFT_RING_REBALANCE")]
    rebalance: bool,

    /// Summarize the delta file
    #[arg(long, env = "SWIFT_RING_REPORT")]
    report: bool,

    /// Print swift.conf storage policies for the selected region
    #[arg(long, env = "SWIFT_RING_STORAGE_POLICIES")]
    storage_policies: bool,

    /// Print the ring builder commands instead of running them
    #[arg(long, env = "SWIFT_RING_DRY_RUN")]
    dry_run: bool,

    /// Largest weight change per run (overrides ring specifications)
    #[arg(long, env = "SWIFT_RING_WEIGHT_STEP")]
    weight_step: Option<f64>,

    /// Accept drive partitions as ring devices
    #[arg(long, env = "SWIFT_RING_ALLOW_PARTITIONS")]
    allow_partitions: bool,

    /// Treat warnings as errors
    #[arg(long, env = "SWIFT_RING_STOP_ON_WARNINGS")]
    stop_on_warnings: bool,

    /// Bytes per unit of weight
    #[arg(long, env = "SWIFT_RING_SIZE_TO_WEIGHT", default_value_t = 1024.0 * 1024.0 * 1024.0)]
    size_to_weight: f64,

    /// Restrict the run to one deployment region
    #[arg(long, env = "SWIFT_RING_REGION")]
    region: Option<String>,

    /// Desired-state file
    #[arg(long, env = "SWIFT_RING_INPUT_MODEL", default_value = "/etc/swiftlm/input-model.yml")]
    input_model: PathBuf,

    /// Hosts file
    #[arg(long, env = "SWIFT_RING_HOSTS", default_value = "/etc/hosts")]
    hosts: PathBuf,

    /// Network consumption file
    #[arg(long, env = "SWIFT_RING_CONSUMES", default_value = "/etc/swiftlm/swift-consumes.yml")]
    consumes: PathBuf,

    /// Directory of per-host drive_configuration.yml files
    #[arg(long, env = "SWIFT_RING_OSCONFIG_DIR", default_value = "/etc/swiftlm/osconfig")]
    osconfig_dir: PathBuf,

    /// Directory of region-<name>/<ring>.builder files
    #[arg(long, env = "SWIFT_RING_BUILDER_DIR", default_value = "/etc/swiftlm/builder_dir")]
    builder_dir: PathBuf,

    /// Delta file
    #[arg(long, env = "SWIFT_RING_DELTA", default_value = "/etc/swiftlm/reports/ring-delta.yml")]
    delta: PathBuf,

    /// Delta file format (yaml, json); inferred from the extension by default
    #[arg(long, env = "SWIFT_RING_FORMAT")]
    format: Option<String>,

    /// swift-ring-builder executable
    #[arg(long, env = "SWIFT_RING_BUILDER", default_value = "swift-ring-builder")]
    ring_builder: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let format = self.format.as_deref().map(str::parse::<DeltaFormat>).transpose()?;
        let options = ReconcileOptions {
            size_to_weight: self.size_to_weight,
            weight_step: self.weight_step,
            allow_partitions: self.allow_partitions,
            stop_on_warnings: self.stop_on_warnings,
        };
        options.validate()?;

        Ok(PipelineConfig {
            paths: Paths {
                input_model: self.input_model.clone(),
                hosts: self.hosts.clone(),
                consumes: self.consumes.clone(),
                osconfig_dir: self.osconfig_dir.clone(),
                builder_dir: self.builder_dir.clone(),
                delta: self.delta.clone(),
            },
            options,
            region: self.region.clone(),
            format,
            dry_run: self.dry_run,
        })
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            for message in e.messages() {
                error!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    info!("{} {}", swift_ring_reconciler::NAME, swift_ring_reconciler::VERSION);

    let config = args.pipeline_config()?;
    let tool = Arc::new(SwiftRingBuilder::new(RingBuilderConfig {
        binary: args.ring_builder.clone(),
    }));
    let pipeline = Pipeline::new(config, tool);

    if args.make_delta {
        let result = pipeline.make_delta().await?;
        info!(
            "Delta written to {:?} ({} warnings)",
            pipeline.config().paths.delta,
            result.warnings.len()
        );
    } else if args.rebalance {
        let report = pipeline.rebalance().await?;
        if pipeline.config().dry_run {
            for line in &report.planned {
                println!("{}", line);
            }
        }
    } else if args.report {
        print!("{}", pipeline.report()?);
    } else if args.storage_policies {
        print!("{}", pipeline.storage_policies()?);
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the report and dry-run output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
