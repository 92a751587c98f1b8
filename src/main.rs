//! solar-regulator entry point: CLI wiring and config-driven engine construction.

mod cli;

use std::io;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;

use solar_regulator::config::{ConfigError, RegulatorConfig};
use solar_regulator::equipment::{Actuator, JsonLinesActuator, LogActuator};
use solar_regulator::io::export::export_csv;
use solar_regulator::logging;
use solar_regulator::regulation::{Clock, JsonLinesReporter, RegulationEngine, SystemClock};
use solar_regulator::runtime::{self, EVENT_CHANNEL_CAPACITY, read_lines};
use solar_regulator::simulation::Simulation;

use crate::cli::{Cli, Command, ConfigArgs, RunArgs, SimulateArgs};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    match cli.command {
        Command::Run(args) => run(&args),
        Command::Simulate(args) => simulate(&args),
    }
}

/// Loads the configuration: --config takes priority, then --preset, then the reference preset.
fn load_config(args: &ConfigArgs) -> anyhow::Result<RegulatorConfig> {
    let config = if let Some(path) = &args.config {
        RegulatorConfig::from_toml_file(path)?
    } else if let Some(name) = &args.preset {
        RegulatorConfig::from_preset(name)?
    } else {
        RegulatorConfig::reference()
    };
    Ok(config)
}

fn invalid(errors: &[ConfigError]) -> anyhow::Error {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow::anyhow!("invalid configuration:\n{}", lines.join("\n"))
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(invalid(&errors));
    }

    let actuator: Box<dyn Actuator> = if args.dry_run {
        Box::new(LogActuator)
    } else {
        Box::new(JsonLinesActuator::new(io::stdout()))
    };
    let reporter = JsonLinesReporter::new(io::stdout());
    let clock = SystemClock;
    let mut engine = RegulationEngine::from_config(&config, actuator, reporter, clock.now())
        .map_err(|errors| invalid(&errors))?;
    info!(
        equipments = engine.equipments().len(),
        fallback = config.fallback.enabled,
        dry_run = args.dry_run,
        "regulator ready"
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    rt.block_on(async {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_lines(BufReader::new(tokio::io::stdin()), tx));
        runtime::run(&mut engine, rx, &clock, config.regulation.idle_timeout()).await;
        reader
            .await
            .context("stdin reader task failed")?
            .context("failed to read stdin")
    })
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let simulation = Simulation::from_config(&config).map_err(|errors| invalid(&errors))?;
    let result = simulation.run();
    if result.snapshots.is_empty() {
        bail!("simulation produced no status snapshot");
    }

    for snapshot in &result.snapshots {
        println!("{snapshot}");
    }
    println!("\n{}", result.kpis);

    if let Some(path) = &args.telemetry_out {
        export_csv(&result.snapshots, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        info!(path = %path.display(), "telemetry written");
    }
    Ok(())
}
