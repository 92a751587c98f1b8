use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Cli {
    /// Log filter, e.g. `debug` or `solar_regulator=trace` (overrides `RUST_LOG`).
    #[clap(long, global = true, env = "SOLAR_REGULATOR_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Regulate live: read `<topic> <json>` lines on stdin, print status snapshots on stdout.
    #[clap(name = "run")]
    Run(RunArgs),

    /// Regulate a synthetic day and print the KPI report.
    #[clap(name = "simulate")]
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file.
    #[clap(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in preset (reference, cloudy, heater).
    #[clap(long)]
    pub preset: Option<String>,
}

#[derive(Args)]
pub struct RunArgs {
    #[clap(flatten)]
    pub config: ConfigArgs,

    /// Log actuator commands instead of writing them to stdout.
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[clap(flatten)]
    pub config: ConfigArgs,

    /// Override the random seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Export status snapshots to CSV.
    #[clap(long)]
    pub telemetry_out: Option<PathBuf>,
}
