//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the EV garage federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use evg_common::{init_tracing, AppConfig, SimTime};
use evg_federate::{BatteryFederate, ControllerFederate, FederateExecutor, Trajectory};
use evg_sim::{write_run_summary, write_trajectory_csv, ReplayFederation, RunSummary, Scenario};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "EV garage co-simulation federates",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct RoleArgs {
    #[arg(long, value_name = "FILE", help = "Scenario (json or csv) replayed into the federate")]
    scenario: Option<PathBuf>,

    #[arg(long, value_name = "DIR", default_value = "target/evg-out", help = "Output directory")]
    out: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the event-driven charge controller")]
    Controller(RoleArgs),
    #[command(about = "Run the periodic battery physics federate")]
    Battery(RoleArgs),
    #[command(
        about = "Run both federates concurrently, each against its own independent scenario replay"
    )]
    RunAll {
        #[arg(long, value_name = "FILE")]
        controller_scenario: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        battery_scenario: Option<PathBuf>,
        #[arg(long, value_name = "DIR", default_value = "target/evg-out")]
        out: PathBuf,
    },
    #[command(about = "Validate the configuration and print the effective settings")]
    CheckConfig,
}

/// What a finished federate hands back for export.
struct RoleOutput {
    role: &'static str,
    federate: String,
    horizon: SimTime,
    steps: usize,
    trajectory: Trajectory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/garage.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;

    init_tracing("evg-fed", &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    let mut executor = FederateExecutor::new();
    let out = match cli.command {
        Commands::CheckConfig => {
            println!("configuration: {}", loaded.source.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Controller(args) => {
            spawn_controller(&mut executor, &config, args.scenario.as_deref())?;
            args.out
        }
        Commands::Battery(args) => {
            spawn_battery(&mut executor, &config, args.scenario.as_deref())?;
            args.out
        }
        Commands::RunAll {
            controller_scenario,
            battery_scenario,
            out,
        } => {
            spawn_controller(&mut executor, &config, controller_scenario.as_deref())?;
            spawn_battery(&mut executor, &config, battery_scenario.as_deref())?;
            out
        }
    };

    for (name, output) in executor.join().await? {
        write_outputs(&out, &output)?;
        info!(
            federate = %name,
            samples = output.trajectory.len(),
            out = %out.display(),
            "federate output written"
        );
    }
    Ok(())
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => {
            Scenario::from_path(path).with_context(|| format!("loading scenario {}", path.display()))
        }
        None => Ok(Scenario::default()),
    }
}

fn spawn_controller(
    executor: &mut FederateExecutor<RoleOutput>,
    config: &AppConfig,
    scenario: Option<&Path>,
) -> Result<()> {
    let scenario = load_scenario(scenario)?;
    let controller = ControllerFederate::new(&config.controller, config.federation.horizon);
    let endpoint = config.controller.endpoint.clone();
    executor.spawn(config.controller.name.clone(), move || {
        let mut replay = ReplayFederation::new(endpoint, scenario);
        let report = controller.run(&mut replay)?;
        Ok(RoleOutput {
            role: "controller",
            federate: controller.name().to_owned(),
            horizon: controller.horizon(),
            steps: report.wake_times.len(),
            trajectory: report.trajectory,
        })
    });
    Ok(())
}

fn spawn_battery(
    executor: &mut FederateExecutor<RoleOutput>,
    config: &AppConfig,
    scenario: Option<&Path>,
) -> Result<()> {
    let scenario = load_scenario(scenario)?;
    let battery = BatteryFederate::new(&config.battery, &config.federation)
        .context("building battery model")?;
    let endpoint = config.battery.replay_endpoint();
    executor.spawn(config.battery.name.clone(), move || {
        let mut replay = ReplayFederation::new(endpoint, scenario);
        let report = battery.run(&mut replay)?;
        Ok(RoleOutput {
            role: "battery",
            federate: battery.name().to_owned(),
            horizon: battery.horizon(),
            steps: report.grants.len(),
            trajectory: report.trajectory,
        })
    });
    Ok(())
}

fn write_outputs(out: &Path, output: &RoleOutput) -> Result<()> {
    write_trajectory_csv(
        &out.join(format!("{}_trajectory.csv", output.role)),
        &output.trajectory,
    )?;
    let summary = RunSummary::new(
        output.role,
        &output.federate,
        output.horizon,
        output.steps,
        &output.trajectory,
    );
    write_run_summary(&out.join(format!("{}_summary.json", output.role)), &summary)
}
