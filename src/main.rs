//! SIRD epidemic model runner
//!
//! # Usage
//!
//! ```bash
//! rsird run --config scenario.toml --output results/trajectory.csv
//! rsird run --beta 0.5 --theta 0 --horizon 100 --points 101
//! rsird show-config --config scenario.toml
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use rsird::config::{Overrides, RunConfig};
use rsird::report::{format_summary, write_csv_file};
use rsird_components::{EpidemicSummary, SIRDModel};
use rsird_core::solver::Method;
use std::path::PathBuf;

/// SIRD compartmental epidemic model
#[derive(Parser, Debug)]
#[command(name = "rsird", version)]
#[command(about = "Integrate the SIRD epidemic model over a time grid")]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single scenario and print a summary
    Run(RunArgs),
    /// Print the effective configuration as TOML
    ShowConfig {
        /// TOML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total population
    #[arg(long)]
    population: Option<f64>,

    /// Initially infected individuals
    #[arg(long)]
    infected: Option<f64>,

    /// Initially recovered individuals
    #[arg(long)]
    recovered: Option<f64>,

    /// Initially deceased individuals
    #[arg(long)]
    deceased: Option<f64>,

    /// Contact rate
    #[arg(long)]
    beta: Option<f64>,

    /// Recovery rate
    #[arg(long)]
    gamma: Option<f64>,

    /// Mortality rate
    #[arg(long)]
    theta: Option<f64>,

    /// Last reported day
    #[arg(long)]
    horizon: Option<f64>,

    /// Number of reported times
    #[arg(long)]
    points: Option<usize>,

    /// Integration method (rk4, dopri5 or dop853)
    #[arg(long)]
    method: Option<Method>,

    /// Largest step of the fixed step method
    #[arg(long)]
    step_size: Option<f64>,

    /// Write the trajectory to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            population: self.population,
            infected: self.infected,
            recovered: self.recovered,
            deceased: self.deceased,
            beta: self.beta,
            gamma: self.gamma,
            theta: self.theta,
            horizon: self.horizon,
            points: self.points,
            method: self.method,
            step_size: self.step_size,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(args: &RunArgs) -> Result<()> {
    let config = RunConfig::load(args.config.as_deref())?.apply(&args.overrides());

    let model = SIRDModel::from_parameters(config.parameters());
    let initial_state = config.initial_state()?;
    let time_grid = config.time_grid()?;

    info!(
        "R0 = {:.3}, running {} points to day {}",
        model.parameters().basic_reproduction_number(),
        time_grid.len(),
        time_grid.last()
    );
    let trajectory = model.integrate(&initial_state, &time_grid, config.solver_options())?;

    if let Some(path) = &args.output {
        write_csv_file(path, &trajectory)?;
        info!("Wrote {} rows to {}", trajectory.len(), path.display());
    }

    if let Some(summary) = EpidemicSummary::from_trajectory(&trajectory) {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Run(args) => run(args),
        Command::ShowConfig { config } => {
            let config = RunConfig::load(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
