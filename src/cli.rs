//! The command line interface for facilp.
use crate::formulation::{ConstraintKind, CostBreakdown, formulate};
use crate::input::load;
use crate::log;
use crate::settings::Settings;
use crate::solver::solve;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// Flows smaller than this are treated as zero when printing a solution
const FLOW_TOLERANCE: f64 = 1e-9;

/// The command line interface for facilp.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the solve command
#[derive(Args, Default)]
pub struct SolveOpts {
    /// Show the solver's own progress output
    #[arg(long)]
    pub solver_output: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Solve the LP relaxation for an instance.
    Solve {
        /// Path to the instance file.
        instance_file: PathBuf,
        /// Other solve options
        #[command(flatten)]
        opts: SolveOpts,
    },
    /// Check that an instance file is valid, without solving it.
    Validate {
        /// Path to the instance file.
        instance_file: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Solve {
                instance_file,
                opts,
            } => handle_solve_command(&instance_file, &opts, None).map(|_| ()),
            Self::Validate { instance_file } => handle_validate_command(&instance_file, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start facilp
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided, and initialise the logger
fn init(settings: Option<Settings>) -> Result<Settings> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    log::init(Some(&settings.log_level)).context("Failed to initialise logging.")?;

    Ok(settings)
}

/// Handle the `solve` command.
///
/// # Returns
///
/// Whether a solution was found. An infeasible instance is not an error.
pub fn handle_solve_command(
    instance_path: &Path,
    opts: &SolveOpts,
    settings: Option<Settings>,
) -> Result<bool> {
    let mut settings = init(settings)?;

    // This setting can be overridden by command-line argument
    if opts.solver_output {
        settings.solver_output = true;
    }

    let instance = load(instance_path).context("Failed to load instance.")?;
    let model = formulate(&instance);
    let Some(solution) = solve(&model, &settings.solver_options())? else {
        println!("No solution found!");
        return Ok(false);
    };

    let costs = CostBreakdown::new(&instance, solution.flows());
    println!("Objective value: {}", solution.objective_value());
    println!("  Opening cost: {}", costs.opening);
    println!("  Service cost: {}", costs.service);
    println!("  Vehicle cost: {}", costs.vehicle);
    println!("Flows (customer, facility, fraction of demand):");
    for ((customer, facility), flow) in solution.iter_nonzero_flows(FLOW_TOLERANCE) {
        println!("  {customer}, {facility}, {flow}");
    }

    Ok(true)
}

/// Handle the `validate` command.
pub fn handle_validate_command(instance_path: &Path, settings: Option<Settings>) -> Result<()> {
    init(settings)?;

    let instance = load(instance_path).context("Failed to validate instance.")?;
    let model = formulate(&instance);
    info!(
        "Model has {} flow variables, {} demand constraints, {} distance constraints and {} \
         capacity constraints",
        model.variables().len(),
        model.count_constraints(|kind| matches!(kind, ConstraintKind::DemandCoverage(_))),
        model.count_constraints(|kind| matches!(kind, ConstraintKind::VehicleDistance(_))),
        model.count_constraints(|kind| matches!(kind, ConstraintKind::FacilityCapacity(_))),
    );
    info!("Instance validation successful!");

    Ok(())
}
