//! The command line interface for elmarkets.
use crate::log;
use crate::market::Market;
use crate::model::Model;
use crate::output::metadata::write_metadata;
use crate::output::{DataWriter, create_output_directory, get_output_dir, write_price_series};
use crate::settings::Settings;
use crate::simulation::{run_power_plants, run_sweep, select_scenarios};
use crate::units::MoneyPerEnergy;
use ::log::{info, warn};
use anyhow::{Context, Result, bail, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use itertools::Itertools;
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for elmarkets.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for commands which solve a model
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write additional information to CSV files and show solver output
    #[arg(long)]
    pub debug_model: bool,
}

/// Options for the `prices` command
#[derive(Args)]
pub struct PricesOpts {
    /// The market to synthesise prices for
    #[arg(long, value_parser = ["day_ahead", "intraday"])]
    pub market: String,
    /// The year to synthesise (defaults to the model's year)
    #[arg(long)]
    pub year: Option<u32>,
    /// Target mean price (defaults to the historical mean for the year)
    #[arg(long)]
    pub target_mean: Option<f64>,
    /// The CSV file to write (defaults to `<market>_prices_<year>.csv`)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the scenario sweep for a district model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Only run the named scenarios (e.g. `baseline`, `day_ahead_x2`)
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Compare power plants selling into the markets.
    PowerPlants {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Synthesise a price series for a year.
    Prices {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Price options
        #[command(flatten)]
        opts: PricesOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run {
                model_dir,
                scenarios,
                opts,
            } => handle_run_command(&model_dir, &scenarios, &opts, None),
            Self::PowerPlants { model_dir, opts } => {
                handle_power_plants_command(&model_dir, &opts, None)
            }
            Self::Prices { model_dir, opts } => handle_prices_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start elmarkets
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ elmarkets --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Set up the output folder and logger, then load the model.
///
/// # Returns
///
/// The model, a writer for the output folder and whether to debug the model.
fn prepare_run(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<(Model, DataWriter, bool)> {
    let settings = load_settings(settings)?;

    // These settings can be overridden by command-line arguments
    let debug_model = settings.debug_model || opts.debug_model;
    let allow_overwrite = settings.overwrite || opts.overwrite;

    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(&settings.results_root, model_path)?,
    };
    let overwrite = create_output_directory(&output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    log::init(&settings.log_level, Some(&output_path))
        .context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let model = Model::from_path(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    Ok((model, DataWriter::new(&output_path, debug_model), debug_model))
}

/// Handle the `run` command.
///
/// # Arguments
///
/// * `model_path` - Path to the model directory
/// * `scenario_names` - Scenarios to run (all of the model's scenarios if empty)
/// * `opts` - Output options
/// * `settings` - Program settings (loaded from the settings file if `None`)
pub fn handle_run_command(
    model_path: &Path,
    scenario_names: &[String],
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (mut model, writer, debug_model) = prepare_run(model_path, opts, settings)?;

    let selected: Vec<_> = select_scenarios(&model.parameters.scenarios, scenario_names)
        .into_iter()
        .copied()
        .collect();
    ensure!(
        !selected.is_empty(),
        "None of the requested scenarios ({}) are in the model",
        scenario_names.join(", ")
    );
    model.parameters.scenarios = selected;

    write_metadata(writer.output_path(), &model, "run").context("Failed to save metadata.")?;
    let report = run_sweep(&model, &writer, debug_model)?;

    let failed = report.failed().collect_vec();
    if !failed.is_empty() {
        bail!(
            "{} of {} scenarios failed: {}",
            failed.len(),
            model.parameters.scenarios.len(),
            failed.join(", ")
        );
    }
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `power-plants` command.
pub fn handle_power_plants_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (model, writer, debug_model) = prepare_run(model_path, opts, settings)?;
    write_metadata(writer.output_path(), &model, "power-plants")
        .context("Failed to save metadata.")?;
    run_power_plants(&model, &writer, debug_model)?;
    info!("Power plant comparison complete!");

    Ok(())
}

/// Handle the `prices` command.
pub fn handle_prices_command(
    model_path: &Path,
    opts: &PricesOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let market: Market = opts.market.parse()?;
    let model = Model::from_path(model_path).context("Failed to load model.")?;
    let year = opts.year.unwrap_or(model.parameters.year);
    let series = model.price_synthesizer().synthesize(
        year,
        market,
        opts.target_mean.map(MoneyPerEnergy),
    )?;

    let file_path = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{market}_prices_{year}.csv")));
    write_price_series(&file_path, &series)
        .with_context(|| format!("Failed to write prices to {}", file_path.display()))?;
    info!(
        "Wrote {} {market} prices for {year} (mean {:.2}) to {}",
        series.len(),
        series.mean(),
        file_path.display()
    );

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    // Load the model and check that its prices can be assembled
    let model = Model::from_path(model_path).context("Failed to validate model.")?;
    model
        .market_timeline()
        .context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
