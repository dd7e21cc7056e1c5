//! Logging to the console and, for commands which write results, to log files in the output folder.
//!
//! Messages below warning level go to stdout and warnings and errors go to stderr, coloured when
//! the stream is a terminal. Runs also get two log files: one for messages below warning level
//! (always including info) and one for warnings and errors only.
use anyhow::{Context, Result, anyhow, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the settings file nor the environment give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over the `log_level` setting
pub const LOG_LEVEL_ENV_VAR: &str = "ELMARKETS_LOG_LEVEL";

/// Log file for messages below warning level
const RUN_LOG_FILE_NAME: &str = "elmarkets_info.log";

/// Log file for warnings and errors only
const PROBLEM_LOG_FILE_NAME: &str = "elmarkets_error.log";

const CONSOLE_TIME_FORMAT: &str = "%H:%M:%S";
const FILE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name (case-insensitive), e.g. `warn` or `TRACE`
pub fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    log_level
        .trim()
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {log_level}"))
}

/// The level from [`LOG_LEVEL_ENV_VAR`] if it is set, otherwise the one from the settings file
fn requested_level(log_level_from_settings: &str) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(log_level) => {
            parse_log_level(&log_level).with_context(|| format!("Invalid {LOG_LEVEL_ENV_VAR}"))
        }
        Err(_) => parse_log_level(log_level_from_settings),
    }
}

/// Strip the crate name from a log target, so `elmarkets::simulation` is shown as `simulation`
fn short_target(target: &str) -> &str {
    target
        .strip_prefix(concat!(env!("CARGO_CRATE_NAME"), "::"))
        .unwrap_or(target)
}

fn below_warning(metadata: &Metadata) -> bool {
    metadata.level() > Level::Warn
}

fn write_record<L: Display>(
    out: FormatCallback,
    time_format: &str,
    level: L,
    message: &Arguments,
    record: &Record,
) {
    let timestamp = Local::now().format(time_format);
    let target = short_target(record.target());
    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn plain_format(out: FormatCallback, message: &Arguments, record: &Record) {
    write_record(out, FILE_TIME_FORMAT, record.level(), message, record);
}

/// Console format, with the level coloured if `use_colour` is set
fn console_format(
    use_colour: bool,
    colours: ColoredLevelConfig,
) -> impl Fn(FormatCallback<'_>, &Arguments<'_>, &Record<'_>) + Send + Sync + 'static {
    move |out, message, record| {
        if use_colour {
            let level = colours.color(record.level());
            write_record(out, CONSOLE_TIME_FORMAT, level, message, record);
        } else {
            write_record(out, CONSOLE_TIME_FORMAT, record.level(), message, record);
        }
    }
}

fn console(level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(below_warning)
                .format(console_format(io::stdout().is_terminal(), colours))
                .level(level)
                .chain(io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(console_format(io::stderr().is_terminal(), colours))
                .level(level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        )
}

/// Create (or truncate) a log file in the output folder
fn create_log_file(output_dir: &Path, file_name: &str) -> Result<File> {
    let file_path = output_dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The `log_level` setting, used unless [`LOG_LEVEL_ENV_VAR`] is set
/// * `output_dir` - The results folder to write log files to, if any
pub fn init(log_level_from_settings: &str, output_dir: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let level = requested_level(log_level_from_settings)?;
    let mut dispatch = Dispatch::new().chain(console(level));
    if let Some(output_dir) = output_dir {
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(below_warning)
                    .format(plain_format)
                    .level(level.max(LevelFilter::Info))
                    .chain(create_log_file(output_dir, RUN_LOG_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(plain_format)
                    .level(LevelFilter::Warn)
                    .chain(create_log_file(output_dir, PROBLEM_LOG_FILE_NAME)?),
            );
    }

    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}
