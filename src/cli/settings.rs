//! The `settings` subcommands.
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::env;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it first if needed
    Edit,
    /// Print the path the settings file is read from
    Path,
    /// Print the settings which runs will use, after applying the environment
    Show,
    /// Print a settings file with every setting at its default value
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        let file_path = get_settings_file_path();
        match self {
            Self::Edit => {
                if create_settings_file(&file_path)? {
                    println!("Created settings file: {}", file_path.display());
                }
                println!("Opening settings file for editing: {}", file_path.display());
                edit::edit_file(&file_path)?;

                // Report mistakes now rather than at the next run
                Settings::load_from_path(&file_path)
                    .context("The edited settings file is invalid")?;
            }
            Self::Path => {
                println!("{}", file_path.display());
                if !file_path.is_file() {
                    eprintln!("(no settings file yet, so the defaults are used)");
                }
            }
            Self::Show => {
                let settings = Settings::load_from_path(&file_path)?;
                let env_level = env::var(LOG_LEVEL_ENV_VAR).ok();
                print!("{}", describe_settings(&settings, env_level.as_deref())?);
            }
            Self::DumpDefault => print!("{}", Settings::default_file_contents()?),
        }

        Ok(())
    }
}

/// Write the default settings file if there isn't one.
///
/// # Returns
///
/// Whether a new file was created.
fn create_settings_file(file_path: &Path) -> Result<bool> {
    if file_path.is_file() {
        return Ok(false);
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)?;

    Ok(true)
}

/// The settings as TOML, with the log level replaced by `env_level` if given
fn describe_settings(settings: &Settings, env_level: Option<&str>) -> Result<String> {
    let mut effective = settings.clone();
    if let Some(level) = env_level {
        effective.log_level = level.to_string();
    }

    let mut out = toml::to_string(&effective)?;
    if env_level.is_some() {
        out.push_str(&format!("# log_level is taken from {LOG_LEVEL_ENV_VAR}\n"));
    }

    Ok(out)
}
