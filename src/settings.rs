//! Program settings, read from `settings.toml` in the elmarkets config folder.
//!
//! Every setting is optional. Command-line flags can switch on `overwrite` and `debug_model` for a
//! single run, and the `ELMARKETS_LOG_LEVEL` environment variable replaces `log_level`.
use crate::get_elmarkets_config_dir;
use crate::input::{input_err_msg, read_toml};
use crate::log::{DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV_VAR, parse_log_level};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Folder under which each model gets its own results folder, unless overridden
const DEFAULT_RESULTS_ROOT: &str = "elmarkets_results";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_results_root() -> PathBuf {
    DEFAULT_RESULTS_ROOT.into()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_elmarkets_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Log level: off, error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Folder in which a results folder is created for each model
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    /// Whether to write into a results folder which already contains files
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to write the prices each scenario was solved with and show HiGHS output
    #[serde(default)]
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            results_root: default_results_root(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Load settings from the config folder, using defaults if there is no settings file
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Load settings from `file_path`, using defaults if the file doesn't exist.
    ///
    /// The log level is checked here so that a typo is reported against the settings file rather
    /// than when the logger starts.
    pub fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level).with_context(|| input_err_msg(file_path))?;

        Ok(settings)
    }

    /// A settings file with every setting commented out and documented, set to its default
    pub fn default_file_contents() -> Result<String> {
        let defaults = toml::Table::try_from(Settings::default())?;

        let mut out = String::new();
        writeln!(out, "# Program settings for elmarkets.")?;
        writeln!(out, "# Uncomment a line to change a setting.")?;
        writeln!(
            out,
            "# The {LOG_LEVEL_ENV_VAR} environment variable takes precedence over log_level."
        )?;
        for (key, value) in &defaults {
            let docs = Settings::get_field_docs(key)
                .ok()
                .with_context(|| format!("Setting {key} has no description"))?;
            writeln!(out)?;
            for line in docs.lines() {
                writeln!(out, "# # {}", line.trim())?;
            }
            writeln!(out, "# {key} = {value}")?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"warn\"\nresults_root = \"/tmp/sweeps\"\n").unwrap();

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".into(),
                results_root: "/tmp/sweeps".into(),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_load_from_path_bad_log_level() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"loud\"").unwrap();

        let err = Settings::load_from_path(&file_path).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Unknown log level: loud");
    }

    #[test]
    fn test_default_file_contents_round_trip() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.contains(LOG_LEVEL_ENV_VAR));
        assert!(contents.contains("# log_level = \"info\""));
        assert!(contents.contains("# results_root = \"elmarkets_results\""));

        // Everything is commented out, so the file loads as the defaults
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, &contents).unwrap();
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );

        // Uncommenting the setting lines gives the defaults too
        let uncommented: String = contents
            .lines()
            .filter(|line| !line.starts_with("# #") && line.contains(" = "))
            .map(|line| format!("{}\n", line.trim_start_matches("# ")))
            .collect();
        assert_eq!(
            toml::from_str::<Settings>(&uncommented).unwrap(),
            Settings::default()
        );
    }
}
