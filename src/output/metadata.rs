//! The `metadata.toml` file, which records what was run and with which build of elmarkets.
use crate::model::Model;
use anyhow::Result;
use chrono::Local;
use log::warn;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

const METADATA_FILE_NAME: &str = "metadata.toml";

/// Build information generated by `build.rs`
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    build: BuildMetadata,
    platform: Option<PlatformMetadata>,
}

/// What was simulated
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model directory
    model_path: &'a Path,
    /// The subcommand, e.g. `run` or `power-plants`
    command: &'a str,
    year: u32,
    days: u32,
    /// The number of 15-minute steps in each solved problem
    dispatch_steps: usize,
    /// Names of the scenarios in the sweep
    scenarios: Vec<String>,
    /// Power plants which were compared
    power_plants: Vec<String>,
    /// Local time the run started, in RFC 3339 format
    started: String,
}

impl<'a> RunMetadata<'a> {
    fn new(model: &'a Model, command: &'a str) -> Self {
        let params = &model.parameters;
        Self {
            model_path: &model.model_path,
            command,
            year: params.year,
            days: params.days,
            dispatch_steps: model.dispatch_steps(),
            scenarios: params.scenarios.iter().map(ToString::to_string).collect(),
            power_plants: params.power_plants.iter().map(ToString::to_string).collect(),
            started: Local::now().to_rfc3339(),
        }
    }
}

/// The build of elmarkets which produced the results
#[derive(Serialize)]
struct BuildMetadata {
    /// Package name and version, e.g. `elmarkets 0.1.0`
    version: String,
    /// Short git commit hash, suffixed with `-dirty` for uncommitted changes
    commit: String,
    /// `debug` or `release`
    profile: &'static str,
    target: &'static str,
    rustc: &'static str,
    built_utc: &'static str,
}

impl BuildMetadata {
    fn current() -> Self {
        let commit = match (
            built_info::GIT_COMMIT_HASH_SHORT,
            built_info::GIT_DIRTY,
        ) {
            (Some(hash), Some(true)) => format!("{hash}-dirty"),
            (Some(hash), _) => hash.to_string(),
            (None, _) => "unknown".to_string(),
        };

        Self {
            version: format!("{} {}", built_info::PKG_NAME, built_info::PKG_VERSION),
            commit,
            profile: built_info::PROFILE,
            target: built_info::TARGET,
            rustc: built_info::RUSTC_VERSION,
            built_utc: built_info::BUILT_TIME_UTC,
        }
    }
}

/// The machine the run happened on
#[derive(Serialize)]
struct PlatformMetadata {
    os: String,
    release: String,
    machine: String,
    hostname: String,
}

impl PlatformMetadata {
    /// Query the platform, or `None` if it can't be determined
    fn current() -> Option<Self> {
        let info = match PlatformInfo::new() {
            Ok(info) => info,
            Err(err) => {
                warn!("Platform information will not be saved: {err}");
                return None;
            }
        };

        Some(Self {
            os: info.osname().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            hostname: info.nodename().to_string_lossy().into(),
        })
    }
}

/// Write `metadata.toml` to the output folder for a run of `command` on `model`
pub fn write_metadata(output_path: &Path, model: &Model, command: &str) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model, command),
        build: BuildMetadata::current(),
        platform: PlatformMetadata::current(),
    };
    fs::write(
        output_path.join(METADATA_FILE_NAME),
        toml::to_string(&metadata)?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_model_dir;
    use tempfile::tempdir;

    #[test]
    fn test_write_metadata() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path(), 1);
        let model = Model::from_path(model_dir.path()).unwrap();

        let output_dir = tempdir().unwrap();
        write_metadata(output_dir.path(), &model, "run").unwrap();

        let contents = fs::read_to_string(output_dir.path().join(METADATA_FILE_NAME)).unwrap();
        let metadata: toml::Table = toml::from_str(&contents).unwrap();
        let run = metadata["run"].as_table().unwrap();
        assert_eq!(run["command"].as_str(), Some("run"));
        assert_eq!(run["year"].as_integer(), Some(2020));
        assert_eq!(run["dispatch_steps"].as_integer(), Some(96));
        let scenarios: Vec<_> = run["scenarios"]
            .as_array()
            .unwrap()
            .iter()
            .map(|name| name.as_str().unwrap())
            .collect();
        assert_eq!(scenarios, ["baseline", "day_ahead_x2"]);
        assert_eq!(
            metadata["build"]["version"].as_str().unwrap(),
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        );
    }
}
