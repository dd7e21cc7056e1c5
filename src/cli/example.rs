//! The example models bundled into the binary and the `example` subcommands.
use super::{RunOpts, handle_run_command};
use crate::model::parameters::ModelParameters;
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

static EXAMPLES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/demos");

const README_FILE_NAME: &str = "README.txt";
const MODEL_FILE_NAME: &str = "model.toml";

/// The available subcommands for managing example models.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List the examples with the year and number of days each one simulates.
    List,
    /// Describe an example and the scenarios it runs.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Copy an example model to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder (defaults to the example's name).
        new_path: Option<PathBuf>,
    },
    /// Run the scenario sweep for an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => {
                for name in example_names() {
                    let params = example_parameters(name)?;
                    println!("{name}: {} days of {}", params.days, params.year);
                }
            }
            Self::Info { name } => println!("{}", describe_example(&name)?),
            Self::Extract { name, new_path } => {
                let dest = new_path.unwrap_or_else(|| PathBuf::from(&name));
                extract_example(&name, &dest)?;
            }
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// Names of the bundled examples
pub fn example_names() -> impl Iterator<Item = &'static str> {
    EXAMPLES_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

fn get_example(name: &str) -> Result<&'static Dir<'static>> {
    EXAMPLES_DIR.get_dir(name).with_context(|| {
        format!(
            "No example called {name}. Available examples: {}",
            example_names().join(", ")
        )
    })
}

/// The text of one of an example's files
fn example_file(name: &str, file_name: &str) -> Result<&'static str> {
    let example = get_example(name)?;
    example
        .get_file(example.path().join(file_name))
        .and_then(|file| file.contents_utf8())
        .with_context(|| format!("Example {name} has no readable {file_name}"))
}

fn example_parameters(name: &str) -> Result<ModelParameters> {
    ModelParameters::from_toml_str(example_file(name, MODEL_FILE_NAME)?)
        .with_context(|| format!("Invalid {MODEL_FILE_NAME} in example {name}"))
}

/// The example's README followed by a summary of what it simulates
fn describe_example(name: &str) -> Result<String> {
    let readme = example_file(name, README_FILE_NAME)?;
    let params = example_parameters(name)?;
    let plural = if params.days == 1 { "" } else { "s" };

    Ok(format!(
        "{}\n\nYear: {} ({} day{plural})\nScenarios: {}\nPower plants: {}",
        readme.trim_end(),
        params.year,
        params.days,
        params.scenarios.iter().join(", "),
        params.power_plants.iter().join(", ")
    ))
}

/// Copy the files of an example into a new directory
pub fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let example = get_example(name)?;
    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir(new_path)?;
    for entry in example.entries() {
        let DirEntry::File(file) = entry else {
            bail!("Example {name} contains a subdirectory, which is not supported");
        };
        let file_name = file
            .path()
            .file_name()
            .with_context(|| format!("Invalid file path in example {name}"))?;
        fs::write(new_path.join(file_name), file.contents())?;
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The example is extracted to a temporary directory, so results go to a folder named after the
/// example unless `opts` gives one.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;
    handle_run_command(&model_path, &[], opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::model::Model;
    use tempfile::tempdir;

    #[test]
    fn test_example_names() {
        let mut names: Vec<_> = example_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["district", "winter_day"]);
    }

    #[test]
    fn test_extract_examples_load() {
        for name in example_names() {
            let dir = tempdir().unwrap();
            let model_path = dir.path().join(name);
            extract_example(name, &model_path).unwrap();
            Model::from_path(&model_path).unwrap();

            // Extracting over an existing folder is an error
            assert!(extract_example(name, &model_path).is_err());
        }
    }

    #[test]
    fn test_describe_example() {
        let description = describe_example("winter_day").unwrap();
        assert!(description.starts_with("# Winter day"));
        assert!(description.contains("Year: 2021 (1 day)"));
        assert!(description.contains("Scenarios: baseline, future_peak_x3"));
        assert!(description.contains("Power plants: coal, gas, wind"));
    }

    #[test]
    fn test_unknown_example() {
        let dir = tempdir().unwrap();
        let err = extract_example("summer", &dir.path().join("summer")).unwrap_err();
        assert!(err.to_string().starts_with("No example called summer."));
        assert_error!(
            describe_example("summer").map(|_| ()),
            format!(
                "No example called summer. Available examples: {}",
                example_names().join(", ")
            )
        );
    }
}
