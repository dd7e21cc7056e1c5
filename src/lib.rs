//! Common functionality for elmarkets.
//!
//! elmarkets builds linear-programming models of a small energy district (or a single power plant)
//! which sells surplus electricity into four markets: day-ahead, intraday, future base and future
//! peak. Each market has its own rules about which dispatch steps must share a single traded
//! quantity, and these rules are encoded as equality constraints on the model's flow variables.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod boundary;
pub mod cli;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod market;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod price;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod time;
pub mod timeline;
pub mod topology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// This will be something like: `~/.config/elmarkets`
pub fn get_elmarkets_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir present. This likely only happens on headless systems.
        return PathBuf::new();
    };

    config_dir.push("elmarkets");
    config_dir
}
