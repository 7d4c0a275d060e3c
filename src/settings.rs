//! Code for loading program settings.
use crate::log::DEFAULT_LOG_LEVEL;
use crate::solver::{HighsOptions, SolverOptions};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for facilp
#
# Options for the HiGHS solver can be given in a [highs_options] table, e.g.:
#
# [highs_options]
# time_limit = 60.0
# threads = 1
# presolve = \"off\"      # or \"on\", \"choose\"
# solver = \"simplex\"    # or \"ipm\", \"pdlp\", \"choose\"
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to the folder where facilp keeps its configuration
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("facilp");

    path
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Read and parse a TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read file: {}", file_path.display()))?;
    toml::from_str(&toml_str)
        .with_context(|| format!("Could not parse TOML file: {}", file_path.display()))
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether the solver should print its own progress output
    #[serde(default)]
    pub solver_output: bool,
    /// Options passed to the solver
    #[serde(default)]
    pub highs_options: HighsOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            solver_output: false,
            highs_options: HighsOptions::default(),
        }
    }
}

impl Settings {
    /// Read the contents of the settings file from the configuration directory.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back on defaults if there is no file
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .highs_options
            .check()
            .with_context(|| format!("Invalid solver options in {}", file_path.display()))?;

        Ok(settings)
    }

    /// The options to pass to the solver
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            output: self.solver_output,
            highs: self.highs_options.clone(),
        }
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        // Settings object with default values set by serde
        let settings: Settings =
            toml::from_str("").expect("Cannot create settings from empty TOML file");

        // Convert to TOML
        let settings_raw = toml::to_string(&settings).expect("Could not convert settings to TOML");

        // Iterate through the generated TOML, commenting out lines and adding docs
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.split('\n') {
            if let Some(last) = line.find('=') {
                // Add documentation from doc comments
                let field = line[..last].trim();

                // Use doc comment to document parameter. All fields should have doc comments.
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}
