use serde::Deserialize;
use std::path::PathBuf;
use std::{fs, path::Path};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = ".config/itr_computation.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Layout file replacing the built-in ITR-3 layout.
    #[serde(default)]
    pub layout: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_filter: default_log_filter(),
            layout: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like `load`, but a missing file just means defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.as_ref().exists() {
            debug!(path = %path.as_ref().display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}
