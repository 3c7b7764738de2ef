//! Runtime configuration for the `gpu-meminfo` command.
//!
//! Settings come from an optional JSON file; command-line flags override them.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::gpu::memory::DeviceId;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gpu-meminfo",
    about = "Report free and total memory of a GPU device",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "gpu-meminfo.json")]
    pub config: PathBuf,

    /// Device to query (overrides the config file).
    #[arg(short, long)]
    pub device: Option<DeviceId>,

    /// Output format (overrides the config file).
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device queried when `--device` is not given.
    pub device_id: DeviceId,

    /// How the report is printed.
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(device_id) = cli.device {
            self.device_id = device_id;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        self
    }
}
