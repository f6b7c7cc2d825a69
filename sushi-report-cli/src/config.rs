//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
///
/// Every section is optional; command-line flags take precedence over the
/// values found here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Provider table (sushiconfig.csv)
    #[serde(default = "default_providers")]
    pub providers: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
        }
    }
}

fn default_providers() -> PathBuf {
    PathBuf::from("sushiconfig.csv")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for generated CSV and request files (default: current directory)
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestConfig {
    /// COUNTER release requested when the provider row does not name one
    #[serde(default = "default_release")]
    pub release: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            release: default_release(),
        }
    }
}

fn default_release() -> String {
    "4".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Library codes to process; empty means all
    #[serde(default)]
    pub libraries: Vec<String>,
}

impl AppConfig {
    /// Output directory, falling back to the current directory
    pub fn output_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.request.release.trim().is_empty() {
        anyhow::bail!("Invalid config file {:?}: [request] release is empty", path);
    }

    Ok(config)
}
