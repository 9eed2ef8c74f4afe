//! Startup configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables, then command-line flags. The result is immutable
//! for the life of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::http::encoding::Encoding;

/// Command-line flags.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "wicket")]
#[command(about = "Minimal keep-alive HTTP/1.1 server with echo and file routes", long_about = None)]
pub struct Cli {
    /// Base directory served by /files/{name}
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Address to listen on (overrides LISTEN)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Close connections idle for this many seconds
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Cap on concurrently served connections
    #[arg(long)]
    pub max_connections: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub directory: Option<PathBuf>,
    pub read_buffer_size: usize,
    pub max_request_bytes: usize,
    pub max_file_bytes: u64,
    pub read_timeout_secs: Option<u64>,
    pub max_connections: Option<usize>,
    pub supported_encodings: Vec<Encoding>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4221".to_string(),
            directory: None,
            read_buffer_size: 4096,
            max_request_bytes: 8 * 1024 * 1024,
            max_file_bytes: 64 * 1024 * 1024,
            read_timeout_secs: None,
            max_connections: None,
            supported_encodings: vec![Encoding::Gzip],
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment and `cli`.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load_with(cli, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup.
    pub fn load_with<F>(cli: &Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = env("LISTEN") {
            cfg.listen_addr = addr;
        }
        if let Some(dir) = env("WICKET_DIRECTORY") {
            cfg.directory = Some(PathBuf::from(dir));
        }

        if let Some(addr) = &cli.listen {
            cfg.listen_addr = addr.clone();
        }
        if let Some(dir) = &cli.directory {
            cfg.directory = Some(dir.clone());
        }
        if let Some(secs) = cli.read_timeout {
            cfg.read_timeout_secs = Some(secs);
        }
        if let Some(max) = cli.max_connections {
            cfg.max_connections = Some(max);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Invalid("read_buffer_size must be greater than zero"));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid("max_request_bytes must be greater than zero"));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("max_file_bytes must be greater than zero"));
        }
        if self.read_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("read_timeout_secs must be greater than zero"));
        }
        if self.max_connections == Some(0) {
            return Err(ConfigError::Invalid("max_connections must be greater than zero"));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}
