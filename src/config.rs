use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Server-wide configuration, loaded from a YAML file with sensible
/// defaults for everything. The `LISTEN` environment variable overrides the
/// configured listen address.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    #[serde(default = "default_doc_root")]
    pub doc_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            workers: default_workers(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            doc_root: default_doc_root(),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Config::default()
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            config.server.listen_addr = listen_addr;
        }
        Ok(config)
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_read_buffer_size() -> usize {
    8 * 1024
}

fn default_doc_root() -> PathBuf {
    PathBuf::from("./webapp")
}
