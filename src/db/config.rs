use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::cache::DEFAULT_CAPACITY;
use crate::types::{GraphError, Result};

/// Hard upper bound on partial graphs per complete graph.
pub const MAX_PARTIAL_GRAPHS: u32 = 500;

/// Options of one partial graph host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the record files; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Initial bucket count of each object cache table.
    pub initial_cache_capacity: usize,
    /// Kappa of top-level elements and the level of partial graphs.
    pub top_level_kappa: i32,
    /// Partial graphs the complete graph host hands out, at most
    /// [`MAX_PARTIAL_GRAPHS`].
    pub max_partial_graphs: u32,
    /// Address other hosts reach this partial graph under.
    pub listen_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            initial_cache_capacity: DEFAULT_CAPACITY,
            top_level_kappa: 16,
            max_partial_graphs: MAX_PARTIAL_GRAPHS,
            listen_address: None,
        }
    }
}

impl Config {
    /// In-memory host; nothing is written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Host persisting into `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the initial cache bucket count.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.initial_cache_capacity = capacity;
        self
    }

    /// Sets the kappa of top-level elements.
    pub fn with_top_level_kappa(mut self, kappa: i32) -> Self {
        self.top_level_kappa = kappa;
        self
    }

    /// Sets the partial graph limit.
    pub fn with_max_partial_graphs(mut self, max: u32) -> Self {
        self.max_partial_graphs = max;
        self
    }

    /// Sets the address this host is registered under.
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = Some(address.into());
        self
    }

    /// Parses a TOML config document.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(src).map_err(|err| GraphError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Rejects option combinations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_partial_graphs == 0 || self.max_partial_graphs > MAX_PARTIAL_GRAPHS {
            return Err(GraphError::Config(format!(
                "max_partial_graphs must be within 1..={MAX_PARTIAL_GRAPHS}, got {}",
                self.max_partial_graphs
            )));
        }
        if self.initial_cache_capacity == 0 {
            return Err(GraphError::Config(
                "initial_cache_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}
