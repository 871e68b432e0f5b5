//! Run configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) describes the standard layout with a window of 10.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::counter::CountingStrategy;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub counting: CountingConfig,
}

/// Input and output artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Line-delimited vehicle records
    pub corpus: PathBuf,
    /// Way id -> node list table from graph construction
    pub ways: PathBuf,
    /// Node pair -> way id table
    pub sub_edges: PathBuf,
    pub index: PathBuf,
    pub matrix: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("jsonFiles/bus_history.json"),
            ways: PathBuf::from("output/total_edges"),
            sub_edges: PathBuf::from("output/total_sub_edges"),
            index: PathBuf::from("output/edge_index.bin"),
            matrix: PathBuf::from("output/inter_edges_matrix.bin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Windowed,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CountingConfig {
    pub strategy: StrategyKind,
    /// Maximum hop distance between the two edges of a counted pair
    pub window: usize,
    /// Worker threads, 0 = one per CPU
    pub threads: usize,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Windowed,
            window: CountingStrategy::DEFAULT_WINDOW,
            threads: 0,
        }
    }
}

impl CountingConfig {
    pub fn strategy(&self) -> CountingStrategy {
        match self.strategy {
            StrategyKind::Windowed => CountingStrategy::Windowed {
                window: self.window,
            },
            StrategyKind::Exact => CountingStrategy::Exact,
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::MissingInput {
                path: path.to_path_buf(),
            },
            _ => Error::Io(err),
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.counting.strategy == StrategyKind::Windowed && self.counting.window == 0 {
            return Err(Error::InvalidConfig(
                "counting.window must be at least 1 for the windowed strategy".to_string(),
            ));
        }
        Ok(())
    }
}
