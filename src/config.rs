use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Forwards allowed per packet before it is declared stuck
    pub max_hops: usize,
    /// Relax the table at every neighbour after a router's own table changed
    pub share_updates: bool,
    /// Run relaxation to a fixed point before the first packet
    pub converge_on_start: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_hops: 64,
            share_updates: true,
            converge_on_start: false,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
