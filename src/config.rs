//! Testbench configuration file.
//!
//! ```toml
//! channels = [0, 3, 7]
//! max_ticks = 4096
//! trace = false
//!
//! [response]
//! pattern = 0xd550
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;
use crate::modules::{Channel, Response, TRANSACTION_TICKS};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Peripheral model behavior
    pub response: Response,
    /// Channels exercised by the per-channel scenarios
    pub channels: Vec<Channel>,
    /// Tick budget for any single wait
    pub max_ticks: u64,
    /// Record waveforms
    pub trace: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            response: Response::default(),
            channels: Channel::all().collect(),
            max_ticks: 4096,
            trace: false,
        }
    }
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let s = fs::read_to_string(path).map_err(|source| BenchError::Io {
            path: path.to_owned(),
            source,
        })?;

        BenchConfig::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, BenchError> {
        let config: BenchConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.channels.is_empty() {
            return Err(BenchError::NoChannels);
        }

        if self.max_ticks < TRANSACTION_TICKS {
            return Err(BenchError::TickBudget(self.max_ticks, TRANSACTION_TICKS));
        }

        Ok(())
    }
}
