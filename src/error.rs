use std::path::PathBuf;

/// Channel number outside the 3-bit selector range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("channel {0} out of range, expected 0..=7")]
pub struct InvalidChannel(pub u8);

/// Errors raised by the testbench, its configuration and the CLI around it.
/// The controller itself cannot fail.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("no channels configured")]
    NoChannels,

    #[error("max_ticks {0} is shorter than one transaction ({1} ticks)")]
    TickBudget(u64, u64),

    #[error("timed out after {ticks} ticks waiting for {what}")]
    Timeout {
        what: &'static str,
        ticks: u64,
    },
}
