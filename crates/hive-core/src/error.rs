//! Error Types
//!
//! Only configuration problems and faulted ticks are errors. Stale references,
//! degenerate vectors and out-of-range grid lookups are handled where they
//! occur by clearing, skipping or clamping.

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the simulation to its caller
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// A pass panicked. Flushes that completed before the fault stay applied.
    #[error("Tick {tick} faulted: {message}")]
    PassFault { tick: u64, message: String },
    #[error("Stats output error: {0}")]
    Output(#[from] std::io::Error),
}
