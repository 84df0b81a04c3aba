/// Errors from fault register operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultError {
    /// The code is outside 1..=64. The register raised `INVALID_CODE` instead.
    #[error("fault code {0} outside 1..=64")]
    InvalidCode(u8),

    /// No poll channel with this index.
    #[error("poll channel {channel} does not exist ({channels} configured)")]
    UnknownChannel { channel: usize, channels: usize },
}

/// Errors detected while building a fault register. These are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The configured layout does not match the compiled 4 x 16-bit register.
    #[error("fault register expects {expected} words, configured for {configured}")]
    WordCount { configured: usize, expected: usize },

    /// A register nobody can poll is useless.
    #[error("fault register needs at least one poll channel")]
    NoChannels,
}

pub type Result<T> = std::result::Result<T, FaultError>;
