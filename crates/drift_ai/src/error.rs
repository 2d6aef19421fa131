//! Error types for the bot core

use thiserror::Error;

/// Bot core errors
///
/// None of these surface from a per-tick update; they come from startup
/// (profile loading, rule construction) and from the navigation cache.
#[derive(Debug, Error)]
pub enum AiError {
    /// A rule or lookup named a category that was never loaded
    #[error("Unknown fuzzy category: {0}")]
    UnknownCategory(String),

    /// A rule named a bin its category does not have
    #[error("Unknown bin '{bin}' in fuzzy category '{category}'")]
    UnknownBin { category: String, bin: String },

    /// The profile has no bins for a category the bots need
    #[error("No configuration for fuzzy category '{category}' in section '{section}'")]
    MissingCategory { section: String, category: String },

    /// A state machine was asked for a state it does not hold
    #[error("No behavior state registered as {0}")]
    MissingState(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Profile or config could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Cache file I/O failed
    #[error("Navigation cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    /// Cache file could not be encoded or decoded
    #[error("Navigation cache encoding error: {0}")]
    CacheEncoding(#[from] bincode::Error),

    /// Cache written by an incompatible format version
    #[error("Navigation cache version mismatch: expected {expected}, got {got}")]
    CacheVersion { expected: u32, got: u32 },

    /// Cache does not match the map being loaded
    #[error("Navigation cache mismatch: {0}")]
    CacheMismatch(String),
}

/// Result type for bot core operations
pub type Result<T> = std::result::Result<T, AiError>;
