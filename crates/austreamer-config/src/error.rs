//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, decoding or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Config block does not start with the head magic
    #[error("bad head magic {0:#010x}")]
    BadHeadMagic(u32),

    /// Config block does not end with the tail magic
    #[error("bad tail magic {0:#010x}")]
    BadTailMagic(u32),

    /// Input shorter than its headers announce
    #[error("truncated input: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Record size other than the fixed sub-block size
    #[error("unsupported record size {0}")]
    RecordSize(usize),

    /// Block version with an unknown major number
    #[error("unsupported block version {0:#06x}")]
    UnsupportedVersion(u16),

    /// Sub-block id not in the id table
    #[error("unknown sub-block {0:#06x}")]
    UnknownSubBlock(u16),

    /// A check callback refused the new value
    #[error("sub-block {0:#06x} rejected")]
    Rejected(u16),

    /// Structurally invalid payload
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// What was being decoded.
        what: &'static str,
        /// Why it was refused.
        reason: String,
    },

    /// Unknown pipeline event type name
    #[error("unknown event type: {0}")]
    UnknownEvent(String),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-input error.
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Malformed {
            what,
            reason: reason.into(),
        }
    }

    /// Fails with [`ConfigError::Truncated`] unless `actual >= expected`.
    pub(crate) fn need(expected: usize, actual: usize) -> Result<(), Self> {
        if actual < expected {
            Err(ConfigError::Truncated { expected, actual })
        } else {
            Ok(())
        }
    }
}
