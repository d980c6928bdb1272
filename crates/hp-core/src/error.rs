//! Error types for huprobe

use thiserror::Error;

/// Result alias used throughout huprobe
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid or could not be located
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// The named address space is not provided by the target
    #[error("unknown address space: {0}")]
    UnknownAddressSpace(String),

    /// A write to a read-only address space was requested
    #[error("address space {0} is read-only")]
    ReadOnlyAddressSpace(String),

    /// Register id is not part of the register group
    #[error("unknown register id 0x{id:04x} in group {group}")]
    UnknownRegister { group: &'static str, id: u32 },

    /// ROM image cannot be mapped
    #[error("invalid ROM image: {0}")]
    InvalidRom(String),
}
