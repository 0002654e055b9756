// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VirtualModuleError {
    /// The generator behind a virtual module broke its contract: it could not
    /// be imported, it failed, or it returned no loader.
    #[error("[{plugin}] {message} (module: {id})")]
    Contract {
        plugin: String,
        message: String,
        id: String,
    },

    #[error("Watch error: {0}")]
    Watch(String),

    /// Error raised by a loader's content callback, passed through unchanged.
    #[error(transparent)]
    Load(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VirtualModuleError {
    pub fn contract(
        plugin: impl Into<String>,
        message: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        VirtualModuleError::Contract {
            plugin: plugin.into(),
            message: message.into(),
            id: id.into(),
        }
    }

    /// True for errors that indicate a misbehaving generator rather than an
    /// environment problem.
    pub fn is_contract(&self) -> bool {
        matches!(self, VirtualModuleError::Contract { .. })
    }
}

impl From<notify::Error> for VirtualModuleError {
    fn from(err: notify::Error) -> Self {
        VirtualModuleError::Watch(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, VirtualModuleError>;
