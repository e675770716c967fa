//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem step that failed while handling a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAction::Read => "read config file",
            FileAction::Write => "write config file",
            FileAction::CreateDir => "create config directory",
        })
    }
}

/// Errors from loading, saving or validating a [`crate::DepgaugeConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file or its directory could not be accessed
    #[error("failed to {action} '{path}': {source}")]
    File {
        action: FileAction,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid TOML for the config schema
    #[error("invalid TOML in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The in-memory config could not be rendered as TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting is present but out of range
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A required setting is empty
    #[error("'{key}' must not be empty")]
    MissingValue { key: String },
}

impl ConfigError {
    fn file(action: FileAction, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileAction::Read, path, source)
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileAction::Write, path, source)
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileAction::CreateDir, path, source)
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing_value(key: impl Into<String>) -> Self {
        Self::MissingValue { key: key.into() }
    }

    /// Dotted key of the offending setting, for validation errors.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { key, .. } | Self::MissingValue { key } => Some(key),
            _ => None,
        }
    }
}
