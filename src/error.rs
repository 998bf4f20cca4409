//! Error types for Ovation

use thiserror::Error;

/// Main error type for Ovation
#[derive(Error, Debug)]
pub enum OvationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Interruption catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog manifest: {0}")]
    ReadManifest(String),

    #[error("Failed to parse catalog manifest: {0}")]
    ParseManifest(String),
}

/// Stage assembly errors
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Loudness input errors
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read loudness script: {0}")]
    ReadScript(String),

    #[error("Invalid loudness sample on line {line}: {value}")]
    InvalidSample { line: usize, value: String },
}

/// Result type alias for Ovation operations
pub type Result<T> = std::result::Result<T, OvationError>;
