use std::io;

/// Errors that can occur while reading or mutating a project tree
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Project graph error: {0}")]
    GraphError(String),

    #[error("Property list error: {0}")]
    PlistError(#[from] plist::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::ParseError {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn graph(message: impl Into<String>) -> Self {
        Error::GraphError(message.into())
    }
}

/// Result type alias for widget-injector operations
pub type Result<T> = std::result::Result<T, Error>;
