//! Error types for the Livros catalog client

use thiserror::Error;

/// Coarse error classes, used by the presentation layer to decide how to
/// report a failure and by the CLI to pick its exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    /// Bad input caught before any network call
    Validation = 2,
    /// The backend rejected the request or could not be reached
    Backend = 3,
    /// Local failure: snapshot store, export files, configuration
    Local = 4,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Conflict(_)
            | AppError::NotFound(_)
            | AppError::Api { .. }
            | AppError::Transport(_) => ErrorKind::Backend,
            AppError::Serialization(_)
            | AppError::Csv(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Storage(_) => ErrorKind::Local,
        }
    }

    /// Text to show the user, without the variant prefix
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg)
            | AppError::Storage(msg) => msg.clone(),
            AppError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
