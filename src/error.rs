//! Error types and validation messages for the discovery engine

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Invalid sort key: {0}")]
    InvalidSortKey(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Stable error code for machine-readable output
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidDate(_) => "invalid_date",
            AppError::InvalidRange(_) => "invalid_range",
            AppError::InvalidSortKey(_) => "invalid_sort_key",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "config_error",
            AppError::Storage(_) => "storage_error",
            AppError::Io(_) => "io_error",
            AppError::Json(_) => "json_error",
        }
    }
}

/// A non-fatal problem found while resolving user-supplied filter input.
///
/// The offending constraint has already been dealt with (dropped or kept as
/// supplied); the message only tells the caller what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    /// Which input field the message refers to, e.g. `dateRange.start`
    pub field: String,
    /// Error code, see [`AppError::error_code`]
    pub code: String,
    /// Human readable explanation
    pub message: String,
}

impl ValidationMessage {
    pub fn new(field: impl Into<String>, error: &AppError) -> Self {
        Self {
            field: field.into(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::InvalidDate("2024-13-45".to_string());
        assert_eq!(error.to_string(), "Invalid date: 2024-13-45");

        let error = AppError::InvalidSortKey("popularity".to_string());
        assert_eq!(error.to_string(), "Invalid sort key: popularity");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidRange(String::new()).error_code(), "invalid_range");
        assert_eq!(AppError::NotFound(String::new()).error_code(), "not_found");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let error: AppError = io.into();
        assert!(matches!(error, AppError::Io(_)));
        assert_eq!(error.error_code(), "io_error");
    }

    #[test]
    fn test_validation_message_from_error() {
        let error = AppError::InvalidRange("min 10 is greater than max 5".to_string());
        let msg = ValidationMessage::new("participantsRange", &error);
        assert_eq!(msg.field, "participantsRange");
        assert_eq!(msg.code, "invalid_range");
        assert!(msg.message.contains("min 10"));
    }
}
