use thiserror::Error;
use validator::ValidationErrors;

/// Application-wide error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let mut errors: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "Invalid value".to_string())
                    )
                })
            })
            .collect();
        // field_errors() is backed by a HashMap
        errors.sort();
        AppError::Validation(errors.join(", "))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            AppError::Transport(format!("HTTP {}: {}", status.as_u16(), err))
        } else if err.is_decode() {
            AppError::Transport(format!("Malformed response: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Helper type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
