//! Error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// Settings could not be loaded or are out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by an optimization run.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Input data rejected before the search started.
    #[error("Invalid input: {}", join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    /// Run settings rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An internal invariant broke during the run. The run is aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Vec<ValidationError>> for RosterError {
    fn from(errors: Vec<ValidationError>) -> Self {
        RosterError::InvalidInput(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for rostering operations.
pub type Result<T> = std::result::Result<T, RosterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_invalid_input_display() {
        let err = RosterError::from(vec![
            ValidationError::new(ValidationErrorKind::EmptyDateRange, "end before start"),
            ValidationError::new(ValidationErrorKind::DuplicateId, "Duplicate nurse ID: N1"),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid input:"));
        assert!(msg.contains("end before start; Duplicate nurse ID: N1"));
    }

    #[test]
    fn test_config_conversion() {
        let err: RosterError = ConfigError::Invalid("bad".into()).into();
        assert!(matches!(err, RosterError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: Invalid configuration: bad");
    }
}
