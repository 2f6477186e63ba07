//! Error types for the argus pricing engine

use thiserror::Error;

/// Result type alias for argus operations
pub type Result<T> = std::result::Result<T, ArgusError>;

/// Main error type for the pricing engine
#[derive(Error, Debug)]
pub enum ArgusError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<polars::error::PolarsError> for ArgusError {
    fn from(err: polars::error::PolarsError) -> Self {
        ArgusError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ArgusError {
    fn from(err: serde_json::Error) -> Self {
        ArgusError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArgusError::DataError("bad column".to_string());
        assert_eq!(err.to_string(), "Data error: bad column");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ArgusError = io_err.into();
        assert!(matches!(err, ArgusError::IoError(_)));
    }

    #[test]
    fn test_shape_error_display() {
        let err = ArgusError::ShapeError {
            expected: "y length = 10".to_string(),
            actual: "y length = 8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid shape: expected y length = 10, got y length = 8"
        );
    }
}
