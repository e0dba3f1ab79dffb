use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Missing value: {0}.")]
    MissingValue(String),
    #[error("Shape mismatch: {0}.")]
    ShapeMismatch(String),
    #[error("Row index {index} out of range for {len} instances.")]
    OutOfRange { index: usize, len: usize },
    #[error("Invalid configuration: {0}.")]
    InvalidConfiguration(String),
    #[error("Least squares solver failed: {0}.")]
    SolverFailure(String),
}
