use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("Inconsistent traceback: {0}")]
    InconsistentTraceback(String),
}

pub type AlignResult<T> = std::result::Result<T, AlignError>;

pub(crate) fn invalid<T>(msg: impl Into<String>) -> AlignResult<T> {
    Err(AlignError::InvalidParameter(msg.into()))
}
