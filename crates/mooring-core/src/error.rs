use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid chain parameter: {0}")]
    InvalidParameter(String),
}
