use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    /// No trained model exists for the requested region.
    #[error("No trained model found for region: {0}")]
    NotTrained(String),

    /// The model blob was missing, corrupt, or of an unknown format version.
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
