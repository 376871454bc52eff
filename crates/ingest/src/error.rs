use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row parsed as CSV but violates the usage-table contract.
    #[error("Invalid row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

impl From<IngestError> for aquarisk_core::RiskError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Io(e) => aquarisk_core::RiskError::Io(e),
            other => aquarisk_core::RiskError::InvalidInput(other.to_string()),
        }
    }
}
