use thiserror::Error;

#[derive(Error, Debug)]
pub enum MerkleTreeError {
    #[error("Merkle Tree Validation Error: {0}")]
    MerkleValidationError(String),
    #[error("Merkle Root Error")]
    MerkleRootError,
    #[error("invalid token amount: {0}")]
    InvalidAmount(String),
    #[error("invalid hash encoding: {0}")]
    InvalidHash(String),
    #[error("io Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serde Error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Csv Error: {0}")]
    CsvError(#[from] csv::Error),
}
