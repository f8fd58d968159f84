use crate::backup::ImportError;
use crate::catalog::CatalogError;
use crate::mutations::Rejection;
use crate::sync::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write census file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read census file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize census data: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize census data: {0}")]
    Deserialization(serde_json::Error),
    #[error("storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("bed catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("import rejected: {0}")]
    Import(#[from] ImportError),
    #[error("remote store error: {0}")]
    Remote(#[from] SyncError),
    #[error("change rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("no record exists for {0}")]
    RecordNotFound(chrono::NaiveDate),
    #[error("no earlier record exists before {0}")]
    NoPreviousRecord(chrono::NaiveDate),
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

pub type CensusResult<T> = std::result::Result<T, CensusError>;
