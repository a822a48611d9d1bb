use access_catalog::CatalogError;
use access_ledger::LedgerError;
use access_types::{ContextError, MissionId};
use thiserror::Error;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("mission not found: {0}")]
    MissionNotFound(MissionId),

    #[error("invalid user context: {0}")]
    InvalidUserContext(#[from] ContextError),

    #[error("catalog error: {0}")]
    Catalog(CatalogError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The caller lacks the tier required for the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("mission not unlocked: {0}")]
    NotUnlocked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AccessError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(mission_id) => AccessError::MissionNotFound(mission_id),
            other => AccessError::Catalog(other),
        }
    }
}

/// Result type for orchestrator operations.
pub type AccessResult<T> = Result<T, AccessError>;
