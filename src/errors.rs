// src/errors.rs - Error taxonomy for the reconciliation engine
use thiserror::Error;

/// Failures raised by a catalog store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store rejected commit: {0}")]
    Rejected(String),
    /// A document read by the transaction changed before its commit.
    #[error("write conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed request or missing required id. Raised before any work starts.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    /// Self-merge and similar requests that can never succeed.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A dish whose parent discovered venue has no production venue yet.
    #[error("venue not yet promoted: {0}")]
    VenueNotPromoted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    pub fn venue_not_found(id: &str) -> Self {
        ReconcileError::NotFound {
            kind: "venue",
            id: id.to_string(),
        }
    }

    /// HTTP-style status the request surface reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ReconcileError::Validation(_) => 400,
            ReconcileError::NotFound { .. } => 404,
            ReconcileError::InvalidState(_) | ReconcileError::VenueNotPromoted(_) => 409,
            ReconcileError::Store(StoreError::Conflict(_)) => 409,
            ReconcileError::Store(_) => 500,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
