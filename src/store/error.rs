use std::fmt;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure taxonomy for repository operations. Route handlers convert
/// each variant to its wire status; nothing propagates uncaught.
#[derive(Debug)]
pub enum StoreError {
    /// Missing or malformed required fields; one message per field.
    Validation(Vec<String>),
    /// A uniqueness constraint would be violated.
    Duplicate(String),
    /// A classroom/location reference points at nothing.
    ReferenceNotFound(String),
    /// The target of a by-id operation is absent or the id is malformed.
    NotFound(&'static str),
    Db(rusqlite::Error),
    /// A non-database failure the caller cannot act on.
    Internal(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(msgs) => write!(f, "validation failed: {}", msgs.join("; ")),
            StoreError::Duplicate(msg) => write!(f, "{}", msg),
            StoreError::ReferenceNotFound(msg) => write!(f, "{}", msg),
            StoreError::NotFound(entity) => write!(f, "{} not found", entity),
            StoreError::Db(e) => write!(f, "database error: {}", e),
            StoreError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Db(e)
    }
}
