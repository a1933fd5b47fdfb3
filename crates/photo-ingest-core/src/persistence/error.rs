use rusqlite;

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence-specific errors
#[derive(Debug)]
pub enum PersistenceError {
    /// SQLite errors
    Database(rusqlite::Error),

    /// A record with the same content hash already exists
    Duplicate(String),

    /// No record with the requested key
    NotFound(String),

    /// Errors during database initialization
    Initialization(String),

    /// General errors
    Other(String),
}

impl PersistenceError {
    /// Whether this error is the unique-hash constraint rejecting an insert
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            // Only a unique index rejection means the content is already stored
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                PersistenceError::Duplicate(msg.unwrap_or_else(|| e.to_string()))
            }
            other => PersistenceError::Database(other),
        }
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(err) => write!(f, "Database error: {}", err),
            Self::Duplicate(msg) => write!(f, "Duplicate entry: {}", msg),
            Self::NotFound(msg) => write!(f, "Entry not found: {}", msg),
            Self::Initialization(msg) => write!(f, "Database initialization error: {}", msg),
            Self::Other(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}
