use std::fmt;

use strata_store::StoreError;

#[derive(Debug)]
pub enum DbError {
    Store(StoreError),
    /// Schema record missing or unparseable.
    Schema(String),
    /// Primary lookup returned nothing; carries the path.
    NotFound(String),
    /// Write-path failure, annotated with the document it concerned.
    Fetch {
        path: String,
        collection: String,
        source: Box<DbError>,
    },
    /// Hydrator failure during a query, annotated the same way.
    Query {
        path: String,
        collection: String,
        source: Box<DbError>,
    },
    /// No index definitions exist for the requested collection.
    MissingIndex(String),
    /// A union-template document without a `_template` discriminator.
    Template(String),
    /// A value the key codec refuses (reserved separator byte, negative
    /// or fractional number under the default pad).
    InvalidValue(String),
    Serialization(String),
    Bridge(String),
    InvalidCursor(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Store(e) => write!(f, "store error: {e}"),
            DbError::Schema(msg) => write!(f, "schema error: {msg}"),
            DbError::NotFound(path) => write!(f, "not found: {path}"),
            DbError::Fetch {
                path,
                collection,
                source,
            } => write!(f, "write failed for {path} in collection {collection}: {source}"),
            DbError::Query {
                path,
                collection,
                source,
            } => write!(f, "query hydration failed for {path} in collection {collection}: {source}"),
            DbError::MissingIndex(collection) => {
                write!(f, "no index definitions for collection: {collection}")
            }
            DbError::Template(path) => {
                write!(f, "document {path} is missing a _template discriminator")
            }
            DbError::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            DbError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            DbError::Bridge(msg) => write!(f, "bridge error: {msg}"),
            DbError::InvalidCursor(msg) => write!(f, "invalid cursor: {msg}"),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::Store(e) => Some(e),
            DbError::Fetch { source, .. } | DbError::Query { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<StoreError> for DbError {
    fn from(e: StoreError) -> Self {
        DbError::Store(e)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Bridge(e.to_string())
    }
}
