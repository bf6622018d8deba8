//! Error types of the ODM.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdmError>;

#[derive(Debug, Error)]
pub enum OdmError {
    /// A document could not be written to the store.
    #[error("persist error: {0}")]
    Persist(String),

    /// A document could not be read back from the store.
    #[error("retrieve error: {0}")]
    Retrieve(String),

    #[error("no document with id {id} in collection {collection}")]
    NotFound { collection: String, id: String },

    #[error("document has no `_type` field")]
    MissingType,

    #[error("document type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unknown document type: {0}")]
    UnknownType(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("invalid value for field {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("bson encoding error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("bson decoding error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("extended json error: {0}")]
    ExtJson(#[from] bson::extjson::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    #[cfg(feature = "mongodb")]
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl OdmError {
    /// `NotFound` is a specialised retrieve error.
    pub fn is_retrieve_error(&self) -> bool {
        matches!(self, Self::Retrieve(_) | Self::NotFound { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
