//! Storage backends.
//!
//! A [`Backend`] is a connection to a database server (the client), a
//! [`Store`] is one database of that server. Documents are exchanged as
//! plain bson documents, the ODM layer never talks to a driver directly.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::error::{OdmError, Result};

#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(feature = "sqlite")]
pub mod sql;

/// Options of a find operation.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl FindOptions {
    pub fn limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new document, assigning a fresh ObjectId when it has no
    /// `_id`. Returns the id of the document.
    async fn insert(&self, collection: &str, document: Document) -> Result<Bson>;

    /// Inserts the document, or replaces the document with the same `_id`.
    async fn upsert(&self, collection: &str, document: Document) -> Result<Bson>;

    /// Replaces the first document matching `filter`. Returns the id of the
    /// replaced document, `None` when nothing matched.
    async fn replace_one(&self, collection: &str, filter: &Document, document: Document)
        -> Result<Option<Bson>>;

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64>;

    async fn delete(&self, collection: &str, filter: &Document) -> Result<u64>;

    async fn create_collection(&self, collection: &str) -> Result<()>;

    async fn drop_collection(&self, collection: &str) -> Result<()>;

    async fn collection_names(&self) -> Result<Vec<String>>;

    async fn drop_database(&self) -> Result<()>;
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn database(&self, name: &str) -> Arc<dyn Store>;

    async fn drop_database(&self, name: &str) -> Result<()>;

    async fn close(&self);
}

/// Opens the backend matching the scheme of `url`.
pub async fn open(url: &str) -> Result<Arc<dyn Backend>> {
    #[cfg(feature = "sqlite")]
    if url.starts_with("sqlite:") {
        return Ok(Arc::new(sql::SqlBackend::connect(url).await?));
    }

    #[cfg(feature = "mongodb")]
    if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
        return Ok(Arc::new(mongo::MongoBackend::connect(url).await?));
    }

    Err(OdmError::UnsupportedUrl(url.to_string()))
}
