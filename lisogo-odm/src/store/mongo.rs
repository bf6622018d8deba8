//! Native mongodb store, enabled with the `mongodb` feature.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};

use super::{Backend, FindOptions, Store};
use crate::error::{OdmError, Result};
use crate::utils::display_id;

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoBackend {
    client: mongodb::Client,
}

impl MongoBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = mongodb::Client::with_uri_str(url).await?;
        tracing::debug!(url, "connected to mongodb");
        Ok(Self { client })
    }
}

#[async_trait]
impl Backend for MongoBackend {
    fn database(&self, name: &str) -> Arc<dyn Store> {
        Arc::new(MongoStore {
            database: self.client.database(name),
        })
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        self.client.database(name).drop().await?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

pub struct MongoStore {
    database: mongodb::Database,
}

fn write_error(error: mongodb::error::Error, id: &Bson) -> OdmError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            OdmError::DuplicateKey(display_id(id))
        }
        _ => OdmError::Mongo(error),
    }
}

impl MongoStore {
    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert(&self, collection: &str, document: Document) -> Result<Bson> {
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| write_error(e, &id))?;
        Ok(result.inserted_id)
    }

    async fn upsert(&self, collection: &str, document: Document) -> Result<Bson> {
        let Some(id) = document.get("_id").cloned() else {
            return self.insert(collection, document).await;
        };

        self.collection(collection)
            .replace_one(doc! { "_id": id.clone() }, document)
            .upsert(true)
            .await
            .map_err(|e| write_error(e, &id))?;
        Ok(id)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Document,
        document: Document,
    ) -> Result<Option<Bson>> {
        let replaced = self
            .collection(collection)
            .find_one_and_replace(filter.clone(), document)
            .await?;
        Ok(replaced.and_then(|previous| previous.get("_id").cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let mut action = self.collection(collection).find(filter.clone());
        if let Some(limit) = options.limit {
            action = action.limit(limit as i64);
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }

        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64> {
        Ok(self
            .collection(collection)
            .count_documents(filter.clone())
            .await?)
    }

    async fn delete(&self, collection: &str, filter: &Document) -> Result<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter.clone())
            .await?;
        Ok(result.deleted_count)
    }

    async fn create_collection(&self, collection: &str) -> Result<()> {
        if self.collection_names().await?.iter().any(|name| name == collection) {
            return Ok(());
        }
        self.database.create_collection(collection).await?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collection(collection).drop().await?;
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn drop_database(&self) -> Result<()> {
        self.database.drop().await?;
        Ok(())
    }
}
