//! Collections of documents, with an object cache per collection.

use bson::{doc, Bson};
use tracing::debug;

use super::cache::ObjectCache;
use super::document::Document;
use super::registry::{self, Unserialized};
use super::Database;
use crate::error::Result;
use crate::store::FindOptions;

/// A collection of a [`Database`].
///
/// Typed operations serialize documents with [`Document::to_son`] and build
/// them back from the `_type` they store. Documents with an ObjectId are
/// kept in the object cache of the collection while the cache is enabled,
/// and later finds return copies of the cached documents.
#[derive(Clone, Copy)]
pub struct Collection<'db> {
    db: &'db Database,
    name: &'db str,
}

impl<'db> Collection<'db> {
    pub(crate) fn new(db: &'db Database, name: &'db str) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &'db str {
        self.name
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// The object cache of the collection. It is created on demand while
    /// caching is enabled on the database.
    pub fn cache(&self) -> Option<ObjectCache> {
        self.db
            .caches()
            .get_cache(self.name, self.db.cache_is_enabled())
    }

    pub fn set_cache(&self, cache: ObjectCache) {
        self.db.caches().set_cache(self.name, cache);
    }

    fn remember<T: Document>(&self, document: &T) {
        let Some(Bson::ObjectId(oid)) = document.id() else {
            return;
        };
        if let Some(cache) = self.cache() {
            cache.insert(*oid, document.clone());
        }
    }

    fn forget(&self, id: &Bson) {
        let Bson::ObjectId(oid) = id else {
            return;
        };
        if let Some(cache) = self.db.caches().get_cache(self.name, false) {
            cache.remove(oid);
        }
    }

    fn cached<T: Document>(&self, son: &bson::Document) -> Option<T> {
        let Some(Bson::ObjectId(oid)) = son.get("_id") else {
            return None;
        };
        let cached = self.cache()?.get::<T>(oid)?;
        debug!(collection = self.name, id = %oid, "object cache hit");
        Some(T::clone(&cached))
    }

    async fn serialize<T: Document>(&self, document: &mut T) -> Result<bson::Document> {
        document.save_references(self.db).await?;
        document.to_son()
    }

    /// Builds a document of type `T` from its SON representation, loading
    /// its references unless lazy loading is enabled.
    pub async fn unserialize<T: Document>(&self, son: bson::Document) -> Result<T> {
        if let Some(document) = self.cached::<T>(&son) {
            return Ok(document);
        }

        let mut document = T::default();
        document.from_son(&son)?;
        if !self.db.lazy_loading_is_enabled() {
            document.load_references(self.db).await?;
        }

        self.remember(&document);
        Ok(document)
    }

    /// Inserts or replaces the document, and returns its id.
    ///
    /// The referenced documents are saved first. The document is not
    /// modified afterwards.
    pub async fn save<T: Document>(&self, document: &mut T) -> Result<Bson> {
        let son = self.serialize(document).await?;
        let id = self.db.store().upsert(self.name, son).await?;

        document.set_id(Some(id.clone()));
        document.mark_clean();
        self.remember(document);
        Ok(id)
    }

    /// Inserts a new document. Fails with a duplicate key error when a
    /// document with the same id exists.
    pub async fn insert<T: Document>(&self, document: &mut T) -> Result<Bson> {
        let son = self.serialize(document).await?;
        let id = self.db.store().insert(self.name, son).await?;

        document.set_id(Some(id.clone()));
        document.mark_clean();
        self.remember(document);
        Ok(id)
    }

    /// Inserts the documents one after the other, stopping at the first
    /// failure.
    pub async fn insert_many<T: Document>(&self, documents: &mut [T]) -> Result<Vec<Bson>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents.iter_mut() {
            ids.push(self.insert(document).await?);
        }
        Ok(ids)
    }

    pub async fn insert_raw(&self, son: bson::Document) -> Result<Bson> {
        self.db.store().insert(self.name, son).await
    }

    /// Replaces the first document matching `filter` by `document`, and
    /// returns the number of replaced documents.
    ///
    /// The replaced document leaves the object cache. `document` takes its
    /// place there only when it carries its own id.
    pub async fn update<T: Document>(&self, filter: bson::Document, document: &mut T) -> Result<u64> {
        let son = self.serialize(document).await?;
        let Some(replaced) = self.db.store().replace_one(self.name, &filter, son).await? else {
            return Ok(0);
        };

        self.forget(&replaced);
        document.mark_clean();
        self.remember(document);
        Ok(1)
    }

    pub async fn update_raw(&self, filter: bson::Document, son: bson::Document) -> Result<u64> {
        let Some(replaced) = self.db.store().replace_one(self.name, &filter, son).await? else {
            return Ok(0);
        };

        self.forget(&replaced);
        Ok(1)
    }

    pub async fn find<T: Document>(&self, filter: bson::Document) -> Result<Vec<T>> {
        self.find_with(filter, FindOptions::default()).await
    }

    pub async fn find_with<T: Document>(
        &self,
        filter: bson::Document,
        options: FindOptions,
    ) -> Result<Vec<T>> {
        let found = self.find_raw_with(filter, options).await?;

        let mut documents = Vec::with_capacity(found.len());
        for son in found {
            documents.push(self.unserialize::<T>(son).await?);
        }
        Ok(documents)
    }

    pub async fn find_one<T: Document>(&self, filter: bson::Document) -> Result<Option<T>> {
        Ok(self
            .find_with(filter, FindOptions::limit(1))
            .await?
            .into_iter()
            .next())
    }

    /// Finds documents of any registered type. Documents without a `_type`
    /// are returned raw.
    pub async fn find_dynamic(&self, filter: bson::Document) -> Result<Vec<Unserialized>> {
        let found = self.find_raw(filter).await?;

        let mut documents = Vec::with_capacity(found.len());
        for son in found {
            let Some(type_name) = son.get_str("_type").ok().map(str::to_string) else {
                documents.push(Unserialized::Raw(son));
                continue;
            };

            let mut document = registry::instantiate(&type_name)?;
            document.load_son(&son)?;
            if !self.db.lazy_loading_is_enabled() {
                document.resolve_references(self.db).await?;
            }
            documents.push(Unserialized::Model(document));
        }
        Ok(documents)
    }

    pub async fn find_raw(&self, filter: bson::Document) -> Result<Vec<bson::Document>> {
        self.find_raw_with(filter, FindOptions::default()).await
    }

    pub async fn find_raw_with(
        &self,
        filter: bson::Document,
        options: FindOptions,
    ) -> Result<Vec<bson::Document>> {
        self.db.store().find(self.name, &filter, options).await
    }

    pub async fn count(&self, filter: bson::Document) -> Result<u64> {
        self.db.store().count(self.name, &filter).await
    }

    /// Removes the documents matching `filter`, and evicts them from the
    /// object cache.
    pub async fn remove(&self, filter: bson::Document) -> Result<u64> {
        if self.db.caches().get_cache(self.name, false).is_some() {
            for son in self.find_raw(filter.clone()).await? {
                if let Some(id) = son.get("_id") {
                    self.forget(id);
                }
            }
        }
        self.db.store().delete(self.name, &filter).await
    }

    pub async fn remove_by_id(&self, id: impl Into<Bson>) -> Result<u64> {
        self.remove(doc! { "_id": id.into() }).await
    }

    /// Drops the collection and its object cache.
    pub async fn drop(&self) -> Result<()> {
        self.db.store().drop_collection(self.name).await?;
        self.db.caches().remove_cache(self.name);
        Ok(())
    }
}
