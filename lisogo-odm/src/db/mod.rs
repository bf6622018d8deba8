//! The `db` module provides the object document mapper: clients, databases,
//! collections and the documents they store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub mod cache;
pub mod collection;
pub mod document;
pub mod query;
pub mod reference;
pub mod registry;
pub mod son;

pub use cache::{ObjectCache, ObjectCacheCollection};
pub use collection::Collection;
pub use document::{Document, DocumentMeta, DocumentState, Selector};
pub use reference::{DocumentPlaceholder, Reference};
pub use registry::{AnyDocument, DocumentType, Unserialized};

use crate::error::Result;
use crate::store::{self, Backend, Store};
use crate::utils::{validate_collection_name, validate_database_name};

pub const PLACEHOLDER: &str = "?";

type OpenedCaches = Vec<(String, Weak<ObjectCacheCollection>)>;

/// A connection to a database server.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    opened: Arc<Mutex<OpenedCaches>>,
}

impl Client {
    /// Connects to the server at `url`: `sqlite:` urls open the sqlite
    /// document store, `mongodb://` urls a mongodb server when the
    /// `mongodb` feature is enabled.
    pub async fn connect(url: &str) -> Result<Self> {
        let backend = store::open(url).await?;
        tracing::info!(url, "database client connected");
        Ok(Self::with_backend(backend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn opened(&self) -> std::sync::MutexGuard<'_, OpenedCaches> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn database(&self, name: &str) -> Result<Database> {
        validate_database_name(name)?;
        let database = Database::new(name, self.backend.database(name));

        let mut opened = self.opened();
        opened.retain(|(_, caches)| caches.strong_count() > 0);
        opened.push((name.to_string(), Arc::downgrade(&database.caches)));
        Ok(database)
    }

    /// Drops the database `name`, and clears the object caches of the
    /// handles on it opened by this client.
    pub async fn drop_database(&self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        self.backend.drop_database(name).await?;

        let opened: Vec<_> = self
            .opened()
            .iter()
            .filter(|(opened, _)| opened == name)
            .filter_map(|(_, caches)| caches.upgrade())
            .collect();
        for caches in opened {
            caches.clear_caches();
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

/// A database, with the object caches of its collections.
///
/// The object cache is enabled and lazy loading is disabled on a new
/// database.
pub struct Database {
    name: String,
    store: Arc<dyn Store>,
    caches: Arc<ObjectCacheCollection>,
    cache_enabled: AtomicBool,
    lazy_loading: AtomicBool,
}

impl Database {
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self {
            name: name.into(),
            store,
            caches: Arc::new(ObjectCacheCollection::new()),
            cache_enabled: AtomicBool::new(true),
            lazy_loading: AtomicBool::new(false),
        }
    }

    /// Connects to `url` and selects the database `name`.
    pub async fn connect(url: &str, name: &str) -> Result<Self> {
        Client::connect(url).await?.database(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn caches(&self) -> &ObjectCacheCollection {
        &self.caches
    }

    pub fn collection<'a>(&'a self, name: &'a str) -> Result<Collection<'a>> {
        validate_collection_name(name)?;
        Ok(Collection::new(self, name))
    }

    pub async fn create_collection<'a>(&'a self, name: &'a str) -> Result<Collection<'a>> {
        let collection = self.collection(name)?;
        self.store.create_collection(name).await?;
        Ok(collection)
    }

    pub async fn collection_names(&self) -> Result<Vec<String>> {
        self.store.collection_names().await
    }

    /// Drops every collection of the database and clears the caches.
    pub async fn drop(&self) -> Result<()> {
        self.store.drop_database().await?;
        self.caches.clear_caches();
        tracing::info!(database = %self.name, "database dropped");
        Ok(())
    }

    pub fn enable_cache(&self) {
        self.cache_enabled.store(true, Ordering::SeqCst);
        self.caches.enable_caches();
    }

    /// Disables the caches of all the collections. The cached documents
    /// are kept, but not served until the caches are enabled again.
    pub fn disable_cache(&self) {
        self.cache_enabled.store(false, Ordering::SeqCst);
        self.caches.disable_caches();
    }

    pub fn cache_is_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::SeqCst)
    }

    pub fn enable_lazy_loading(&self) {
        self.lazy_loading.store(true, Ordering::SeqCst);
    }

    pub fn disable_lazy_loading(&self) {
        self.lazy_loading.store(false, Ordering::SeqCst);
    }

    pub fn lazy_loading_is_enabled(&self) -> bool {
        self.lazy_loading.load(Ordering::SeqCst)
    }
}
