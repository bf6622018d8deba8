//! References between documents stored in different collections.

use std::fmt;
use std::marker::PhantomData;

use bson::{doc, Bson};

use super::document::Document;
use super::Database;
use crate::error::{OdmError, Result};
use crate::utils::display_id;

/// Stands for a referenced document which is not loaded yet.
pub struct DocumentPlaceholder<T> {
    collection: &'static str,
    id: Bson,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentPlaceholder<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection,
            id: self.id.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DocumentPlaceholder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPlaceholder")
            .field("collection", &self.collection)
            .field("id", &self.id)
            .finish()
    }
}

impl<T: Document> DocumentPlaceholder<T> {
    pub fn new(collection: &'static str, id: Bson) -> Self {
        Self {
            collection,
            id,
            marker: PhantomData,
        }
    }

    pub fn id(&self) -> &Bson {
        &self.id
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    fn not_found(&self) -> OdmError {
        OdmError::NotFound {
            collection: self.collection.to_string(),
            id: display_id(&self.id),
        }
    }

    /// Finds the document through its collection, served from the object
    /// cache when it holds it.
    pub async fn find(&self, db: &Database) -> Result<T> {
        db.collection(self.collection)?
            .find_one::<T>(doc! { "_id": self.id.clone() })
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Retrieves the document from the database.
    pub async fn retrieve(&self, db: &Database) -> Result<T> {
        let mut document = T::default();
        document.retrieve(self.id.clone(), db).await?;
        Ok(document)
    }
}

#[derive(Debug, Clone)]
enum State<T> {
    Loaded(Box<T>),
    Pending(DocumentPlaceholder<T>),
}

/// A field referencing a document of another collection.
///
/// The referenced document is either loaded, or represented by a
/// [`DocumentPlaceholder`] until [`fetch`](Reference::fetch) resolves it.
#[derive(Debug, Clone)]
pub struct Reference<T> {
    state: State<T>,
}

impl<T: Document> Reference<T> {
    pub fn new(document: T) -> Self {
        Self {
            state: State::Loaded(Box::new(document)),
        }
    }

    /// A reference to the document of id `id`, not loaded yet.
    pub fn placeholder(id: Bson) -> Result<Self> {
        let Some(collection) = T::COLLECTION else {
            return Err(OdmError::Retrieve(format!(
                "a {} can only be nested, it can not be referenced by id",
                T::TYPE_NAME
            )));
        };

        Ok(Self {
            state: State::Pending(DocumentPlaceholder::new(collection, id)),
        })
    }

    pub fn id(&self) -> Option<&Bson> {
        match &self.state {
            State::Loaded(document) => document.id(),
            State::Pending(placeholder) => Some(placeholder.id()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    /// The document, when it is loaded.
    pub fn get(&self) -> Option<&T> {
        match &self.state {
            State::Loaded(document) => Some(&**document),
            State::Pending(_) => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            State::Loaded(document) => Some(&mut **document),
            State::Pending(_) => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&DocumentPlaceholder<T>> {
        match &self.state {
            State::Loaded(_) => None,
            State::Pending(placeholder) => Some(placeholder),
        }
    }

    pub fn into_inner(self) -> Option<T> {
        match self.state {
            State::Loaded(document) => Some(*document),
            State::Pending(_) => None,
        }
    }

    fn loaded(&mut self) -> Result<&mut T> {
        match &mut self.state {
            State::Loaded(document) => Ok(&mut **document),
            State::Pending(placeholder) => Err(placeholder.not_found()),
        }
    }

    /// Resolves the placeholder through the collection (and its cache), and
    /// returns the document.
    pub async fn fetch(&mut self, db: &Database) -> Result<&mut T> {
        if let State::Pending(placeholder) = &self.state {
            let document = placeholder.find(db).await?;
            self.state = State::Loaded(Box::new(document));
        }
        self.loaded()
    }

    /// Loads the referenced document from the database, bypassing the
    /// cache. A document already loaded gets its own references loaded.
    pub async fn load(&mut self, db: &Database) -> Result<&mut T> {
        match &mut self.state {
            State::Pending(placeholder) => {
                let document = placeholder.retrieve(db).await?;
                self.state = State::Loaded(Box::new(document));
            }
            State::Loaded(document) => document.load_references(db).await?,
        }
        self.loaded()
    }

    /// Saves the referenced document when it is loaded and modified.
    pub async fn save(&mut self, db: &Database) -> Result<()> {
        let State::Loaded(document) = &mut self.state else {
            return Ok(());
        };

        if T::COLLECTION.is_some() {
            document.save(db).await?;
        } else {
            document.save_references(db).await?;
        }
        Ok(())
    }
}

impl<T: Document> From<T> for Reference<T> {
    fn from(document: T) -> Self {
        Self::new(document)
    }
}

/// References are equal when they point to the same id. References to
/// unsaved documents compare the documents.
impl<T: Document + PartialEq> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(left), Some(right)) => left == right,
            (None, None) => match (self.get(), other.get()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
            _ => false,
        }
    }
}
