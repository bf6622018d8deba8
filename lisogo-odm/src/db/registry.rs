//! Registry of the document types, used to unserialize a document from the
//! name stored in its `_type` field.
//!
//! Every type deriving `Document` submits a [`DocumentType`] through
//! `inventory`, so the registry knows all the models linked in the binary.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bson::Bson;
use lazy_static::lazy_static;

use super::document::Document;
use super::Database;
use crate::error::{OdmError, Result};

pub struct DocumentType {
    pub name: &'static str,
    pub collection: Option<&'static str>,
    pub create: fn() -> Box<dyn AnyDocument>,
}

inventory::collect!(DocumentType);

lazy_static! {
    static ref DOCUMENT_TYPES: HashMap<&'static str, &'static DocumentType> = {
        let mut types = HashMap::new();
        for document_type in inventory::iter::<DocumentType> {
            if types.insert(document_type.name, document_type).is_some() {
                tracing::warn!(name = document_type.name, "document type registered twice");
            }
        }
        types
    };
}

/// Builds an empty document of type `T`.
pub fn create<T: Document>() -> Box<dyn AnyDocument> {
    Box::new(T::default())
}

pub fn lookup(name: &str) -> Option<&'static DocumentType> {
    DOCUMENT_TYPES.get(name).copied()
}

/// Names of all the registered document types.
pub fn type_names() -> Vec<&'static str> {
    let mut names: Vec<_> = DOCUMENT_TYPES.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn instantiate(name: &str) -> Result<Box<dyn AnyDocument>> {
    lookup(name)
        .map(|document_type| (document_type.create)())
        .ok_or_else(|| OdmError::UnknownType(name.to_string()))
}

/// Object safe view of a [`Document`].
#[async_trait]
pub trait AnyDocument: Any + Send + Sync {
    fn type_name(&self) -> &'static str;

    fn collection_name(&self) -> Option<&'static str>;

    fn document_id(&self) -> Option<&Bson>;

    fn load_son(&mut self, son: &bson::Document) -> Result<()>;

    fn dump_son(&self) -> Result<bson::Document>;

    async fn resolve_references(&mut self, db: &Database) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

#[async_trait]
impl<T: Document> AnyDocument for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn collection_name(&self) -> Option<&'static str> {
        T::COLLECTION
    }

    fn document_id(&self) -> Option<&Bson> {
        Document::id(self)
    }

    fn load_son(&mut self, son: &bson::Document) -> Result<()> {
        Document::from_son(self, son)
    }

    fn dump_son(&self) -> Result<bson::Document> {
        Document::to_son(self)
    }

    async fn resolve_references(&mut self, db: &Database) -> Result<()> {
        Document::load_references(self, db).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// A document read without knowing its type in advance.
pub enum Unserialized {
    /// A document whose `_type` names a registered model.
    Model(Box<dyn AnyDocument>),
    /// A document without `_type`, returned as is.
    Raw(bson::Document),
}

impl Unserialized {
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Self::Model(document) => Some(document.type_name()),
            Self::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    pub fn downcast_ref<T: Document>(&self) -> Option<&T> {
        match self {
            Self::Model(document) => document.as_any().downcast_ref::<T>(),
            Self::Raw(_) => None,
        }
    }

    pub fn downcast<T: Document>(self) -> Option<T> {
        match self {
            Self::Model(document) => document.into_any().downcast::<T>().ok().map(|d| *d),
            Self::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<bson::Document> {
        match self {
            Self::Raw(son) => Some(son),
            Self::Model(_) => None,
        }
    }
}

impl fmt::Debug for Unserialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(document) => f
                .debug_struct("Model")
                .field("type", &document.type_name())
                .field("id", &document.document_id())
                .finish(),
            Self::Raw(son) => f.debug_tuple("Raw").field(son).finish(),
        }
    }
}
