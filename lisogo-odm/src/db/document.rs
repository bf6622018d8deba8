//! The [`Document`] trait: typed models mapped to documents.
//!
//! Models are plain structs deriving [`Document`](lisogo_odm_derive::Document).
//! The derive maps every named field to an entry of the SON representation,
//! except the [`DocumentMeta`] field and the fields marked as ignored, and
//! generates chaining setters that keep track of modifications.

use bson::{doc, oid::ObjectId, Bson};

use super::son::TypesMapping;
use super::Database;
use crate::error::{OdmError, Result};
use crate::store::FindOptions;
use crate::utils::display_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentState {
    /// Built in memory, never read from nor written to the database.
    #[default]
    New,
    /// Identical to what the database knows.
    Clean,
    /// A stored field changed since the document was loaded or saved.
    Dirty,
}

/// Identifier and modification state of a document.
///
/// Metadata never takes part in the equality of models: two models with the
/// same content are equal whatever their ids.
#[derive(Debug, Clone, Default)]
pub struct DocumentMeta {
    id: Option<Bson>,
    state: DocumentState,
}

impl PartialEq for DocumentMeta {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl DocumentMeta {
    pub fn id(&self) -> Option<&Bson> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<Bson>) {
        self.id = id;
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Marks the document as modified.
    pub fn touch(&mut self) {
        self.state = DocumentState::Dirty;
    }

    pub fn mark_clean(&mut self) {
        self.state = DocumentState::Clean;
    }
}

/// What identifies the document to retrieve: an id, or a filter which must
/// contain an `_id`.
#[derive(Debug, Clone)]
pub enum Selector {
    Id(Bson),
    Filter(bson::Document),
}

impl Selector {
    pub fn into_filter(self) -> Result<bson::Document> {
        match self {
            Self::Id(id) => Ok(doc! { "_id": id }),
            Self::Filter(filter) if filter.contains_key("_id") => Ok(filter),
            Self::Filter(_) => Err(OdmError::Retrieve(
                "a selector given as a document must have an \"_id\" field".into(),
            )),
        }
    }
}

impl From<Bson> for Selector {
    fn from(id: Bson) -> Self {
        Self::Id(id)
    }
}

impl From<ObjectId> for Selector {
    fn from(id: ObjectId) -> Self {
        Self::Id(Bson::ObjectId(id))
    }
}

impl From<&str> for Selector {
    fn from(id: &str) -> Self {
        Self::Id(Bson::String(id.to_string()))
    }
}

impl From<String> for Selector {
    fn from(id: String) -> Self {
        Self::Id(Bson::String(id))
    }
}

impl From<bson::Document> for Selector {
    fn from(filter: bson::Document) -> Self {
        Self::Filter(filter)
    }
}

/// Checks that `son` holds a document of type `T`.
pub fn check_type<T: Document>(son: &bson::Document) -> Result<()> {
    match son.get("_type") {
        None => Err(OdmError::MissingType),
        Some(Bson::String(found)) if found == T::TYPE_NAME => Ok(()),
        Some(found) => Err(OdmError::TypeMismatch {
            expected: T::TYPE_NAME.to_string(),
            found: match found {
                Bson::String(s) => s.clone(),
                other => other.to_string(),
            },
        }),
    }
}

/// Trait for models stored as documents.
#[async_trait::async_trait]
pub trait Document: Default + Clone + Send + Sync + 'static {
    /// Name stored in the `_type` field.
    const TYPE_NAME: &'static str;
    /// Collection storing the documents, `None` when the documents can only
    /// be nested in another one.
    const COLLECTION: Option<&'static str>;
    /// Whether the type has at least one stored field.
    const HAS_FIELDS: bool;

    fn meta(&self) -> &DocumentMeta;

    fn meta_mut(&mut self) -> &mut DocumentMeta;

    /// Writes the stored fields into `son`, recording the referenced
    /// documents in `mapping`.
    fn write_fields(&self, son: &mut bson::Document, mapping: &mut TypesMapping) -> Result<()>;

    /// Reads the stored fields present in `son`.
    fn read_fields(&mut self, son: &bson::Document, mapping: &TypesMapping) -> Result<()>;

    /// Saves the documents referenced by this one, so they have an id when
    /// this one is serialized.
    async fn save_references(&mut self, _db: &Database) -> Result<()> {
        Ok(())
    }

    /// Replaces the placeholders of the references by the documents.
    async fn load_references(&mut self, _db: &Database) -> Result<()> {
        Ok(())
    }

    /// The id of the document, `None` until it is persisted.
    fn id(&self) -> Option<&Bson> {
        self.meta().id()
    }

    fn set_id(&mut self, id: Option<Bson>) {
        self.meta_mut().set_id(id);
    }

    /// Whether the document changed since the last time it was read from
    /// or written to the database.
    ///
    /// A new document is modified as soon as its type stores a field.
    fn is_modified(&self) -> bool {
        match self.meta().state() {
            DocumentState::New => Self::HAS_FIELDS,
            DocumentState::Clean => false,
            DocumentState::Dirty => true,
        }
    }

    fn mark_clean(&mut self) {
        self.meta_mut().mark_clean();
    }

    /// Builds the SON representation of the document.
    ///
    /// `_id` is only present once the document has an id, `_type` always
    /// holds [`TYPE_NAME`](Document::TYPE_NAME).
    fn to_son(&self) -> Result<bson::Document> {
        let mut son = bson::Document::new();
        if let Some(id) = self.id() {
            son.insert("_id", id.clone());
        }

        let mut mapping = TypesMapping::default();
        self.write_fields(&mut son, &mut mapping)?;
        son.insert("_type", Self::TYPE_NAME);

        if !mapping.is_empty() {
            son.insert("_types_mapping", mapping.into_document());
        }
        Ok(son)
    }

    /// Populates the document from its SON representation. The document is
    /// not modified afterwards.
    fn from_son(&mut self, son: &bson::Document) -> Result<()> {
        check_type::<Self>(son)?;
        let mapping = TypesMapping::from_son(son)?;
        self.read_fields(son, &mapping)?;
        if let Some(id) = son.get("_id") {
            self.set_id(Some(id.clone()));
        }
        self.mark_clean();
        Ok(())
    }

    /// Saves the document in its collection, and returns it for chaining.
    ///
    /// Nothing is written when the document is not modified. Documents
    /// without a collection can only be nested and fail with
    /// [`OdmError::Persist`] before the database is touched.
    async fn save(&mut self, db: &Database) -> Result<&mut Self> {
        if !self.is_modified() {
            return Ok(self);
        }

        let Some(collection) = Self::COLLECTION else {
            return Err(OdmError::Persist(format!(
                "the object of type {} can only be nested (no collection defined)",
                Self::TYPE_NAME
            )));
        };

        db.collection(collection)?.save(self).await?;
        Ok(self)
    }

    /// Populates the document with the one matching `selector` in its
    /// collection. The object cache is bypassed.
    async fn retrieve<S>(&mut self, selector: S, db: &Database) -> Result<&mut Self>
    where
        S: Into<Selector> + Send,
    {
        let Some(collection) = Self::COLLECTION else {
            return Err(OdmError::Retrieve(format!(
                "the object of type {} can only be nested (no collection defined)",
                Self::TYPE_NAME
            )));
        };

        let filter = selector.into().into_filter()?;
        let found = db
            .collection(collection)?
            .find_raw_with(filter.clone(), FindOptions::limit(1))
            .await?
            .into_iter()
            .next();

        let Some(son) = found else {
            return Err(OdmError::NotFound {
                collection: collection.to_string(),
                id: filter.get("_id").map(display_id).unwrap_or_default(),
            });
        };

        self.from_son(&son)?;
        if !db.lazy_loading_is_enabled() {
            self.load_references(db).await?;
        }
        Ok(self)
    }
}
