//! Conversion of model fields to and from SON.
//!
//! The functions of this module are called by the code generated by the
//! `Document` derive, one per kind of field:
//!
//! * value fields go through serde,
//! * embedded documents are stored as their own SON representation,
//! * references are stored as the id of the referenced document, and the
//!   type of every referenced id is recorded in the `_types_mapping` of the
//!   enclosing document. A referenced document which can only be nested, or
//!   which has no id yet, is stored in place instead.

use bson::Bson;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::document::Document;
use super::reference::Reference;
use super::Database;
use crate::error::{OdmError, Result};
use crate::utils::mapping_key;

/// Types of the documents referenced by a document, keyed by the string form
/// of their ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypesMapping(bson::Document);

impl TypesMapping {
    pub fn from_son(son: &bson::Document) -> Result<Self> {
        match son.get("_types_mapping") {
            None | Some(Bson::Null) => Ok(Self::default()),
            Some(Bson::Document(mapping)) => Ok(Self(mapping.clone())),
            Some(other) => Err(OdmError::Retrieve(format!(
                "invalid _types_mapping: {other}"
            ))),
        }
    }

    pub fn insert(&mut self, id: &Bson, type_name: &str) {
        self.0.insert(mapping_key(id), type_name);
    }

    pub fn get(&self, id: &Bson) -> Option<&str> {
        self.0.get_str(mapping_key(id)).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_document(self) -> bson::Document {
        self.0
    }
}

pub fn encode_value<T: Serialize>(value: &T) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

pub fn decode_value<T: DeserializeOwned>(value: &Bson) -> Result<T> {
    Ok(bson::from_bson(value.clone())?)
}

pub fn encode_embedded<T: Document>(value: &Option<T>) -> Result<Bson> {
    match value {
        None => Ok(Bson::Null),
        Some(document) => Ok(Bson::Document(document.to_son()?)),
    }
}

pub fn decode_embedded<T: Document>(value: &Bson) -> Result<Option<T>> {
    match value {
        Bson::Null => Ok(None),
        Bson::Document(son) => {
            let mut document = T::default();
            document.from_son(son)?;
            Ok(Some(document))
        }
        other => Err(OdmError::Retrieve(format!(
            "expected an embedded {} document, found {other}",
            T::TYPE_NAME
        ))),
    }
}

pub fn encode_reference<T: Document>(
    value: &Option<Reference<T>>,
    mapping: &mut TypesMapping,
) -> Result<Bson> {
    let Some(reference) = value else {
        return Ok(Bson::Null);
    };

    if T::COLLECTION.is_some() {
        if let Some(id) = reference.id() {
            mapping.insert(id, T::TYPE_NAME);
            return Ok(id.clone());
        }
    }

    match reference.get() {
        Some(document) => Ok(Bson::Document(document.to_son()?)),
        None => Err(OdmError::Persist(format!(
            "unresolved reference to a {} without id",
            T::TYPE_NAME
        ))),
    }
}

pub fn decode_reference<T: Document>(
    value: &Bson,
    mapping: &TypesMapping,
) -> Result<Option<Reference<T>>> {
    match value {
        Bson::Null => Ok(None),
        Bson::Document(son) if son.contains_key("_type") => {
            let mut document = T::default();
            document.from_son(son)?;
            Ok(Some(Reference::new(document)))
        }
        id => {
            if let Some(found) = mapping.get(id) {
                if found != T::TYPE_NAME {
                    return Err(OdmError::TypeMismatch {
                        expected: T::TYPE_NAME.to_string(),
                        found: found.to_string(),
                    });
                }
            }
            Reference::placeholder(id.clone()).map(Some)
        }
    }
}

pub async fn save_embedded<T: Document>(value: &mut Option<T>, db: &Database) -> Result<()> {
    if let Some(document) = value {
        document.save_references(db).await?;
    }
    Ok(())
}

pub async fn save_reference<T: Document>(
    value: &mut Option<Reference<T>>,
    db: &Database,
) -> Result<()> {
    if let Some(reference) = value {
        reference.save(db).await?;
    }
    Ok(())
}

pub async fn load_embedded<T: Document>(value: &mut Option<T>, db: &Database) -> Result<()> {
    if let Some(document) = value {
        document.load_references(db).await?;
    }
    Ok(())
}

pub async fn load_reference<T: Document>(
    value: &mut Option<Reference<T>>,
    db: &Database,
) -> Result<()> {
    if let Some(reference) = value {
        reference.load(db).await?;
    }
    Ok(())
}
