pub use super::db::query::condition::{And, Or};
pub use super::db::{
    Client, Collection, Database, Document, DocumentMeta, DocumentPlaceholder, ObjectCache,
    Reference, Selector, Unserialized,
};
pub use super::error::{OdmError, Result};
pub use super::filter;
pub use super::store::FindOptions;
pub use async_trait::async_trait;
pub use bson::{doc, oid::ObjectId, Bson};
pub use lisogo_odm_derive::Document;
