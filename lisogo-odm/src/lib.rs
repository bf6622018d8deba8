//! An object document mapper with typed models, references between
//! collections, object caches and lazy loading.
//!
//! Models derive [`Document`](derive@Document):
//!
//! ```ignore
//! use lisogo_odm::prelude::*;
//!
//! #[derive(Document, Debug, Clone, PartialEq)]
//! #[document(collection = "users")]
//! struct User {
//!     #[field(meta = true)]
//!     meta: DocumentMeta,
//!     name: String,
//! }
//!
//! let db = Database::connect("sqlite::memory:", "lisogo").await?;
//! let mut user = User::default();
//! user.set_name("Martin").save(&db).await?;
//! ```

extern crate self as lisogo_odm;

/// This module contains the macros used in the crate.
#[macro_use]
mod macros;

/// This module contains the object document mapper.
pub mod db;

pub mod error;

/// This module contains the prelude for the crate.
pub mod prelude;

/// Storage backends.
pub mod store;

pub mod utils;

pub use async_trait;
pub use bson;
pub use inventory;

pub use db::son;
pub use db::{
    AnyDocument, Client, Collection, Database, Document, DocumentMeta, DocumentPlaceholder,
    DocumentState, DocumentType, ObjectCache, Reference, Selector, Unserialized,
};
pub use error::{OdmError, Result};
pub use lisogo_odm_derive::Document;
