use chrono::{DateTime, Utc};
use lisogo_odm::prelude::*;

/// An identified user.
#[derive(Document, Debug, Clone, PartialEq)]
#[document(collection = "users")]
pub struct User {
    #[field(meta = true)]
    meta: DocumentMeta,
    /// Complete name of the user.
    name: String,
    /// Name of the user as displayed.
    username: String,
    email: String,
    #[field(default = Utc::now())]
    registered_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, username: &str, email: &str) -> Self {
        let mut user = Self::default();
        user.set_name(name).set_username(username).set_email(email);
        user
    }
}
