use lisogo_odm::prelude::*;

use super::{Item, User};

/// A goal a user plans to achieve or has achieved.
#[derive(Document, Debug, Clone, PartialEq)]
#[document(collection = "objectives")]
pub struct Objective {
    #[field(meta = true)]
    meta: DocumentMeta,
    /// True once the user achieved this objective.
    achieved: bool,
    #[field(reference = true)]
    item: Option<Reference<Item>>,
    #[field(reference = true)]
    user: Option<Reference<User>>,
}

impl Objective {
    pub fn new(user: User, item: Item) -> Self {
        let mut objective = Self::default();
        objective
            .set_user(Reference::new(user))
            .set_item(Reference::new(item));
        objective
    }
}
