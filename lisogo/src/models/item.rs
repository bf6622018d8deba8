use lisogo_odm::prelude::*;

pub const TITLE_MAX_LENGTH: usize = 120;

/// An item of the list.
#[derive(Document, Debug, Clone, PartialEq)]
#[document(collection = "items")]
pub struct Item {
    #[field(meta = true)]
    meta: DocumentMeta,
    /// Title of the item, must be kept short.
    #[field(validate = validate_title)]
    title: String,
    /// Detailed description of the item.
    description: String,
}

#[allow(clippy::ptr_arg)]
fn validate_title(title: &String) -> Result<()> {
    let length = title.chars().count();
    if length > TITLE_MAX_LENGTH {
        return Err(OdmError::Validation {
            field: "title".to_string(),
            reason: format!("{length} characters, at most {TITLE_MAX_LENGTH} allowed"),
        });
    }
    Ok(())
}

impl Item {
    pub fn new(title: &str, description: &str) -> Result<Self> {
        let mut item = Self::default();
        item.set_title(title)?.set_description(description);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_titles_are_rejected() {
        let mut item = Item::default();
        let title = "a".repeat(TITLE_MAX_LENGTH + 1);
        assert!(matches!(
            item.set_title(title),
            Err(OdmError::Validation { .. })
        ));
        assert_eq!(item.title(), "");
    }

    #[test]
    fn titles_are_counted_in_characters() {
        let title = "é".repeat(TITLE_MAX_LENGTH);
        let item = Item::new(&title, "").unwrap();
        assert_eq!(item.title(), &title);
        assert!(item.is_modified());
    }
}
