use bson::Bson;

use crate::error::{OdmError, Result};

/// Key of an id in a `_types_mapping` sub-document.
///
/// ObjectIds are keyed by their hex form, strings by themselves and any other
/// value by its extended json representation.
pub fn mapping_key(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Text form of an id used as primary key by the sql store: the relaxed
/// extended json of the id, the same form the stored body holds. ObjectIds
/// and strings stay distinct, and integers are keyed by value whatever their
/// width, since a body read back turns small 64 bit integers into 32 bit ones.
pub fn storage_key(id: &Bson) -> String {
    id.clone().into_relaxed_extjson().to_string()
}

/// Human readable form of an id for error messages and logs.
pub fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(valid_char) {
        return Err(OdmError::InvalidName(format!(
            "database name '{name}' must be non empty and only contain [A-Za-z0-9_-]"
        )));
    }
    Ok(())
}

/// Collection names follow the mongodb rules restricted to a portable
/// alphabet: no `$`, no empty segment around dots.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with("system.")
        && name
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(valid_char));

    if valid {
        Ok(())
    } else {
        Err(OdmError::InvalidName(format!(
            "collection name '{name}' is not valid"
        )))
    }
}
