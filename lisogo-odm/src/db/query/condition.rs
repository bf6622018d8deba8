use bson::{Bson, Document};

/// Builds `{field: {op: value}}`, or `{field: value}` for equality.
pub fn compare(field: &str, operator: &str, value: impl Into<Bson>) -> Document {
    let value = value.into();
    let mut filter = Document::new();
    if operator == "$eq" {
        filter.insert(field, value);
    } else {
        let mut condition = Document::new();
        condition.insert(operator, value);
        filter.insert(field, condition);
    }
    filter
}

fn combine(operator: &str, left: Document, right: Document) -> Document {
    let mut clauses = Vec::new();
    for mut side in [left, right] {
        if side.is_empty() {
            continue;
        }
        // flatten chains of the same operator: a.and(b).and(c)
        if side.len() == 1 && matches!(side.get(operator), Some(Bson::Array(_))) {
            if let Some(Bson::Array(array)) = side.remove(operator) {
                clauses.extend(array);
                continue;
            }
        }
        clauses.push(Bson::Document(side));
    }

    let mut filter = Document::new();
    filter.insert(operator, clauses);
    filter
}

pub trait Or {
    fn or(self, filter: Document) -> Document;
}

pub trait And {
    fn and(self, filter: Document) -> Document;
}

impl Or for Document {
    fn or(self, filter: Document) -> Document {
        combine("$or", self, filter)
    }
}

impl And for Document {
    fn and(self, filter: Document) -> Document {
        combine("$and", self, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn equality_is_a_plain_field() {
        assert_eq!(compare("foo", "$eq", "bar"), doc! { "foo": "bar" });
        assert_eq!(compare("age", "$gt", 3), doc! { "age": { "$gt": 3 } });
    }

    #[test]
    fn chains_are_flattened() {
        let filter = doc! { "a": 1 }.and(doc! { "b": 2 }).and(doc! { "c": 3 });
        assert_eq!(
            filter,
            doc! { "$and": [ { "a": 1 }, { "b": 2 }, { "c": 3 } ] }
        );

        let filter = doc! { "a": 1 }.or(doc! { "b": 2 }.and(doc! { "c": 3 }));
        assert_eq!(
            filter,
            doc! { "$or": [ { "a": 1 }, { "$and": [ { "b": 2 }, { "c": 3 } ] } ] }
        );
    }
}
