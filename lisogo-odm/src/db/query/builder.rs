//! Translation of mongodb style filters into sql `where` clauses over the
//! json bodies kept by the sql store.

use bson::{Bson, Document};

use super::{Arg, Query};
use crate::db::PLACEHOLDER;
use crate::error::{OdmError, Result};
use crate::utils::storage_key;

enum Operand {
    Id,
    Path(String),
}

impl Operand {
    fn new(field: &str) -> Result<Self> {
        if field == "_id" {
            return Ok(Self::Id);
        }

        let mut path = String::from("$");
        for segment in field.split('.') {
            if segment.is_empty() || segment.contains('"') || segment.starts_with('$') {
                return Err(OdmError::InvalidFilter(format!("invalid field path '{field}'")));
            }
            path.push_str(&format!(".\"{segment}\""));
        }
        Ok(Self::Path(path))
    }

    fn expr(&self, args: &mut Vec<Arg>) -> String {
        match self {
            Self::Id => "id".to_string(),
            Self::Path(path) => {
                args.push(Arg::Text(path.clone()));
                format!("json_extract(body, {PLACEHOLDER})")
            }
        }
    }

    fn arg(&self, value: &Bson) -> Option<Arg> {
        match self {
            Self::Id => Some(Arg::Text(storage_key(value))),
            Self::Path(_) => to_arg(value),
        }
    }
}

/// Converts a value to the sql value `json_extract` yields for it. `None`
/// stands for sql null.
fn to_arg(value: &Bson) -> Option<Arg> {
    match value {
        Bson::Null | Bson::Undefined => None,
        Bson::String(s) => Some(Arg::Text(s.clone())),
        Bson::Int32(i) => Some(Arg::Integer(i64::from(*i))),
        Bson::Int64(i) => Some(Arg::Integer(*i)),
        Bson::Double(f) => Some(Arg::Real(*f)),
        Bson::Boolean(b) => Some(Arg::Integer(i64::from(*b))),
        // objects and arrays come back from json_extract as minified json
        other => Some(Arg::Text(other.clone().into_relaxed_extjson().to_string())),
    }
}

fn compare(operand: &Operand, op: &str, value: &Bson, args: &mut Vec<Arg>) -> Result<String> {
    let sql_op = match op {
        "$eq" => "=",
        "$ne" => "!=",
        "$gt" => ">",
        "$gte" => ">=",
        "$lt" => "<",
        "$lte" => "<=",
        "$in" | "$nin" => return membership(operand, op == "$nin", value, args),
        "$exists" => return exists(operand, value, args),
        other => {
            return Err(OdmError::InvalidFilter(format!("unsupported operator '{other}'")));
        }
    };

    let Some(arg) = operand.arg(value) else {
        return match sql_op {
            "=" => Ok(format!("{} is null", operand.expr(args))),
            "!=" => Ok(format!("{} is not null", operand.expr(args))),
            _ => Err(OdmError::InvalidFilter(format!("'{op}' can not compare with null"))),
        };
    };

    let clause = match (operand, sql_op) {
        // a missing field is different from any value
        (Operand::Path(_), "!=") => {
            let first = operand.expr(args);
            let second = operand.expr(args);
            format!("({first} is null or {second} != {PLACEHOLDER})")
        }
        _ => format!("{} {sql_op} {PLACEHOLDER}", operand.expr(args)),
    };
    args.push(arg);
    Ok(clause)
}

fn membership(operand: &Operand, negate: bool, value: &Bson, args: &mut Vec<Arg>) -> Result<String> {
    let Bson::Array(values) = value else {
        return Err(OdmError::InvalidFilter("'$in' and '$nin' expect an array".into()));
    };

    let mut members = Vec::new();
    let mut with_null = false;
    for value in values {
        match operand.arg(value) {
            Some(arg) => members.push(arg),
            None => with_null = true,
        }
    }

    if members.is_empty() && !with_null {
        return Ok(if negate { "1 = 1" } else { "0 = 1" }.to_string());
    }

    // a missing field is in none of the values
    let missing = match operand {
        Operand::Path(_) if negate && !with_null => Some(format!("{} is null", operand.expr(args))),
        _ => None,
    };

    let mut alternatives = Vec::new();
    if !members.is_empty() {
        let placeholders = vec![PLACEHOLDER; members.len()].join(", ");
        alternatives.push(format!("{} in ({placeholders})", operand.expr(args)));
        args.extend(members);
    }
    if with_null {
        alternatives.push(format!("{} is null", operand.expr(args)));
    }
    let clause = format!("({})", alternatives.join(" or "));

    Ok(match (negate, missing) {
        (false, _) => clause,
        (true, Some(missing)) => format!("({missing} or not {clause})"),
        (true, None) => format!("not {clause}"),
    })
}

fn exists(operand: &Operand, value: &Bson, args: &mut Vec<Arg>) -> Result<String> {
    let expected = match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        _ => return Err(OdmError::InvalidFilter("'$exists' expects a boolean".into())),
    };

    Ok(match operand {
        Operand::Id if expected => "1 = 1".to_string(),
        Operand::Id => "0 = 1".to_string(),
        Operand::Path(path) => {
            args.push(Arg::Text(path.clone()));
            let null = if expected { "is not null" } else { "is null" };
            format!("json_type(body, {PLACEHOLDER}) {null}")
        }
    })
}

fn field_clause(field: &str, value: &Bson, args: &mut Vec<Arg>) -> Result<String> {
    let operand = Operand::new(field)?;

    match value {
        Bson::Document(operators) if operators.keys().any(|k| k.starts_with('$')) => {
            let mut parts = Vec::new();
            for (op, value) in operators {
                parts.push(compare(&operand, op, value, args)?);
            }
            Ok(parts.join(" and "))
        }
        value => compare(&operand, "$eq", value, args),
    }
}

fn logical(op: &str, value: &Bson, args: &mut Vec<Arg>) -> Result<String> {
    let Bson::Array(filters) = value else {
        return Err(OdmError::InvalidFilter(format!("'{op}' expects an array")));
    };
    if filters.is_empty() {
        return Err(OdmError::InvalidFilter(format!("'{op}' expects a non empty array")));
    }

    let mut parts = Vec::new();
    for filter in filters {
        let Bson::Document(filter) = filter else {
            return Err(OdmError::InvalidFilter(format!("'{op}' expects documents")));
        };
        parts.push(format!("({})", where_clause(filter, args)?));
    }

    let joiner = if op == "$or" { " or " } else { " and " };
    Ok(format!("({})", parts.join(joiner)))
}

fn where_clause(filter: &Document, args: &mut Vec<Arg>) -> Result<String> {
    let mut parts = Vec::new();
    for (key, value) in filter {
        let part = match key.as_str() {
            "$and" | "$or" => logical(key, value, args)?,
            op if op.starts_with('$') => {
                return Err(OdmError::InvalidFilter(format!("unsupported operator '{op}'")));
            }
            field => field_clause(field, value, args)?,
        };
        parts.push(part);
    }

    if parts.is_empty() {
        Ok("1 = 1".to_string())
    } else {
        Ok(parts.join(" and "))
    }
}

pub fn to_select_query(filter: &Document) -> Result<Query> {
    let mut args = Vec::new();
    let placeholders = where_clause(filter, &mut args)?;
    Ok(Query { placeholders, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    fn texts(args: &[Arg]) -> Vec<String> {
        args.iter()
            .map(|arg| match arg {
                Arg::Text(s) => s.clone(),
                Arg::Integer(i) => i.to_string(),
                Arg::Real(f) => f.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let query = to_select_query(&doc! {}).unwrap();
        assert_eq!(query.placeholders, "1 = 1");
        assert!(query.args.is_empty());
    }

    #[test]
    fn equality_on_fields_and_id() {
        let oid = ObjectId::new();
        let query = to_select_query(&doc! { "_id": oid, "foo": "bar" }).unwrap();
        assert_eq!(query.placeholders, "id = ? and json_extract(body, ?) = ?");
        assert_eq!(
            texts(&query.args),
            vec![
                format!("{{\"$oid\":\"{}\"}}", oid.to_hex()),
                "$.\"foo\"".to_string(),
                "bar".to_string()
            ]
        );
    }

    #[test]
    fn operators_and_logical_combinations() {
        let query = to_select_query(&doc! {
            "$or": [ { "age": { "$gte": 18, "$lt": 30 } }, { "admin": true } ]
        })
        .unwrap();
        assert_eq!(
            query.placeholders,
            "((json_extract(body, ?) >= ? and json_extract(body, ?) < ?) or (json_extract(body, ?) = ?))"
        );
        assert_eq!(
            texts(&query.args),
            vec!["$.\"age\"", "18", "$.\"age\"", "30", "$.\"admin\"", "1"]
        );
    }

    #[test]
    fn null_and_membership() {
        let query = to_select_query(&doc! { "nested": null }).unwrap();
        assert_eq!(query.placeholders, "json_extract(body, ?) is null");

        let query = to_select_query(&doc! { "foo": { "$in": ["a", "b"] } }).unwrap();
        assert_eq!(query.placeholders, "(json_extract(body, ?) in (?, ?))");
        assert_eq!(texts(&query.args), vec!["$.\"foo\"", "a", "b"]);

        let query = to_select_query(&doc! { "foo": { "$nin": [] } }).unwrap();
        assert_eq!(query.placeholders, "1 = 1");
    }

    #[test]
    fn logical_operators_bind_before_sibling_fields() {
        let query = to_select_query(&doc! { "$or": [ { "a": 1 }, { "a": 2 } ], "b": 1 }).unwrap();
        assert_eq!(
            query.placeholders,
            "((json_extract(body, ?) = ?) or (json_extract(body, ?) = ?)) and json_extract(body, ?) = ?"
        );
        assert_eq!(texts(&query.args), vec!["$.\"a\"", "1", "$.\"a\"", "2", "$.\"b\"", "1"]);
    }

    #[test]
    fn nin_matches_missing_fields() {
        let query = to_select_query(&doc! { "foo": { "$nin": ["a"] } }).unwrap();
        assert_eq!(
            query.placeholders,
            "(json_extract(body, ?) is null or not (json_extract(body, ?) in (?)))"
        );
        assert_eq!(texts(&query.args), vec!["$.\"foo\"", "$.\"foo\"", "a"]);

        let query = to_select_query(&doc! { "foo": { "$nin": ["a", null] } }).unwrap();
        assert_eq!(
            query.placeholders,
            "not (json_extract(body, ?) in (?) or json_extract(body, ?) is null)"
        );
    }

    #[test]
    fn dotted_paths() {
        let query = to_select_query(&doc! { "nested.foo": "bar" }).unwrap();
        assert_eq!(texts(&query.args), vec!["$.\"nested\".\"foo\"", "bar"]);
    }

    #[test]
    fn unsupported_filters_are_rejected() {
        assert!(to_select_query(&doc! { "$where": "1" }).is_err());
        assert!(to_select_query(&doc! { "foo": { "$regex": "a" } }).is_err());
        assert!(to_select_query(&doc! { "$or": [] }).is_err());
        assert!(to_select_query(&doc! { "a..b": 1 }).is_err());
        assert!(to_select_query(&doc! { "age": { "$gt": null } }).is_err());
    }
}
