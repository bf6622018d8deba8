//! Filters in the mongodb query dialect and their translation for the sql
//! store.
pub mod builder;
pub mod condition;

/// A value bound to a sql placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Integer(i64),
    Real(f64),
}

#[derive(Default, Debug)]
pub struct Query {
    pub placeholders: String,
    pub args: Vec<Arg>,
}
