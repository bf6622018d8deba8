/// A macro to build a filter document in the mongodb query dialect.
///
/// It supports equality lists and single comparisons with the operators
/// `=`, `==`, `!=`, `<`, `<=`, `>`, `>=`. Filters are combined with the
/// [`And`](crate::db::query::condition::And) and
/// [`Or`](crate::db::query::condition::Or) traits.
///
/// # Example
///
/// ```
/// use lisogo_odm::prelude::*;
///
/// let by_name = filter!(name = "joe", role = "admin");
/// let adults = filter!(age >= 18).and(filter!(banned != true));
/// assert_eq!(by_name, doc! { "name": "joe", "role": "admin" });
/// assert_eq!(
///     adults,
///     doc! { "$and": [ { "age": { "$gte": 18 } }, { "banned": { "$ne": true } } ] }
/// );
/// ```
#[macro_export]
macro_rules! filter {
    (@op =) => { "$eq" };
    (@op ==) => { "$eq" };
    (@op !=) => { "$ne" };
    (@op <) => { "$lt" };
    (@op <=) => { "$lte" };
    (@op >) => { "$gt" };
    (@op >=) => { "$gte" };

    () => { $crate::bson::Document::new() };

    ($($field:ident = $value:expr),+ $(,)?) => {
        {
            let mut filter = $crate::bson::Document::new();
            $(
                filter.insert(stringify!($field), $crate::bson::Bson::from($value));
            )+
            filter
        }
    };

    ($field:ident $op:tt $value:expr) => {
        $crate::db::query::condition::compare(
            stringify!($field),
            $crate::filter!(@op $op),
            $crate::bson::Bson::from($value),
        )
    };
}

#[cfg(feature = "sqlite")]
macro_rules! binds {
    ($args:expr, $stream:expr) => {{
        for arg in $args {
            $stream = match arg {
                $crate::db::query::Arg::Text(value) => $stream.bind(value),
                $crate::db::query::Arg::Integer(value) => $stream.bind(value),
                $crate::db::query::Arg::Real(value) => $stream.bind(value),
            };
        }
    }};
}
