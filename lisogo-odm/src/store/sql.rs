//! Document store on top of sqlite.
//!
//! Each collection is a table named `"<database>.<collection>"` with two
//! columns: `id`, the relaxed extended json of the `_id` (primary key), and
//! `body`, the relaxed extended json of the whole document. Filters are
//! evaluated with `json_extract` over the body.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{Backend, FindOptions, Store};
use crate::db::query::{builder, Query};
use crate::error::{OdmError, Result};
use crate::utils::{display_id, storage_key, validate_collection_name};

pub struct SqlBackend {
    pool: SqlitePool,
}

impl SqlBackend {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        tracing::debug!(url = database_url, "connected to sqlite document store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Backend for SqlBackend {
    fn database(&self, name: &str) -> Arc<dyn Store> {
        Arc::new(SqlStore {
            pool: self.pool.clone(),
            name: name.to_string(),
        })
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        self.database(name).drop_database().await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct SqlStore {
    pool: SqlitePool,
    name: String,
}

fn to_body(document: &Document) -> Result<String> {
    let value = Bson::Document(document.clone()).into_relaxed_extjson();
    Ok(serde_json::to_string(&value)?)
}

fn from_body(body: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    match Bson::try_from(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(OdmError::Retrieve(format!(
            "stored body is not a document: {other}"
        ))),
    }
}

fn write_error(error: sqlx::Error, id: &Bson) -> OdmError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            OdmError::DuplicateKey(display_id(id))
        }
        _ => OdmError::Sql(error),
    }
}

/// Returns the document with an `_id`, generating an ObjectId in first
/// position when it has none.
fn with_id(document: Document) -> (Bson, Document) {
    if let Some(id) = document.get("_id") {
        return (id.clone(), document);
    }

    let id = Bson::ObjectId(ObjectId::new());
    let mut identified = Document::new();
    identified.insert("_id", id.clone());
    for (key, value) in document {
        identified.insert(key, value);
    }
    (id, identified)
}

impl SqlStore {
    fn table(&self, collection: &str) -> Result<String> {
        validate_collection_name(collection)?;
        Ok(format!("\"{}.{}\"", self.name, collection))
    }

    fn prefix(&self) -> String {
        format!("{}.", self.name)
    }

    async fn ensure_table(&self, collection: &str) -> Result<String> {
        let table = self.table(collection)?;
        let query = format!(
            "create table if not exists {table} (id text primary key not null, body text not null);"
        );

        tracing::trace!(
            "{}",
            sqlformat::format(
                &query,
                &sqlformat::QueryParams::None,
                &sqlformat::FormatOptions::default(),
            )
        );

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(table)
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn insert(&self, collection: &str, document: Document) -> Result<Bson> {
        let table = self.ensure_table(collection).await?;
        let (id, document) = with_id(document);

        let query = format!("insert into {table} (id, body) values (?, ?);");
        sqlx::query(&query)
            .bind(storage_key(&id))
            .bind(to_body(&document)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, &id))?;

        tracing::debug!(collection, id = %display_id(&id), "inserted document");
        Ok(id)
    }

    async fn upsert(&self, collection: &str, document: Document) -> Result<Bson> {
        let table = self.ensure_table(collection).await?;
        let (id, document) = with_id(document);

        let query = format!(
            "insert into {table} (id, body) values (?, ?) \
             on conflict(id) do update set body = excluded.body;"
        );
        sqlx::query(&query)
            .bind(storage_key(&id))
            .bind(to_body(&document)?)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, &id))?;

        tracing::debug!(collection, id = %display_id(&id), "saved document");
        Ok(id)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Document,
        mut document: Document,
    ) -> Result<Option<Bson>> {
        let table = self.ensure_table(collection).await?;
        let Query { placeholders, args } = builder::to_select_query(filter)?;

        let query = format!("select id, body from {table} where {placeholders} order by rowid limit 1;");
        let mut stream = sqlx::query(&query);
        binds!(args, stream);
        let Some(row) = stream.fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let key: String = row.try_get("id")?;
        let current = from_body(&row.try_get::<String, _>("body")?)?;
        let id = current.get("_id").cloned().unwrap_or(Bson::Null);

        match document.get("_id") {
            Some(new_id) if storage_key(new_id) != key => {
                return Err(OdmError::Persist(format!(
                    "the _id of a document is immutable (tried {} on {key})",
                    display_id(new_id)
                )));
            }
            Some(_) => {}
            None => {
                let mut identified = Document::new();
                identified.insert("_id", id.clone());
                for (key, value) in document {
                    identified.insert(key, value);
                }
                document = identified;
            }
        }

        let query = format!("update {table} set body = ? where id = ?;");
        sqlx::query(&query)
            .bind(to_body(&document)?)
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::debug!(collection, id = %display_id(&id), "replaced document");
        Ok(Some(id))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let table = self.ensure_table(collection).await?;
        let Query { placeholders, args } = builder::to_select_query(filter)?;

        let query =
            format!("select body from {table} where {placeholders} order by rowid limit ? offset ?;");
        let mut stream = sqlx::query(&query);
        binds!(args, stream);
        let limit = options.limit.map_or(-1, |limit| limit as i64);
        let skip = options.skip.unwrap_or(0) as i64;
        let rows = stream.bind(limit).bind(skip).fetch_all(&self.pool).await?;

        tracing::debug!(collection, found = rows.len(), "find");
        rows.iter()
            .map(|row| from_body(&row.try_get::<String, _>("body")?))
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64> {
        let table = self.ensure_table(collection).await?;
        let Query { placeholders, args } = builder::to_select_query(filter)?;

        let query = format!("select count(*) from {table} where {placeholders};");
        let mut stream = sqlx::query_scalar::<_, i64>(&query);
        binds!(args, stream);
        let count = stream.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn delete(&self, collection: &str, filter: &Document) -> Result<u64> {
        let table = self.ensure_table(collection).await?;
        let Query { placeholders, args } = builder::to_select_query(filter)?;

        let query = format!("delete from {table} where {placeholders};");
        let mut stream = sqlx::query(&query);
        binds!(args, stream);
        let result = stream.execute(&self.pool).await?;

        tracing::debug!(collection, removed = result.rows_affected(), "delete");
        Ok(result.rows_affected())
    }

    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.ensure_table(collection).await?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let table = self.table(collection)?;
        sqlx::query(&format!("drop table if exists {table};"))
            .execute(&self.pool)
            .await?;
        tracing::debug!(collection, "dropped collection");
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        let prefix = self.prefix();
        let names: Vec<String> = sqlx::query_scalar(
            "select name from sqlite_master where type = 'table' and substr(name, 1, ?) = ? order by name;",
        )
        .bind(prefix.len() as i64)
        .bind(prefix.clone())
        .fetch_all(&self.pool)
        .await?;

        Ok(names
            .into_iter()
            .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn drop_database(&self) -> Result<()> {
        for collection in self.collection_names().await? {
            self.drop_collection(&collection).await?;
        }
        tracing::debug!(database = %self.name, "dropped database");
        Ok(())
    }
}
