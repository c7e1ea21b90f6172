//! Document repository.
//!
//! Stores catalog documents as JSON text and filters them with SQLite's
//! JSON functions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::Result;
use crate::catalog::{Document, DocumentStore, FieldFilter};

/// SQLx implementation of DocumentStore.
pub struct SqlxDocumentStore {
    pool: SqlitePool,
}

impl SqlxDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// Bind a JSON scalar so it compares equal to what `json_extract` returns.
fn push_json_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Bool(b) => {
            builder.push_bind(i64::from(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                builder.push_bind(i);
            }
            None => {
                builder.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        other => {
            builder.push_bind(other.to_string());
        }
    }
}

fn row_to_document(id: String, data: &str) -> Result<Document> {
    let fields: Map<String, Value> = serde_json::from_str(data)?;
    Ok(Document::new(id, fields))
}

#[async_trait]
impl DocumentStore for SqlxDocumentStore {
    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());

        for filter in filters {
            let path = json_path(filter.field());
            match filter {
                FieldFilter::Equals { value, .. } => {
                    builder
                        .push(" AND json_extract(data, ")
                        .push_bind(path)
                        .push(") = ");
                    push_json_value(&mut builder, value);
                }
                FieldFilter::AtLeast { value, .. } => {
                    builder
                        .push(" AND json_extract(data, ")
                        .push_bind(path)
                        .push(") >= ")
                        .push_bind(*value);
                }
                FieldFilter::AtMost { value, .. } => {
                    builder
                        .push(" AND json_extract(data, ")
                        .push_bind(path)
                        .push(") <= ")
                        .push_bind(*value);
                }
                FieldFilter::Contains { value, .. } => {
                    builder
                        .push(" AND EXISTS (SELECT 1 FROM json_each(data, ")
                        .push_bind(path)
                        .push(") WHERE json_each.value = ");
                    push_json_value(&mut builder, value);
                    builder.push(")");
                }
            }
        }
        builder.push(" ORDER BY id");

        let rows: Vec<(String, String)> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(id, data)| row_to_document(id, &data))
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(id, data)| row_to_document(id, &data)).transpose()
    }

    async fn upsert(&self, collection: &str, document: &Document) -> Result<()> {
        let data = serde_json::to_string(&document.fields)?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES (?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                data = excluded.data,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(collection)
        .bind(&document.id)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
