/// PostgreSQL document store
///
/// Stores every collection in one JSONB table:
///
/// ```sql
/// CREATE TABLE documents (
///     collection VARCHAR(100) NOT NULL,
///     id VARCHAR(128) NOT NULL,
///     data JSONB NOT NULL DEFAULT '{}',
///     PRIMARY KEY (collection, id)
/// );
/// ```
///
/// Queries are translated into JSONB expressions. Field names and values are
/// always bound as parameters, never interpolated:
///
/// ```text
/// Eq(v)     =>  (data -> $f) = $v
/// In(vs)    =>  ((data -> $f) = $v1 OR (data -> $f) = $v2 ...)
/// Gt(v)     =>  jsonb_typeof(data -> $f) = jsonb_typeof($v) AND (data -> $f) > $v
/// order by  =>  (data -> $f) IS NOT NULL ... ORDER BY data -> $f DESC
/// ```
///
/// Server timestamps use the database clock (`NOW()`), formatted the same way
/// as the in-memory store so both backends sort identically.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::postgres::PgDocumentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgDocumentStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::Arguments;

use super::{
    generate_document_id, Direction, Document, DocumentStore, Fields, FilterOp, Query,
    StoreError, StoreResult,
};

/// SQL expression producing the server timestamp as RFC 3339 UTC (microseconds)
const SERVER_TIMESTAMP_SQL: &str =
    r#"to_jsonb(to_char(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.US"Z"'))"#;

/// PostgreSQL-backed [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

/// Accumulates SQL text and its bound arguments
struct SqlBuilder {
    sql: String,
    args: PgArguments,
    count: usize,
}

impl SqlBuilder {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: PgArguments::default(),
            count: 0,
        }
    }

    fn bind_text(&mut self, value: &str) -> String {
        self.args.add(value.to_string());
        self.count += 1;
        format!("${}::text", self.count)
    }

    fn bind_json(&mut self, value: &JsonValue) -> String {
        self.args.add(value.clone());
        self.count += 1;
        format!("${}::jsonb", self.count)
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    async fn fetch_all(self, pool: &PgPool) -> Result<Vec<(String, JsonValue)>, sqlx::Error> {
        let Self { sql, args, .. } = self;
        sqlx::query_as_with::<_, (String, JsonValue), _>(&sql, args)
            .fetch_all(pool)
            .await
    }

    async fn fetch_optional(
        self,
        pool: &PgPool,
    ) -> Result<Option<(String, JsonValue)>, sqlx::Error> {
        let Self { sql, args, .. } = self;
        sqlx::query_as_with::<_, (String, JsonValue), _>(&sql, args)
            .fetch_optional(pool)
            .await
    }

    async fn fetch_one(self, pool: &PgPool) -> Result<(String, JsonValue), sqlx::Error> {
        let Self { sql, args, .. } = self;
        sqlx::query_as_with::<_, (String, JsonValue), _>(&sql, args)
            .fetch_one(pool)
            .await
    }
}

impl PgDocumentStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn to_document(
        collection: &str,
        (id, data): (String, JsonValue),
    ) -> StoreResult<Document> {
        match data {
            JsonValue::Object(data) => Ok(Document { id, data }),
            _ => Err(StoreError::Malformed {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    /// Builds `<base> || jsonb_build_object(<field>, <now>, ...)` for the
    /// stamped fields of a write
    fn stamped_body(builder: &mut SqlBuilder, fields: &Fields) -> String {
        let body = builder.bind_json(&JsonValue::Object(fields.values().clone()));
        let stamps = fields.server_timestamp_fields();
        if stamps.is_empty() {
            return body;
        }

        let pairs: Vec<String> = stamps
            .iter()
            .map(|field| format!("{}, {}", builder.bind_text(field), SERVER_TIMESTAMP_SQL))
            .collect();
        format!("({} || jsonb_build_object({}))", body, pairs.join(", "))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, (String, JsonValue)>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::to_document(collection, row)).transpose()
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let mut builder = SqlBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        let collection_param = builder.bind_text(collection);
        builder.push(&collection_param);

        for filter in &query.filters {
            let field = builder.bind_text(&filter.field);
            let clause = match &filter.op {
                FilterOp::Eq(value) => {
                    format!("(data -> {}) = {}", field, builder.bind_json(value))
                }
                FilterOp::In(values) if values.is_empty() => "FALSE".to_string(),
                FilterOp::In(values) => {
                    let alternatives: Vec<String> = values
                        .iter()
                        .map(|v| format!("(data -> {}) = {}", field, builder.bind_json(v)))
                        .collect();
                    format!("({})", alternatives.join(" OR "))
                }
                FilterOp::Lt(value) => range_clause(&mut builder, &field, "<", value),
                FilterOp::Lte(value) => range_clause(&mut builder, &field, "<=", value),
                FilterOp::Gt(value) => range_clause(&mut builder, &field, ">", value),
                FilterOp::Gte(value) => range_clause(&mut builder, &field, ">=", value),
            };
            builder.push(" AND ");
            builder.push(&clause);
        }

        if let Some(order) = &query.order_by {
            let field = builder.bind_text(&order.field);
            let direction = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            builder.push(&format!(
                " AND (data -> {field}) IS NOT NULL ORDER BY data -> {field} {direction}, id"
            ));
        }

        let rows = builder.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| Self::to_document(collection, row))
            .collect()
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let id = generate_document_id();
        let mut builder = SqlBuilder::new("INSERT INTO documents (collection, id, data) VALUES (");
        let collection_param = builder.bind_text(collection);
        let id_param = builder.bind_text(&id);
        let body = Self::stamped_body(&mut builder, &fields);
        builder.push(&format!(
            "{}, {}, {}) RETURNING id, data",
            collection_param, id_param, body
        ));

        let row = builder.fetch_one(&self.pool).await?;
        Self::to_document(collection, row)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        let mut builder = SqlBuilder::new("INSERT INTO documents (collection, id, data) VALUES (");
        let collection_param = builder.bind_text(collection);
        let id_param = builder.bind_text(id);
        let body = Self::stamped_body(&mut builder, &fields);
        builder.push(&format!(
            "{}, {}, {}) ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data RETURNING id, data",
            collection_param, id_param, body
        ));

        let row = builder.fetch_one(&self.pool).await?;
        Self::to_document(collection, row)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        let mut builder = SqlBuilder::new("UPDATE documents SET data = data || ");
        let body = Self::stamped_body(&mut builder, &fields);
        builder.push(&body);
        builder.push(" WHERE collection = ");
        let collection_param = builder.bind_text(collection);
        builder.push(&collection_param);
        builder.push(" AND id = ");
        let id_param = builder.bind_text(id);
        builder.push(&id_param);
        builder.push(" RETURNING id, data");

        let row = builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        Self::to_document(collection, row)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn range_clause(builder: &mut SqlBuilder, field: &str, op: &str, value: &JsonValue) -> String {
    let bound = builder.bind_json(value);
    format!(
        "(jsonb_typeof(data -> {field}) = jsonb_typeof({bound}) AND (data -> {field}) {op} {bound})"
    )
}
