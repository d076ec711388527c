/// Document store boundary
///
/// Every record the application owns (user profiles, tasks, credentials) lives
/// in a collection-scoped document store. This module defines the contract the
/// rest of the crate programs against, plus the two backends:
///
/// - [`memory::MemoryStore`]: in-process store used in tests and single-node
///   deployments without a database
/// - [`postgres::PgDocumentStore`]: JSONB documents in PostgreSQL
///
/// # Query Model
///
/// A [`Query`] is a conjunction of field filters with an optional single-field
/// ordering:
///
/// - equality: `field == value`
/// - membership: `field IN (v1, v2, ...)`
/// - range: `<`, `<=`, `>`, `>=`
///
/// Values are only comparable with values of the same JSON type. Ordering on a
/// field excludes documents that don't have that field at all.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::store::{memory::MemoryStore, DocumentStore, Fields, Query};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
///
/// let doc = store
///     .create("tasks", Fields::new().set("title", json!("Write report")).server_timestamp("createdAt"))
///     .await?;
///
/// let recent = store
///     .query("tasks", &Query::new().where_eq("title", json!("Write report")).order_by_desc("createdAt"))
///     .await?;
/// assert_eq!(recent[0].id, doc.id);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

/// Length of auto-generated document ids
pub const DOCUMENT_ID_LEN: usize = 20;

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Target document doesn't exist (update on a missing id)
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// Backend database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value is not a JSON object
    #[error("Malformed document {collection}/{id}")]
    Malformed { collection: String, id: String },

    /// Store is not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document: its id plus the JSON object body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id, unique within its collection
    pub id: String,

    /// Document fields
    pub data: Map<String, JsonValue>,
}

impl Document {
    /// Returns a field value, if present
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.data.get(field)
    }

    /// Returns a string field, if present and a string
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(JsonValue::as_str)
    }

    /// Decodes the document body into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(JsonValue::Object(self.data.clone()))?)
    }
}

/// A set of field writes
///
/// Plain values are written as given. Fields marked with
/// [`Fields::server_timestamp`] are filled in by the store with its own clock
/// at write time, as an RFC 3339 UTC string with microsecond precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: Map<String, JsonValue>,
    server_timestamps: Vec<String>,
}

impl Fields {
    /// Creates an empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a write set from a serializable record
    ///
    /// The record must serialize to a JSON object. `null` fields are kept,
    /// so callers that want to leave a field untouched should skip it with
    /// `#[serde(skip_serializing_if = "Option::is_none")]`.
    pub fn from_record<T: serde::Serialize>(record: &T) -> StoreResult<Self> {
        match serde_json::to_value(record)? {
            JsonValue::Object(values) => Ok(Self {
                values,
                server_timestamps: Vec::new(),
            }),
            other => Err(StoreError::Serialization(serde::de::Error::custom(format!(
                "expected a JSON object, got {}",
                other
            )))),
        }
    }

    /// Sets a field to a value
    pub fn set(mut self, field: impl Into<String>, value: JsonValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Marks a field to receive the store's timestamp at write time
    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.values.remove(&field);
        self.server_timestamps.push(field);
        self
    }

    /// Plain field values
    pub fn values(&self) -> &Map<String, JsonValue> {
        &self.values
    }

    /// Fields to be stamped by the store
    pub fn server_timestamp_fields(&self) -> &[String] {
        &self.server_timestamps
    }

    /// Returns true if there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.server_timestamps.is_empty()
    }
}

/// Filter comparison operator
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// `field == value`
    Eq(JsonValue),

    /// `field IN values`
    In(Vec<JsonValue>),

    /// `field < value`
    Lt(JsonValue),

    /// `field <= value`
    Lte(JsonValue),

    /// `field > value`
    Gt(JsonValue),

    /// `field >= value`
    Gte(JsonValue),
}

/// A single field filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,

    /// Comparison
    pub op: FilterOp,
}

impl Filter {
    /// Evaluates the filter against a document body
    pub fn matches(&self, data: &Map<String, JsonValue>) -> bool {
        let Some(actual) = data.get(&self.field) else {
            return false;
        };

        match &self.op {
            FilterOp::Eq(expected) => compare_values(actual, expected) == Some(Ordering::Equal),
            FilterOp::In(candidates) => candidates
                .iter()
                .any(|c| compare_values(actual, c) == Some(Ordering::Equal)),
            FilterOp::Lt(bound) => compare_values(actual, bound) == Some(Ordering::Less),
            FilterOp::Lte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt(bound) => compare_values(actual, bound) == Some(Ordering::Greater),
            FilterOp::Gte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,

    /// Largest first
    Descending,
}

/// Single-field ordering
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field to sort on
    pub field: String,

    /// Sort direction
    pub direction: Direction,
}

/// A collection query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunctive filters
    pub filters: Vec<Filter>,

    /// Optional ordering
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Creates a query that matches every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
        });
        self
    }

    /// Adds an equality filter
    pub fn where_eq(self, field: impl Into<String>, value: JsonValue) -> Self {
        self.filter(field, FilterOp::Eq(value))
    }

    /// Adds a membership filter
    pub fn where_in(self, field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.filter(field, FilterOp::In(values))
    }

    /// Orders by a field, ascending
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Orders by a field, descending
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction: Direction::Descending,
        });
        self
    }

    /// Returns true if the document body satisfies every filter and has the
    /// ordering field (if any)
    pub fn matches(&self, data: &Map<String, JsonValue>) -> bool {
        if let Some(order) = &self.order_by {
            if !data.contains_key(&order.field) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(data))
    }
}

/// Compares two JSON values of the same type
///
/// Returns `None` for values of different types (or non-scalar values), which
/// makes them fail every filter.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Generates a new random document id
pub fn generate_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}

/// Document store contract
///
/// Implementations must be safe to share across tasks; callers hold them as
/// `Arc<dyn DocumentStore>`. Each operation reads or writes one document (or
/// one collection scan) independently: there are no transactions and
/// concurrent writes to the same document are last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Runs a query against a collection
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Creates a document with a generated id
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Document>;

    /// Creates or replaces a document with a caller-chosen id
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document>;

    /// Merges fields into an existing document
    ///
    /// Fails with [`StoreError::NotFound`] if the document doesn't exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document>;

    /// Deletes a document, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Checks that the store is reachable
    async fn ping(&self) -> StoreResult<()>;
}
