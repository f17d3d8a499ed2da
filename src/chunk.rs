//! Input chunks and their normalisation.
//!
//! A chunk maps entity keys to rows. Each value is either a plain row sequence
//! or an envelope carrying the rows under `data` next to arbitrary `metadata`:
//!
//! ```json
//! {
//!   "users":        [{"id": 1, "name": "Ada"}],
//!   "orders/eu":    {"data": [{"id": 7}], "metadata": {"page": 3}},
//!   "orders/empty": []
//! }
//! ```
//!
//! Chunks are `serde_json` objects with `preserve_order`, so keys and row
//! fields keep the order they were inserted in.

use crate::error::{Result, SinkError};
use serde_json::{Map, Value};

/// A batch of rows grouped by entity key.
pub type Chunk = Map<String, Value>;

/// One row: field name to value.
pub type Row = Map<String, Value>;

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Extract the row sequence stored under `key`.
///
/// Accepts a JSON array directly, or an object whose `data` and `metadata`
/// fields are both present and truthy (not `null`, `false`, `0` or `""`).
/// The envelope's `data` must then be an array.
///
/// # Errors
/// [`SinkError::InvalidEnvelope`] for an object with a missing or falsy field,
/// [`SinkError::InvalidData`] when the value (or `data`) is not an array.
pub fn rows_for<'a>(key: &str, value: &'a Value) -> Result<&'a [Value]> {
    let data = match value {
        Value::Object(envelope) => match (envelope.get("data"), envelope.get("metadata")) {
            (Some(data), Some(meta)) if is_truthy(data) && is_truthy(meta) => data,
            _ => {
                return Err(SinkError::InvalidEnvelope {
                    key: key.to_string(),
                });
            }
        },
        other => other,
    };
    data.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| SinkError::InvalidData {
            key: key.to_string(),
        })
}

/// JSON type name, for error messages.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fluent builder for [`Chunk`]s.
///
/// ```
/// use keyed_csv_sink::ChunkBuilder;
/// use serde_json::json;
///
/// let chunk = ChunkBuilder::new()
///     .rows("users", vec![json!({"id": 1, "name": "Ada"})])
///     .envelope("orders/eu", vec![json!({"id": 7})], json!({"page": 3}))
///     .build();
///
/// assert_eq!(chunk.len(), 2);
/// ```
#[derive(Default)]
pub struct ChunkBuilder {
    chunk: Chunk,
}

impl ChunkBuilder {
    /// Start an empty chunk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a plain row sequence under `key`.
    #[must_use]
    pub fn rows(mut self, key: impl Into<String>, rows: Vec<Value>) -> Self {
        self.chunk.insert(key.into(), Value::Array(rows));
        self
    }

    /// Add (or replace) a `{data, metadata}` envelope under `key`.
    #[must_use]
    pub fn envelope(mut self, key: impl Into<String>, rows: Vec<Value>, metadata: Value) -> Self {
        let mut envelope = Map::new();
        envelope.insert("data".to_string(), Value::Array(rows));
        envelope.insert("metadata".to_string(), metadata);
        self.chunk.insert(key.into(), Value::Object(envelope));
        self
    }

    /// Add serializable records under `key`.
    ///
    /// # Errors
    /// Fails if a record does not serialize to JSON.
    pub fn records<T: serde::Serialize>(
        mut self,
        key: impl Into<String>,
        records: &[T],
    ) -> serde_json::Result<Self> {
        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        self.chunk.insert(key.into(), Value::Array(rows));
        Ok(self)
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Chunk {
        self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_sequence() {
        let v = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(rows_for("k", &v).unwrap().len(), 2);
    }

    #[test]
    fn envelope_unwraps_data() {
        let v = json!({"data": [{"a": 1}], "metadata": {"n": 1}});
        assert_eq!(rows_for("k", &v).unwrap().len(), 1);
    }

    #[test]
    fn envelope_missing_metadata() {
        let v = json!({"data": [{"a": 1}]});
        let err = rows_for("users", &v).unwrap_err();
        assert!(matches!(err, SinkError::InvalidEnvelope { ref key } if key == "users"));
    }

    #[test]
    fn envelope_with_falsy_fields() {
        for v in [
            json!({"data": [{"a": 1}], "metadata": false}),
            json!({"data": [{"a": 1}], "metadata": 0}),
            json!({"data": [{"a": 1}], "metadata": ""}),
            json!({"data": null, "metadata": {}}),
            json!({"data": "", "metadata": {}}),
            json!({"metadata": {}}),
        ] {
            let err = rows_for("k", &v).unwrap_err();
            assert!(matches!(err, SinkError::InvalidEnvelope { .. }), "{v}");
        }
    }

    #[test]
    fn envelope_with_truthy_scalar_metadata() {
        let v = json!({"data": [{"a": 1}], "metadata": "page-1"});
        assert_eq!(rows_for("k", &v).unwrap().len(), 1);
    }

    #[test]
    fn envelope_with_non_array_data() {
        let v = json!({"data": "nope", "metadata": {}});
        let err = rows_for("users", &v).unwrap_err();
        assert!(matches!(err, SinkError::InvalidData { ref key } if key == "users"));
    }

    #[test]
    fn scalar_is_invalid_data() {
        let err = rows_for("k", &json!(42)).unwrap_err();
        assert!(err.to_string().contains("'k'"));
    }

    #[test]
    fn builder_keeps_insertion_order() {
        let chunk = ChunkBuilder::new()
            .rows("z", vec![])
            .rows("a", vec![])
            .build();
        let keys: Vec<_> = chunk.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
