//! Pre-built chunks for common sink scenarios.

use crate::chunk::{Chunk, ChunkBuilder};
use serde_json::json;

/// Two keys with two rows each, plus an empty sequence for a third key.
///
/// Writing it produces `<collection>---admins.csv` and `<collection>---guests.csv`.
///
/// # Example
///
/// ```
/// use keyed_csv_sink::testing::sample_users_chunk;
///
/// let chunk = sample_users_chunk();
/// assert_eq!(chunk.len(), 3);
/// ```
#[must_use]
pub fn sample_users_chunk() -> Chunk {
    ChunkBuilder::new()
        .rows(
            "admins",
            vec![
                json!({"id": 1, "name": "Ada", "active": true}),
                json!({"id": 2, "name": "Grace", "active": false}),
            ],
        )
        .rows(
            "guests",
            vec![
                json!({"id": 10, "name": "Linus"}),
                json!({"id": 11, "name": "Ken"}),
            ],
        )
        .rows("banned", vec![])
        .build()
}

/// Keys that need escaping: nested separators, backslashes and the empty key.
#[must_use]
pub fn sample_nested_keys_chunk() -> Chunk {
    ChunkBuilder::new()
        .rows("", vec![json!({"v": "root"})])
        .rows("orders/eu/2024", vec![json!({"v": "eu"})])
        .rows(r"orders\us", vec![json!({"v": "us"})])
        .build()
}

/// A chunk mixing a plain sequence with a `{data, metadata}` envelope.
#[must_use]
pub fn sample_envelope_chunk() -> Chunk {
    ChunkBuilder::new()
        .rows("plain", vec![json!({"a": 1})])
        .envelope(
            "wrapped",
            vec![json!({"b": "x"}), json!({"b": "y"})],
            json!({"page": 1, "total": 2}),
        )
        .build()
}

/// `keys` keys named `k0`, `k1`, … each with `rows_per_key` rows of `{seq, key}`.
#[must_use]
pub fn wide_chunk(keys: usize, rows_per_key: usize) -> Chunk {
    (0..keys)
        .fold(ChunkBuilder::new(), |b, k| {
            let rows = (0..rows_per_key)
                .map(|seq| json!({"seq": seq, "key": format!("k{k}")}))
                .collect();
            b.rows(format!("k{k}"), rows)
        })
        .build()
}
