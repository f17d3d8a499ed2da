use keyed_csv_sink::testing::*;
use keyed_csv_sink::{ChunkBuilder, KeyedCsvSink, SinkError, SinkOptions, SinkState};
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("keyed_csv_sink=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn one_file_per_key_with_rows() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("users").target_dir(dir.path()).build()?;

    sink.write_chunk(&sample_users_chunk())?;
    let stats = sink.finish()?;

    assert_output_files(dir.path(), &["users---admins.csv", "users---guests.csv"]);
    assert_eq!(stats.files.len(), 2);
    assert_eq!(stats.total_rows(), 4);
    assert_eq!(stats.chunks, 1);
    assert_eq!(sink.state(), SinkState::Finished);
    Ok(())
}

#[test]
fn rows_are_written_in_order_with_default_encoding() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("users").target_dir(dir.path()).build()?;
    sink.write_chunk(&sample_users_chunk())?;
    sink.finish()?;

    assert_csv_rows(
        dir.path().join("users---admins.csv"),
        &[&["1", "Ada", "1"], &["2", "Grace", ""]],
    );
    assert_csv_rows(
        dir.path().join("users---guests.csv"),
        &[&["10", "Linus"], &["11", "Ken"]],
    );
    Ok(())
}

#[test]
fn empty_sequence_defers_file_creation() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;

    sink.write_chunk(&ChunkBuilder::new().rows("late", vec![]).build())?;
    assert!(sink.is_directory_ready());
    assert_eq!(sink.open_keys().count(), 0);
    assert_output_files(dir.path(), &[]);

    sink.write_chunk(&ChunkBuilder::new().rows("late", vec![json!({"x": 1})]).build())?;
    sink.write_chunk(&ChunkBuilder::new().rows("late", vec![json!({"x": 2})]).build())?;
    assert_eq!(sink.open_keys().collect::<Vec<_>>(), vec!["late"]);
    sink.finish()?;

    assert_output_files(dir.path(), &["c---late.csv"]);
    assert_csv_rows(dir.path().join("c---late.csv"), &[&["1"], &["2"]]);
    Ok(())
}

#[test]
fn column_order_is_frozen_by_first_row() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c")
        .target_dir(dir.path())
        .header(true)
        .build()?;

    sink.write_value(&json!({"k": [{"b": "b1", "a": "a1"}]}))?;
    sink.write_value(&json!({"k": [{"a": "a2", "b": "b2"}, {"a": "a3", "extra": "ignored"}]}))?;
    let stats = sink.finish()?;

    assert_eq!(stats.file("k").unwrap().columns, vec!["b", "a"]);
    assert_csv_rows(
        dir.path().join("c---k.csv"),
        &[&["b", "a"], &["b1", "a1"], &["b2", "a2"], &["", "a3"]],
    );
    Ok(())
}

#[test]
fn keys_are_escaped_into_file_names() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("col").target_dir(dir.path()).build()?;
    sink.write_chunk(&sample_nested_keys_chunk())?;
    sink.finish()?;

    assert_output_files(
        dir.path(),
        &["col.csv", "col---orders---eu_2024.csv", "col---orders_us.csv"],
    );
    assert_csv_rows(dir.path().join("col.csv"), &[&["root"]]);
    Ok(())
}

#[test]
fn a_b_c_uses_one_safe_separator() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("col").target_dir(dir.path()).build()?;
    assert_eq!(
        sink.path_for_key("a/b/c"),
        dir.path().join("col---a---b_c.csv")
    );
    sink.write_value(&json!({"a/b/c": [{"v": 1}]}))?;
    assert_eq!(
        sink.channel_path("a/b/c"),
        Some(dir.path().join("col---a---b_c.csv").as_path())
    );
    sink.finish()?;
    assert_output_files(dir.path(), &["col---a---b_c.csv"]);
    Ok(())
}

#[test]
fn custom_separators() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("col")
        .target_dir(dir.path())
        .entity_name_separator(".")
        .safe_entity_name_separator("__")
        .build()?;
    sink.write_value(&json!({"a.b/c": [{"v": 1}]}))?;
    sink.finish()?;
    assert_output_files(dir.path(), &["col__a__b_c.csv"]);
    Ok(())
}

#[test]
fn envelopes_and_plain_sequences_mix() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("e").target_dir(dir.path()).build()?;
    sink.write_chunk(&sample_envelope_chunk())?;
    sink.finish()?;

    assert_output_files(dir.path(), &["e---plain.csv", "e---wrapped.csv"]);
    assert_csv_rows(dir.path().join("e---wrapped.csv"), &[&["x"], &["y"]]);
    Ok(())
}

#[test]
fn invalid_data_fails_only_that_call() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;

    let err = sink
        .write_value(&json!({"good": [{"v": 1}], "bad": 5, "later": [{"v": 2}]}))
        .unwrap_err();
    assert!(matches!(err, SinkError::InvalidData { ref key } if key == "bad"));
    assert!(err.is_input_shape());
    assert_eq!(sink.state(), SinkState::Open);

    sink.write_value(&json!({"good": [{"v": 3}]}))?;
    let stats = sink.finish()?;

    assert_eq!(stats.chunks, 1);
    assert_output_files(dir.path(), &["c---good.csv"]);
    assert_csv_rows(dir.path().join("c---good.csv"), &[&["1"], &["3"]]);
    Ok(())
}

#[test]
fn envelope_without_metadata_is_rejected() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;
    let err = sink
        .write_value(&json!({"k": {"data": [{"v": 1}]}}))
        .unwrap_err();
    assert!(matches!(err, SinkError::InvalidEnvelope { ref key } if key == "k"));
    assert!(err.to_string().contains("'k'"));
    sink.finish()?;
    assert_output_files(dir.path(), &[]);
    Ok(())
}

#[test]
fn invalid_rows() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;

    let err = sink.write_value(&json!({"first": [7]})).unwrap_err();
    assert!(matches!(err, SinkError::InvalidRow { index: 0, .. }));

    let err = sink
        .write_value(&json!({"second": [{"v": 1}, "oops"]}))
        .unwrap_err();
    assert!(matches!(err, SinkError::InvalidRow { ref key, index: 1 } if key == "second"));

    sink.finish()?;
    assert_output_files(dir.path(), &["c---second.csv"]);
    assert_csv_rows(dir.path().join("c---second.csv"), &[&["1"]]);
    Ok(())
}

#[test]
fn non_object_chunk_is_rejected() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;
    let err = sink.write_value(&json!([{"v": 1}])).unwrap_err();
    assert!(matches!(err, SinkError::InvalidChunk { found: "array" }));
    assert!(!sink.is_directory_ready());
    Ok(())
}

#[test]
fn closed_after_finish() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("c").target_dir(dir.path()).build()?;
    sink.finish()?;
    let err = sink.write_chunk(&sample_users_chunk()).unwrap_err();
    assert!(matches!(
        err,
        SinkError::Closed {
            state: SinkState::Finished
        }
    ));
    Ok(())
}

#[test]
fn round_trip_preserves_values() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("rt").target_dir(dir.path()).build()?;

    let rows = vec![
        json!({"text": "plain", "n": 1}),
        json!({"text": "comma, inside", "n": -2.5}),
        json!({"text": "quote \" inside", "n": 0}),
        json!({"text": "line\nbreak", "n": 1e3}),
        json!({"text": "", "n": null}),
    ];
    sink.write_chunk(&ChunkBuilder::new().rows("k", rows).build())?;
    sink.finish()?;

    let records = read_csv_records(dir.path().join("rt---k.csv"), b',')?;
    assert_eq!(
        records,
        vec![
            vec!["plain", "1"],
            vec!["comma, inside", "-2.5"],
            vec!["quote \" inside", "0"],
            vec!["line\nbreak", "1000.0"],
            vec!["", ""],
        ]
    );
    Ok(())
}

#[test]
fn encoder_options_pass_through() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let options = SinkOptions::from_json_str(
        r#"{
            "encoder": {
                "delimiter": ";",
                "header": true,
                "quote_style": "always",
                "record_delimiter": "crlf",
                "boolean_format": "literal"
            }
        }"#,
    )?;
    let mut sink = KeyedCsvSink::new("o", Some(dir.path().to_path_buf()), options)?;
    sink.write_value(&json!({"k": [{"id": 1, "ok": false}]}))?;
    sink.finish()?;

    let text = fs::read_to_string(dir.path().join("o---k.csv"))?;
    assert_eq!(text, "\"id\";\"ok\"\r\n\"1\";\"false\"\r\n");
    Ok(())
}

#[test]
fn serializable_records_via_builder() -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct Order {
        id: u32,
        region: &'static str,
    }

    let dir = TempDirPath::new()?;
    let chunk = ChunkBuilder::new()
        .records(
            "orders",
            &[
                Order { id: 1, region: "eu" },
                Order { id: 2, region: "us" },
            ],
        )?
        .build();
    let mut sink = KeyedCsvSink::builder("s").target_dir(dir.path()).build()?;
    sink.write_chunk(&chunk)?;
    let stats = sink.finish()?;

    assert_eq!(stats.file("orders").unwrap().columns, vec!["id", "region"]);
    assert_csv_rows(dir.path().join("s---orders.csv"), &[&["1", "eu"], &["2", "us"]]);
    Ok(())
}

#[test]
fn many_keys_stay_open_concurrently() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("w")
        .target_dir(dir.path())
        .high_water_mark(32)
        .build()?;

    for _ in 0..3 {
        sink.write_chunk(&wide_chunk(200, 5))?;
    }
    assert_eq!(sink.open_keys().count(), 200);
    let stats = sink.finish()?;

    assert_eq!(stats.files.len(), 200);
    assert_eq!(stats.total_rows(), 200 * 5 * 3);
    assert_eq!(list_files(dir.path())?.len(), 200);
    let records = read_csv_records(dir.path().join("w---k137.csv"), b',')?;
    assert_eq!(records.len(), 15);
    assert!(records.iter().all(|r| r[1] == "k137"));
    Ok(())
}

#[test]
fn stats_report_files_in_opening_order() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("u").target_dir(dir.path()).build()?;
    sink.write_chunk(&sample_users_chunk())?;
    let stats = sink.finish()?;

    let keys: Vec<_> = stats.files.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["admins", "guests"]);
    let admins = stats.file("admins").unwrap();
    assert_eq!(admins.columns, vec!["id", "name", "active"]);
    assert_eq!(admins.rows, 2);
    assert_eq!(admins.bytes, fs::metadata(&admins.path)?.len());

    let report = dir.child("stats.json");
    stats.save_to_file(&report)?;
    let parsed: Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(parsed["chunks"], 1);
    assert_eq!(parsed["files"][1]["key"], "guests");
    Ok(())
}

#[test]
fn write_all_drives_and_finishes() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("p").target_dir(dir.path()).build()?;
    let chunks = (0..3).map(|i| ChunkBuilder::new().rows("k", vec![json!({"i": i})]).build());

    let stats = sink.write_all(chunks)?;

    assert_eq!(stats.chunks, 3);
    assert_eq!(sink.state(), SinkState::Finished);
    assert_csv_rows(dir.path().join("p---k.csv"), &[&["0"], &["1"], &["2"]]);
    Ok(())
}

#[test]
fn write_all_aborts_on_shape_error() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mut sink = KeyedCsvSink::builder("p").target_dir(dir.path()).build()?;
    let chunks = vec![
        ChunkBuilder::new().rows("k", vec![json!({"i": 1})]).build(),
        serde_json::from_value(json!({"k": "not rows"}))?,
    ];

    let err = sink.write_all(chunks).unwrap_err();
    assert!(matches!(err, SinkError::InvalidData { .. }));
    assert_eq!(sink.state(), SinkState::Aborted);
    Ok(())
}

fn finish_with_keys(keys: &[&str]) -> anyhow::Result<(TempDirPath, FaultyFs)> {
    let dir = TempDirPath::new()?;
    let fs = FaultyFs::new();
    let mut sink = KeyedCsvSink::builder("c")
        .target_dir(dir.path())
        .filesystem(Arc::new(fs.clone()))
        .build()?;
    for key in keys {
        sink.write_chunk(&ChunkBuilder::new().rows(*key, vec![json!({"v": 1})]).build())?;
    }
    let stats = sink.finish()?;
    let opened: Vec<_> = stats.files.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(opened, keys);
    Ok((dir, fs))
}

#[cfg(not(feature = "parallel-io"))]
#[test]
fn finish_ends_channels_in_reverse_opening_order() -> anyhow::Result<()> {
    let (dir, fs) = finish_with_keys(&["a", "b", "c"])?;
    let expected: Vec<_> = ["c---c.csv", "c---b.csv", "c---a.csv"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();
    assert_eq!(fs.dropped_files(), expected);
    Ok(())
}

#[cfg(feature = "parallel-io")]
#[test]
fn finish_ends_every_channel_in_parallel() -> anyhow::Result<()> {
    let (dir, fs) = finish_with_keys(&["a", "b", "c"])?;
    let mut dropped = fs.dropped_files();
    dropped.sort();
    let expected: Vec<_> = ["c---a.csv", "c---b.csv", "c---c.csv"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();
    assert_eq!(dropped, expected);
    assert_csv_rows(dir.path().join("c---b.csv"), &[&["1"]]);
    Ok(())
}
