//! Row encoding for one output file.
//!
//! [`CsvEncoder`] owns the frozen column list of a key and turns JSON rows into
//! CSV records in that column order. Quoting, escaping and delimiters come from
//! the `csv` crate configured by [`EncoderOptions`].

use crate::chunk::Row;
use crate::options::{BooleanFormat, EncoderOptions};
use serde_json::Value;
use std::borrow::Cow;
use std::io::Write;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV encoder bound to a fixed column list.
pub struct CsvEncoder<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    boolean_format: BooleanFormat,
    rows_written: u64,
}

impl<W: Write> CsvEncoder<W> {
    /// Create an encoder over `out`, writing the BOM and header line if enabled.
    ///
    /// # Errors
    /// Fails if the BOM or header cannot be written.
    pub fn new(
        mut out: W,
        builder: &csv::WriterBuilder,
        columns: Vec<String>,
        options: &EncoderOptions,
    ) -> csv::Result<Self> {
        if options.bom {
            out.write_all(UTF8_BOM)?;
        }
        let mut writer = builder.from_writer(out);
        if options.header {
            writer.write_record(&columns)?;
        }
        Ok(Self {
            writer,
            columns,
            boolean_format: options.boolean_format,
            rows_written: 0,
        })
    }

    /// Column order used for every record.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows encoded so far (the header is not counted).
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Encode one row. Fields missing from the row are left empty; fields not in
    /// the column list are ignored.
    ///
    /// With an empty column list (the key's first row was `{}`) every row is a
    /// record of one empty field, which `csv` writes as `""`. Each row stays a
    /// line of its own, so row counts survive a read-back.
    ///
    /// # Errors
    /// Propagates encoder or underlying write failures.
    pub fn write_row(&mut self, row: &Row) -> csv::Result<()> {
        for column in &self.columns {
            let field = render_field(row.get(column), self.boolean_format);
            self.writer.write_field(field.as_bytes())?;
        }
        self.writer.write_record(None::<&[u8]>)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Flush buffered records and return the underlying writer.
    ///
    /// # Errors
    /// Fails if flushing the buffered records fails.
    pub fn into_inner(self) -> std::io::Result<W> {
        self.writer.into_inner().map_err(csv::IntoInnerError::into_error)
    }
}

/// Render one JSON value as CSV field text.
fn render_field(value: Option<&Value>, format: BooleanFormat) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(Value::Bool(b)) => Cow::Borrowed(match (format, *b) {
            (BooleanFormat::Numeric, true) => "1",
            (BooleanFormat::Numeric, false) => "",
            (BooleanFormat::Literal, true) => "true",
            (BooleanFormat::Literal, false) => "false",
        }),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => Cow::Owned(nested.to_string()),
    }
}
