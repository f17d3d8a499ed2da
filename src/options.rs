//! Sink configuration.
//!
//! [`SinkOptions`] carries everything about a sink except the collection name
//! and target directory: the key-separator pair, the pass-through
//! [`EncoderOptions`] for the CSV encoder, the per-file buffer size and the
//! output compression codec.
//!
//! Options can be built in code or deserialized from JSON; missing fields fall
//! back to their defaults.
//!
//! ```
//! use keyed_csv_sink::options::{QuoteStyle, SinkOptions};
//!
//! let opts = SinkOptions::from_json_str(r#"{
//!     "safe_entity_name_separator": "__",
//!     "encoder": { "delimiter": ";", "header": true, "quote_style": "always" }
//! }"#).unwrap();
//!
//! assert_eq!(opts.entity_name_separator, "/");
//! assert_eq!(opts.encoder.delimiter, ';');
//! assert_eq!(opts.encoder.quote_style, QuoteStyle::Always);
//! ```

use crate::error::{Result, SinkError};
use crate::io::compression::Compression;
use serde::{Deserialize, Serialize};

/// Default logical separator used inside entity keys.
pub const DEFAULT_ENTITY_NAME_SEPARATOR: &str = "/";

/// Default path-safe replacement for the logical separator.
pub const DEFAULT_SAFE_ENTITY_NAME_SEPARATOR: &str = "---";

/// Default number of encoded bytes buffered per output file before writing through.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Options shared by every channel a sink opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkOptions {
    /// Separator used in entity keys; its first occurrence is replaced in file names.
    pub entity_name_separator: String,
    /// Path-safe separator placed between collection and key, and substituted
    /// for the first logical separator.
    pub safe_entity_name_separator: String,
    /// Options forwarded to the CSV encoder.
    pub encoder: EncoderOptions,
    /// Bytes each channel buffers before handing them to its file.
    pub high_water_mark: usize,
    /// Codec applied to every output file.
    pub compression: Compression,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            entity_name_separator: DEFAULT_ENTITY_NAME_SEPARATOR.to_string(),
            safe_entity_name_separator: DEFAULT_SAFE_ENTITY_NAME_SEPARATOR.to_string(),
            encoder: EncoderOptions::default(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            compression: Compression::None,
        }
    }
}

impl SinkOptions {
    /// Parse options from a JSON document.
    ///
    /// # Errors
    /// Returns [`SinkError::Config`] if the document is malformed or the
    /// resulting options fail [`SinkOptions::validate`].
    pub fn from_json_str(s: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| SinkError::config(format!("parse options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check the options for values the sink cannot work with.
    ///
    /// # Errors
    /// Returns [`SinkError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.entity_name_separator.is_empty() {
            return Err(SinkError::config("entity_name_separator must not be empty"));
        }
        if self.safe_entity_name_separator.contains(['/', '\\']) {
            return Err(SinkError::config(format!(
                "safe_entity_name_separator {:?} must not contain path separators",
                self.safe_entity_name_separator
            )));
        }
        if self.high_water_mark == 0 {
            return Err(SinkError::config("high_water_mark must be greater than zero"));
        }
        if !self.compression.is_available() {
            return Err(SinkError::config(format!(
                "compression codec {} is not enabled in this build",
                self.compression.name()
            )));
        }
        self.encoder.validate()
    }
}

/// How fields are quoted. Mirrors [`csv::QuoteStyle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// Quote only fields that contain delimiters, quotes or line breaks.
    #[default]
    Necessary,
    /// Quote every field.
    Always,
    /// Quote every field that does not parse as a number.
    NonNumeric,
    /// Never quote.
    Never,
}

impl From<QuoteStyle> for csv::QuoteStyle {
    fn from(style: QuoteStyle) -> Self {
        match style {
            QuoteStyle::Necessary => Self::Necessary,
            QuoteStyle::Always => Self::Always,
            QuoteStyle::NonNumeric => Self::NonNumeric,
            QuoteStyle::Never => Self::Never,
        }
    }
}

/// Record terminator written after every line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDelimiter {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    Crlf,
}

impl From<RecordDelimiter> for csv::Terminator {
    fn from(d: RecordDelimiter) -> Self {
        match d {
            RecordDelimiter::Lf => Self::Any(b'\n'),
            RecordDelimiter::Crlf => Self::CRLF,
        }
    }
}

/// How JSON booleans are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanFormat {
    /// `true` becomes `1`, `false` becomes an empty field.
    #[default]
    Numeric,
    /// `true` / `false`.
    Literal,
}

/// Options forwarded to every per-key CSV encoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderOptions {
    /// Field delimiter (ASCII).
    pub delimiter: char,
    /// Quote character (ASCII).
    pub quote: char,
    /// When to quote fields.
    pub quote_style: QuoteStyle,
    /// Escape quotes by doubling them. When `false`, `escape` is used instead.
    pub double_quote: bool,
    /// Escape character used when `double_quote` is `false` (ASCII).
    pub escape: char,
    /// Line terminator.
    pub record_delimiter: RecordDelimiter,
    /// Write the column list as the first line of every file.
    pub header: bool,
    /// Prefix every file with a UTF-8 byte order mark.
    pub bom: bool,
    /// Rendering of boolean values.
    pub boolean_format: BooleanFormat,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            quote_style: QuoteStyle::Necessary,
            double_quote: true,
            escape: '\\',
            record_delimiter: RecordDelimiter::Lf,
            header: false,
            bom: false,
            boolean_format: BooleanFormat::Numeric,
        }
    }
}

impl EncoderOptions {
    fn validate(&self) -> Result<()> {
        for (name, c) in [
            ("delimiter", self.delimiter),
            ("quote", self.quote),
            ("escape", self.escape),
        ] {
            ascii_byte(name, c)?;
        }
        if self.delimiter == self.quote {
            return Err(SinkError::config("delimiter and quote must differ"));
        }
        Ok(())
    }

    /// Build a csv writer configuration from these options.
    pub(crate) fn writer_builder(&self, buffer_capacity: usize) -> Result<csv::WriterBuilder> {
        let mut builder = csv::WriterBuilder::new();
        builder
            .has_headers(false)
            .delimiter(ascii_byte("delimiter", self.delimiter)?)
            .quote(ascii_byte("quote", self.quote)?)
            .quote_style(self.quote_style.into())
            .double_quote(self.double_quote)
            .escape(ascii_byte("escape", self.escape)?)
            .terminator(self.record_delimiter.into())
            .buffer_capacity(buffer_capacity);
        Ok(builder)
    }
}

fn ascii_byte(name: &str, c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(SinkError::config(format!("{name} must be an ASCII character, got {c:?}")))
    }
}
