use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;

use super::Payload;
use crate::{
    domain::{Issue, OutOptions},
    result::{IsrenError, Result},
};

/// Longest field a spreadsheet accepts in a single cell
pub const MAX_FIELD_CHARS: usize = 30_000;

/// Appended to fields cut at [`MAX_FIELD_CHARS`]
pub const TRUNCATION_MARKER: &str = " ...";

/// Row terminator of the csv output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RecordDelimiter {
    #[default]
    Unix,
    Windows,
    Mac,
    Ascii,
    Unicode,
    Custom(String),
}

impl From<String> for RecordDelimiter {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "unix" => RecordDelimiter::Unix,
            "windows" => RecordDelimiter::Windows,
            "mac" => RecordDelimiter::Mac,
            "ascii" => RecordDelimiter::Ascii,
            "unicode" => RecordDelimiter::Unicode,
            _ => RecordDelimiter::Custom(value),
        }
    }
}

impl RecordDelimiter {
    pub fn as_str(&self) -> &str {
        match self {
            RecordDelimiter::Unix => "\n",
            RecordDelimiter::Windows => "\r\n",
            RecordDelimiter::Mac => "\r",
            RecordDelimiter::Ascii => "\u{1e}",
            RecordDelimiter::Unicode => "\u{2028}",
            RecordDelimiter::Custom(delimiter) => delimiter,
        }
    }
}

/// Options of the csv output, read from the `out_options` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator
    pub delimiter: String,
    /// Quote every non-empty field
    pub quoted: bool,
    /// Quote empty fields
    pub quoted_empty: bool,
    /// Row terminator
    pub record_delimiter: RecordDelimiter,
    /// Emit a header row with the column names
    pub header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".into(),
            quoted: false,
            quoted_empty: false,
            record_delimiter: RecordDelimiter::Unix,
            header: true,
        }
    }
}

impl CsvOptions {
    /// Read the csv options, ignoring options of other formats
    pub fn from_out_options(options: &OutOptions) -> Result<Self> {
        serde_json::from_value(Value::Object(options.clone())).map_err(|e| {
            IsrenError::MalformedOptions { option: "--out-options", message: e.to_string() }
        })
    }

    fn needs_quotes(&self, field: &str) -> bool {
        if field.is_empty() {
            return self.quoted_empty;
        }

        self.quoted
            || field.contains(self.delimiter.as_str())
            || field.contains(['"', '\n', '\r'])
            || field.contains(self.record_delimiter.as_str())
    }

    fn escape(&self, field: &str) -> String {
        if self.needs_quotes(field) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn row<'a>(&self, fields: impl Iterator<Item = &'a str>) -> String {
        let line = fields.map(|f| self.escape(f)).join(&self.delimiter);
        format!("{line}{}", self.record_delimiter.as_str())
    }
}

/// Serialize issue records as csv text
pub(super) fn output(payload: Payload, out_options: &OutOptions) -> Result<Payload> {
    let records = match payload {
        Payload::Records(records) => records,
        Payload::Text(_) => return Err(IsrenError::CsvTransformOrder),
    };

    if matches!(records.first(), Some(Value::String(_))) {
        return Err(IsrenError::CsvTransformOrder);
    }

    let options = CsvOptions::from_out_options(out_options)?;
    Ok(Payload::Text(encode(&records, &options)))
}

/// Encode records with the columns of the first record
pub fn encode(records: &[Issue], options: &CsvOptions) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let columns = first
        .as_object()
        .map(|fields| fields.keys().cloned().collect_vec())
        .unwrap_or_default();

    let mut out = String::new();
    if options.header && !columns.is_empty() {
        out.push_str(&options.row(columns.iter().map(String::as_str)));
    }

    for record in records {
        let cells = columns
            .iter()
            .map(|column| truncate(cell(record.get(column))))
            .collect_vec();
        out.push_str(&options.row(cells.iter().map(String::as_str)));
    }

    out
}

/// String form of a field value
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "1".into(),
        Some(Value::Bool(false)) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn truncate(field: String) -> String {
    match field.char_indices().nth(MAX_FIELD_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &field[..cut]),
        None => field,
    }
}
