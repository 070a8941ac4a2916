//! Output pipeline
//!
//! Formats run left to right and each one receives what the previous one
//! returned: `json,console` prints the serialized string, while
//! `console,json` prints the records and then serializes them.

mod console;
mod csv;
mod file;
mod json;

use std::{io::Write, path::PathBuf, str::FromStr};

use compact_str::CompactString;
use tracing::debug;

use crate::{
    domain::{Issue, OutOptions},
    result::{IsrenError, Result},
    util::normalize_tokens,
};

/// Formats used when none are selected
pub const DEFAULT_OUTPUT: [&str; 2] = ["json", "console"];

/// Value flowing between output stages
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Issue records, as fetched and transformed
    Records(Vec<Issue>),
    /// Text produced by a serializing stage
    Text(String),
}

impl From<Vec<Issue>> for Payload {
    fn from(records: Vec<Issue>) -> Self {
        Payload::Records(records)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl Payload {
    /// Render the payload the way the console and file outputs write it
    pub fn render(&self) -> Result<String> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Records(records) => serde_json::to_string_pretty(records)
                .map_err(|e| IsrenError::General(e.to_string().into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
    Csv,
    File,
}

impl FromStr for OutputFormat {
    type Err = IsrenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "file" => Ok(OutputFormat::File),
            _ => Err(IsrenError::UnknownOutput { format: s.into() }),
        }
    }
}

impl OutputFormat {
    fn apply(
        self,
        payload: Payload,
        config: &OutputConfig,
        stdout: &mut dyn Write,
    ) -> Result<Payload> {
        debug!(format = ?self, "Running output stage");
        match self {
            OutputFormat::Console => console::output(payload, stdout),
            OutputFormat::Json => json::output(payload),
            OutputFormat::Csv => csv::output(payload, &config.out_options),
            OutputFormat::File => file::output(payload, config.file.as_deref()),
        }
    }
}

/// Output selection and the options of the selected formats
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Format tokens, in pipeline order
    pub out: Vec<CompactString>,
    /// Format specific options, e.g. the csv delimiter
    pub out_options: OutOptions,
    /// Destination of the `file` output
    pub file: Option<PathBuf>,
}

impl OutputConfig {
    /// Resolve the format tokens into pipeline stages
    ///
    /// An unknown token anywhere fails the whole plan, so no stage runs.
    pub fn plan(&self) -> Result<Vec<OutputFormat>> {
        let mut out = normalize_tokens(&self.out);
        if out.is_empty() {
            out = normalize_tokens(DEFAULT_OUTPUT);
        }

        out.iter().map(|token| token.parse()).collect()
    }
}

/// Run the payload through every selected output, in order
pub fn run(payload: Payload, config: &OutputConfig, stdout: &mut dyn Write) -> Result<Payload> {
    config
        .plan()?
        .into_iter()
        .try_fold(payload, |payload, format| format.apply(payload, config, stdout))
}
