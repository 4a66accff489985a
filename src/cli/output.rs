//! Output formatting for CLI commands
//!
//! Results go to stdout, problems to stderr. In JSON mode every call prints
//! exactly one JSON document so the output can be piped into `jq`.

use serde::Serialize;
use serde_json::json;

use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Writes command results in the selected format
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// A one-line summary, e.g. `Built 3 page(s)`
    pub fn summary(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => println!("{}", json!({ "message": message })),
        }
    }

    /// A summary shown only with `--verbose`
    pub fn detail(&self, message: &str) {
        if self.verbose {
            self.summary(message);
        }
    }

    /// A problem that did not stop the command
    pub fn problem(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => eprintln!("{}", json!({ "error": message })),
        }
    }

    /// Serializable results; pretty-printed in text mode
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(rendered) = rendered {
            println!("{}", rendered);
        }
    }

    /// Generated HTML, without leading blank lines
    pub fn markup(&self, html: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", html.trim_start_matches('\n')),
            OutputFormat::Json => println!("{}", json!({ "html": html })),
        }
    }

    /// A tab-separated listing row (text only)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
