//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `build` | Convert pages (or directories with `-r`) to HTML |
//! | `toc` | Print the table of contents of a page |
//! | `blame` | Show the commit behind each line of a tracked file |
//! | `refs` | List the terms a reference document defines |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr:
//! ```bash
//! markweave --verbose build -r docs
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod build;
mod inspect;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
