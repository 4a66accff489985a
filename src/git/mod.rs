//! # Git Integration
//!
//! Maps source lines to the commits that last changed them.
//!
//! ## Commands used
//!
//! | Purpose | Command |
//! |---------|---------|
//! | Repository root | `rev-parse --show-toplevel` |
//! | Resolve changes-since ref | `rev-list -1 <ref>` |
//! | Ancestry test | `merge-base --is-ancestor <a> <b>` (exit code only) |
//! | Line attribution | `blame -p --incremental -- <path>` |
//!
//! ## Key Types
//!
//! - [`GitRepo`] - Runs git with a timeout and hands output to the parser
//! - [`BlameParser`] - Process-free parser for incremental porcelain blame
//! - [`BlameMap`] - Line number to [`Commit`]

mod blame;
mod repo;

pub use blame::{format_date, AncestryCheck, BlameMap, BlameParser, Commit};
pub use repo::{GitError, GitRepo, GitSettings, DEFAULT_GIT_TIMEOUT};
