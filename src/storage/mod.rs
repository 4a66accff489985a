//! # Storage Layer
//!
//! Everything that touches the file system: reading pages, configuration,
//! and writing the built site.
//!
//! ## File Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Pages | Markdown + YAML front matter | anywhere under the site root |
//! | Site config | TOML | `markweave.toml` at the site root |
//! | User config | TOML | `~/.config/markweave/config.toml` |
//! | Output | HTML | next to each page, or under `output_dir` |
//!
//! ## Key Types
//!
//! - [`Document`] - A page split into front matter and body
//! - [`Site`] - Discovers, links and renders a set of pages
//! - [`Config`] - Site and global configuration

mod config;
mod frontmatter;
mod site;

pub use config::{Config, ConfigError, GitConfig, GlobalConfig, OutputFormat, ProjectConfig, CONFIG_FILE};
pub use frontmatter::{Document, FrontMatterError};
pub use site::{BuildReport, BuiltPage, PageFailure, Site, SiteError, SiteOptions};
