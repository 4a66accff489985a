//! YAML front matter
//!
//! A page may start with a metadata block:
//!
//! ```text
//! ---
//! title: Getting started
//! show-changes-since: v1.2
//! ---
//! # Body
//! ```
//!
//! The body keeps every remaining line untouched, and the number of lines
//! taken by the block is recorded so blame line numbers can be aligned with
//! the body.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::domain::MetadataLayer;

const DELIMITER: &str = "---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("line {line}: front matter is not terminated by ---")]
    Unterminated { line: usize },

    #[error("line {line}: invalid front matter: {message}")]
    Yaml { line: usize, message: String },

    #[error("line 2: front matter must be a mapping of keys to values")]
    NotAMapping,
}

/// A page split into metadata and Markdown body
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub metadata: MetadataLayer,
    pub body: String,
    /// Lines consumed by the front matter block, delimiters included
    pub front_matter_lines: usize,
}

impl Document {
    /// Splits `source` into front matter and body
    pub fn parse(source: &str) -> Result<Self, FrontMatterError> {
        let mut lines = source.split_inclusive('\n');

        let starts_with_block = lines
            .next()
            .is_some_and(|first| first.trim_end() == DELIMITER);
        if !starts_with_block {
            return Ok(Self {
                body: source.to_string(),
                ..Self::default()
            });
        }

        let mut yaml_len = 0;
        let mut consumed = 1;
        let mut closed = false;
        for line in lines {
            consumed += 1;
            if line.trim_end() == DELIMITER {
                closed = true;
                break;
            }
            yaml_len += line.len();
        }

        if !closed {
            return Err(FrontMatterError::Unterminated { line: 1 });
        }

        let yaml_start = source.find('\n').map_or(source.len(), |i| i + 1);
        let yaml = &source[yaml_start..yaml_start + yaml_len];
        let body_start = source
            .split_inclusive('\n')
            .take(consumed)
            .map(str::len)
            .sum::<usize>();

        Ok(Self {
            metadata: MetadataLayer::from(parse_mapping(yaml)?),
            body: source[body_start..].to_string(),
            front_matter_lines: consumed,
        })
    }
}

fn parse_mapping(yaml: &str) -> Result<Mapping, FrontMatterError> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| FrontMatterError::Yaml {
        // The block starts on the line after the opening delimiter
        line: e.location().map_or(2, |l| l.line() + 1),
        message: e.to_string(),
    })?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(FrontMatterError::NotAMapping),
    }
}
