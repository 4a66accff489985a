//! Reference table: aliases extracted from a reference document
//!
//! Each eligible heading of the reference document contributes one or more
//! aliases. All aliases are compiled into a single alternation with one named
//! group per alias. Alternatives are ordered longest first, so an alias that
//! overlaps a shorter one (`category` vs `cat`) wins at the same position.
//!
//! Heading syntax:
//!
//! ```text
//! ## Animals // Cat / Kitty {case: true}
//!    ^category   ^alias ^alias ^options
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::heading::Heading;

/// Levels whose headings define references by default
pub const DEFAULT_REFERENCE_LEVELS: [u8; 1] = [2];

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to read reference document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid front matter in reference document {path}: {message}")]
    FrontMatter { path: PathBuf, message: String },

    #[error("Invalid options in reference heading '{heading}': {message}")]
    InvalidOptions { heading: String, message: String },

    #[error("Reference document {path} is not under the site root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Failed to compile reference matcher: {0}")]
    Pattern(#[from] regex::Error),
}

/// Inline `{...}` options of a reference heading
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AliasOptions {
    /// Match the aliases case-sensitively
    pub case: bool,
}

/// Parsed form of a reference heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasSpec {
    pub options: AliasOptions,
    pub aliases: Vec<String>,
}

impl AliasSpec {
    /// Parses heading text into options and aliases
    ///
    /// Returns `Ok(None)` when no non-empty alias remains.
    pub fn parse(raw_text: &str) -> Result<Option<Self>, ReferenceError> {
        let (name, options) = match raw_text.find('{') {
            Some(i) => {
                let options: AliasOptions =
                    serde_yaml::from_str(&raw_text[i..]).map_err(|e| {
                        ReferenceError::InvalidOptions {
                            heading: raw_text.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                (&raw_text[..i], options)
            }
            None => (raw_text, AliasOptions::default()),
        };

        let name = match name.split_once("//") {
            Some((_, rest)) => rest,
            None => name,
        };

        let aliases: Vec<String> = name
            .split('/')
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .map(str::to_string)
            .collect();

        if aliases.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self { options, aliases }))
    }
}

/// Where an alias links to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    /// Capture group name (`g1`, `g2`, ...)
    pub group_id: String,

    /// Alias text as written in the heading
    pub alias: String,

    /// Site-absolute URL of the defining heading
    pub canonical_url: String,

    /// Resolved path of the reference document
    pub source_path: PathBuf,

    /// Anchor of the defining heading
    pub anchor: String,
}

/// A match of the reference matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch<'t, 'e> {
    pub range: Range<usize>,
    pub text: &'t str,
    pub entry: &'e ReferenceEntry,
}

/// Compiled matcher plus entry metadata; read-only once built
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    matcher: Option<Regex>,
    /// Group id for each capture slot of the matcher, in alternation order
    slots: Vec<String>,
    entries: HashMap<String, ReferenceEntry>,
}

struct Pending {
    pattern_len: usize,
    pattern: String,
    group_id: String,
}

impl ReferenceTable {
    /// Builds the table from headings of the reference document
    ///
    /// `canonical_page` is the site-absolute URL of the reference page
    /// without fragment, e.g. `/reference.html`.
    pub fn from_headings(
        headings: &[Heading],
        levels: &BTreeSet<u8>,
        source_path: &Path,
        canonical_page: &str,
    ) -> Result<Self, ReferenceError> {
        let mut pending = Vec::new();
        let mut entries = HashMap::new();
        let mut index = 1;

        for heading in headings.iter().filter(|h| levels.contains(&h.level)) {
            let Some(spec) = AliasSpec::parse(&heading.raw_text)? else {
                continue;
            };

            for alias in &spec.aliases {
                let group_id = format!("g{}", index);
                index += 1;

                let literal = regex::escape(alias);
                let flags = if spec.options.case { "" } else { "i" };
                pending.push(Pending {
                    pattern_len: literal.len(),
                    pattern: format!(r"(?P<{}>\b(?{}:{}s?)\b)", group_id, flags, literal),
                    group_id: group_id.clone(),
                });

                entries.insert(
                    group_id.clone(),
                    ReferenceEntry {
                        group_id,
                        alias: alias.clone(),
                        canonical_url: format!("{}#{}", canonical_page, heading.anchor),
                        source_path: source_path.to_path_buf(),
                        anchor: heading.anchor.clone(),
                    },
                );
            }
        }

        // Longest first; stable so equal lengths keep document order
        pending.sort_by(|a, b| b.pattern_len.cmp(&a.pattern_len));

        let matcher = if pending.is_empty() {
            None
        } else {
            let alternation = pending
                .iter()
                .map(|p| p.pattern.as_str())
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&alternation)
                    .size_limit(64 * (1 << 20))
                    .build()?,
            )
        };

        Ok(Self {
            matcher,
            slots: pending.into_iter().map(|p| p.group_id).collect(),
            entries,
        })
    }

    /// Returns true if no aliases were found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Looks up an entry by group id
    pub fn get(&self, group_id: &str) -> Option<&ReferenceEntry> {
        self.entries.get(group_id)
    }

    /// Entries in document order
    pub fn entries(&self) -> Vec<&ReferenceEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.group_id[1..].parse::<usize>().unwrap_or(usize::MAX));
        entries
    }

    /// The compiled alternation, if any aliases exist
    pub fn matcher(&self) -> Option<&Regex> {
        self.matcher.as_ref()
    }

    /// Group ids in matcher order (longest pattern first)
    pub fn group_order(&self) -> &[String] {
        &self.slots
    }

    /// Finds all non-overlapping alias matches in `text`
    pub fn find_iter<'s, 't>(
        &'s self,
        text: &'t str,
    ) -> impl Iterator<Item = ReferenceMatch<'t, 's>> + 's
    where
        't: 's,
    {
        self.matcher
            .iter()
            .flat_map(move |matcher| matcher.captures_iter(text))
            .filter_map(move |caps| {
                let (slot, m) = caps
                    .iter()
                    .skip(1)
                    .enumerate()
                    .find_map(|(slot, m)| m.map(|m| (slot, m)))?;
                let entry = self.entries.get(self.slots.get(slot)?)?;
                Some(ReferenceMatch {
                    range: m.range(),
                    text: m.as_str(),
                    entry,
                })
            })
    }
}
