//! Incremental porcelain blame parser
//!
//! `git blame -p --incremental` emits one record per contiguous hunk:
//!
//! ```text
//! <hash> <source-line> <result-line> <line-count>
//! author Jane Doe                 \
//! author-time 1700000000           |  only on the first hunk
//! summary Fix the thing            |  of each commit
//! ...                             /
//! filename docs/page.md              always ends the record
//! ```
//!
//! The parser never spawns processes itself. Ancestry questions for the
//! changes-since filter go through [`AncestryCheck`], so captured streams can
//! be parsed in tests.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;
use std::sync::Arc;

use super::repo::GitError;

/// A commit that last touched some lines of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub summary: String,
    /// Author timestamp (seconds since the epoch)
    pub author_time: i64,
    /// Author date as `YYYY-MM-DD` in local time
    pub date: String,
}

/// Result line number (1-based) to the commit that last changed it
pub type BlameMap = BTreeMap<u32, Arc<Commit>>;

/// Answers "is `ancestor` an ancestor of `descendant`"
pub trait AncestryCheck {
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError>;
}

/// Formats an author timestamp as a local `YYYY-MM-DD` date
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Commit record while the stream is being scanned
#[derive(Debug, Default)]
struct PendingCommit {
    author: String,
    summary: String,
    author_time: i64,
    lines: BTreeSet<u32>,
}

#[derive(Debug)]
enum Slot {
    Retained(PendingCommit),
    /// The boundary commit itself, or a commit not after it
    Excluded,
}

/// Parser for one blame stream
pub struct BlameParser<'a> {
    /// Resolved boundary commit; only its strict descendants are kept
    since: Option<&'a str>,
    ancestry: &'a dyn AncestryCheck,
}

impl<'a> BlameParser<'a> {
    pub fn new(since: Option<&'a str>, ancestry: &'a dyn AncestryCheck) -> Self {
        Self { since, ancestry }
    }

    /// Parses the whole stream into a line to commit map
    pub fn parse(&self, output: &str) -> Result<BlameMap, GitError> {
        let mut lines = output.lines();
        let mut slots: HashMap<String, Slot> = HashMap::new();
        // First-seen order keeps the result independent of hash iteration
        let mut order: Vec<String> = Vec::new();

        while let Some(line) = lines.next() {
            if line.is_empty() {
                break;
            }

            let (hash, range) = parse_hunk_header(line)?;

            if let Some(slot) = slots.get_mut(hash) {
                if let Slot::Retained(commit) = slot {
                    commit.lines.extend(range);
                }
                skip_record(&mut lines);
                continue;
            }

            let slot = if self.is_excluded(hash)? {
                skip_record(&mut lines);
                Slot::Excluded
            } else {
                let mut commit = parse_record(&mut lines);
                commit.lines.extend(range);
                Slot::Retained(commit)
            };

            order.push(hash.to_string());
            slots.insert(hash.to_string(), slot);
        }

        if let Some(since) = self.since {
            slots.remove(since);
        }

        let mut blame = BlameMap::new();
        for hash in order {
            let Some(Slot::Retained(pending)) = slots.remove(&hash) else {
                continue;
            };

            let commit = Arc::new(Commit {
                date: format_date(pending.author_time),
                hash,
                author: pending.author,
                summary: pending.summary,
                author_time: pending.author_time,
            });

            for line in pending.lines {
                blame.insert(line, Arc::clone(&commit));
            }
        }

        Ok(blame)
    }

    fn is_excluded(&self, hash: &str) -> Result<bool, GitError> {
        match self.since {
            Some(since) => Ok(since == hash || !self.ancestry.is_ancestor(since, hash)?),
            None => Ok(false),
        }
    }
}

/// Parses `<hash> <source-line> <result-line> <count>`
/// `<hash> <source line> <result line> <count>` to the hash and result lines
fn parse_hunk_header(line: &str) -> Result<(&str, Range<u32>), GitError> {
    let malformed = || GitError::Malformed(line.to_string());

    let mut fields = line.split_whitespace();
    let hash = fields.next().ok_or_else(malformed)?;
    let _source_line = fields.next().ok_or_else(malformed)?;
    let start = fields
        .next()
        .and_then(|f| f.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    let count = fields
        .next()
        .and_then(|f| f.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    let end = start.checked_add(count).ok_or_else(malformed)?;

    Ok((hash, start..end))
}

/// Skips to and including the record's `filename` line
fn skip_record<'l>(lines: &mut impl Iterator<Item = &'l str>) {
    for line in lines {
        if line.starts_with("filename ") {
            break;
        }
    }
}

/// Reads `key value` lines up to and including `filename`
fn parse_record<'l>(lines: &mut impl Iterator<Item = &'l str>) -> PendingCommit {
    let mut commit = PendingCommit::default();

    for line in lines {
        // Bare flags such as `boundary` carry no value
        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };
        let value = value.trim();

        match key {
            "author" => commit.author = value.to_string(),
            "summary" => commit.summary = value.to_string(),
            "author-time" => commit.author_time = value.parse().unwrap_or_default(),
            "filename" => break,
            _ => {}
        }
    }

    commit
}
