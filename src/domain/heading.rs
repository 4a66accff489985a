//! Heading records captured during conversion
//!
//! A [`Heading`] is the flat `(level, anchor, raw_text)` triple the base
//! converter emits for every heading. The TOC builder and the reference index
//! both consume these.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A heading as seen by the base converter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6)
    pub level: u8,

    /// Anchor id, unique within one document
    pub anchor: String,

    /// Inline HTML of the heading content. May carry a trailing `<tag>`
    /// suffix and `/`-separated alias segments.
    pub raw_text: String,
}

impl Heading {
    pub fn new(level: u8, anchor: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            level,
            anchor: anchor.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Splits the raw text into its display label and trailing tag
    ///
    /// Everything from the first `<` onward is the trailing tag. Of the rest,
    /// only the text before the first `/` is shown.
    pub fn label_and_tag(&self) -> (&str, &str) {
        let (name, tag) = match self.raw_text.find('<') {
            Some(i) => self.raw_text.split_at(i),
            None => (self.raw_text.as_str(), ""),
        };
        let name = name.split('/').next().unwrap_or(name);
        (name.trim(), tag)
    }
}

/// Generates a slug from heading text
///
/// Lowercases, drops anything that is not alphanumeric, `_`, `-` or
/// whitespace, and collapses runs of whitespace and hyphens into one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

/// Hands out unique anchors within one document
///
/// The first use of a slug is returned as is, later ones get `-2`, `-3`, ...
/// skipping any suffixed form another heading already took.
#[derive(Debug, Default)]
pub struct AnchorAllocator {
    /// Last suffix tried per base slug
    suffixes: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl AnchorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an anchor for the given heading text
    pub fn allocate(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        if self.taken.insert(base.clone()) {
            return base;
        }

        let suffix = self.suffixes.entry(base.clone()).or_insert(1);
        loop {
            *suffix += 1;
            let candidate = format!("{}-{}", base, suffix);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_simple() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("snake_case - dash"), "snake_case-dash");
    }

    #[test]
    fn allocator_dedupes() {
        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("Intro"), "intro");
        assert_eq!(anchors.allocate("Intro"), "intro-2");
        assert_eq!(anchors.allocate("intro"), "intro-3");
        assert_eq!(anchors.allocate("Other"), "other");
    }

    #[test]
    fn allocator_skips_suffixes_taken_by_other_headings() {
        let mut anchors = AnchorAllocator::new();
        let allocated: Vec<String> = ["Intro", "Intro", "Intro 2"]
            .into_iter()
            .map(|text| anchors.allocate(text))
            .collect();

        assert_eq!(allocated, vec!["intro", "intro-2", "intro-2-2"]);

        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("Intro 2"), "intro-2");
        assert_eq!(anchors.allocate("Intro"), "intro");
        assert_eq!(anchors.allocate("Intro"), "intro-3");
    }

    #[test]
    fn allocator_falls_back_for_symbols() {
        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("!!!"), "section");
    }

    #[test]
    fn label_strips_tag_and_aliases() {
        let heading = Heading::new(2, "cat", "Cat / Kitty <small>pet</small>");
        assert_eq!(heading.label_and_tag(), ("Cat", "<small>pet</small>"));

        let plain = Heading::new(1, "intro", "Intro");
        assert_eq!(plain.label_and_tag(), ("Intro", ""));
    }
}
