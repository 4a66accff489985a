//! Table of contents construction
//!
//! Turns the flat heading list captured during conversion into nested list
//! markup. Skipped levels (e.g. an `h3` directly under an `h1`) get an
//! unlabeled intermediate container so nesting depth always tracks the
//! heading level.

use serde::Serialize;
use std::collections::BTreeSet;

use super::heading::Heading;

/// Levels rendered as `<ol>` by default
pub const DEFAULT_ORDERED_LEVELS: [u8; 2] = [1, 2];

/// A node of the nested outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNode {
    /// Display text (before any `/` alias and trailing tag)
    pub label: String,

    /// Anchor of the heading, empty for synthetic containers
    pub anchor: String,

    /// Verbatim markup following the label
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trailing_tag: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocNode>,
}

impl TocNode {
    fn synthetic() -> Self {
        Self {
            label: String::new(),
            anchor: String::new(),
            trailing_tag: String::new(),
            children: Vec::new(),
        }
    }

    /// Returns true for containers inserted for skipped levels
    pub fn is_synthetic(&self) -> bool {
        self.anchor.is_empty()
    }
}

impl From<&Heading> for TocNode {
    fn from(heading: &Heading) -> Self {
        let (label, tag) = heading.label_and_tag();
        Self {
            label: label.to_string(),
            anchor: heading.anchor.clone(),
            trailing_tag: tag.to_string(),
            children: Vec::new(),
        }
    }
}

/// Builds the nested outline as a tree
pub fn build_toc_tree(headings: &[Heading]) -> Vec<TocNode> {
    let Some(min_level) = headings.iter().map(|h| h.level).min() else {
        return Vec::new();
    };

    let mut roots = Vec::new();
    let mut stack: Vec<(u8, TocNode)> = Vec::new();

    fn close_top(stack: &mut Vec<(u8, TocNode)>, roots: &mut Vec<TocNode>) {
        if let Some((_, node)) = stack.pop() {
            match stack.last_mut() {
                Some((_, parent)) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    for heading in headings {
        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            close_top(&mut stack, &mut roots);
        }

        let parent_level = stack.last().map_or(min_level.saturating_sub(1), |(level, _)| *level);
        for level in parent_level + 1..heading.level {
            stack.push((level, TocNode::synthetic()));
        }

        stack.push((heading.level, TocNode::from(heading)));
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

/// Builds nested list markup for the headings
///
/// Containers are `<ol>` for levels in `ordered_levels` and `<ul>` otherwise.
/// Returns an empty string when there are no headings.
pub fn build_toc_html(headings: &[Heading], ordered_levels: &BTreeSet<u8>) -> String {
    let Some(min_level) = headings.iter().map(|h| h.level).min() else {
        return String::new();
    };

    let mut builder = TocHtml {
        lines: Vec::new(),
        open_items: Vec::new(),
        ordered_levels,
    };

    let start_level = min_level.saturating_sub(1);
    let mut prev_level = start_level;

    for heading in headings {
        if heading.level > prev_level {
            for level in prev_level + 1..=heading.level {
                builder.lines.push(format!("<{}>", builder.container(level)));
            }
        } else {
            builder.close(prev_level, heading.level);
        }

        let (label, tag) = heading.label_and_tag();
        builder
            .lines
            .push(format!("<li>\n<a href=\"#{}\">{}</a>{}", heading.anchor, label, tag));
        builder.open_items.push(heading.level);
        prev_level = heading.level;
    }

    builder.close(prev_level, start_level);

    format!("\n{}", builder.lines.join("\n"))
}

struct TocHtml<'a> {
    lines: Vec<String>,
    /// Levels of the list items still open
    open_items: Vec<u8>,
    ordered_levels: &'a BTreeSet<u8>,
}

impl TocHtml<'_> {
    fn container(&self, level: u8) -> &'static str {
        if self.ordered_levels.contains(&level) {
            "ol"
        } else {
            "ul"
        }
    }

    /// Closes the current item, then containers from `from` down to `to`
    fn close(&mut self, from: u8, to: u8) {
        if self.open_items.pop().is_some() {
            self.lines.push("</li>".to_string());
        }

        for level in (to + 1..=from).rev() {
            self.lines.push(format!("</{}>", self.container(level)));
            // The container was nested in an item one level up
            if self.open_items.last() == Some(&(level - 1)) {
                self.open_items.pop();
                self.lines.push("</li>".to_string());
            }
        }
    }
}
