//! Base Markdown to HTML conversion
//!
//! Wraps `pulldown-cmark` and intercepts headings: each heading gets a
//! unique `id` anchor, its `/alias` tail is hidden from the rendered text,
//! and a [`Heading`] record is captured for the TOC side channel.

use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::borrow::Cow;

use crate::domain::{AnchorAllocator, Heading};

/// Output of the base converter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    /// Headings in document order
    pub headings: Vec<Heading>,
}

fn document_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_SMART_PUNCTUATION
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Converts a Markdown document to HTML, capturing its headings
pub fn render_markdown(text: &str) -> Rendered {
    let mut anchors = AnchorAllocator::new();
    let mut headings = Vec::new();
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut open_heading: Option<(u8, Vec<Event<'_>>)> = None;

    for event in Parser::new_ext(text, document_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                open_heading = Some((heading_level(level), Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, inner)) = open_heading.take() {
                    let (markup, heading) = capture_heading(level, inner, &mut anchors);
                    events.push(Event::Html(markup.into()));
                    headings.push(heading);
                }
            }
            event => match open_heading.as_mut() {
                Some((_, inner)) => inner.push(event),
                None => events.push(event),
            },
        }
    }

    let mut html = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut html, events.into_iter());

    Rendered { html, headings }
}

fn capture_heading(
    level: u8,
    inner: Vec<Event<'_>>,
    anchors: &mut AnchorAllocator,
) -> (String, Heading) {
    // Anchor text stops at the first tag and the first alias separator
    let mut plain = String::new();
    for event in &inner {
        match event {
            Event::Text(text) | Event::Code(text) => plain.push_str(text),
            Event::InlineHtml(_) | Event::Html(_) => break,
            _ => {}
        }
    }
    let anchor = anchors.allocate(plain.split('/').next().unwrap_or_default());

    let mut raw_text = String::new();
    html::push_html(&mut raw_text, inner.into_iter());

    let markup = format!(
        "<h{level} id=\"{anchor}\">{}</h{level}>\n",
        hide_aliases(&raw_text)
    );

    (markup, Heading::new(level, anchor, raw_text))
}

/// Drops the `/alias` tail that precedes the first tag of heading markup
fn hide_aliases(inner: &str) -> Cow<'_, str> {
    let end = inner.find('<').unwrap_or(inner.len());
    match inner[..end].find('/') {
        Some(slash) => Cow::Owned(format!("{}{}", inner[..slash].trim_end(), &inner[end..])),
        None => Cow::Borrowed(inner),
    }
}

/// Converts a short inline snippet, without the paragraph wrapper
pub fn render_inline(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let mut html = String::new();
    html::push_html(&mut html, Parser::new_ext(text, Options::ENABLE_SMART_PUNCTUATION));

    let html = html.trim();
    let html = html.strip_prefix("<p>").unwrap_or(html);
    let html = html.strip_suffix("</p>").unwrap_or(html);
    html.to_string()
}
