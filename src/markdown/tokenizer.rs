//! Structural scanner for generated HTML
//!
//! Splits markup into text and tag tokens while tracking two stacks: the
//! names of currently open elements, and the headers (level and anchor) that
//! enclose the current position. It is not a conforming HTML parser; it only
//! understands the well-formed markup the converter produces, and degrades to
//! plain text on anything else.

use std::ops::Range;

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    OpenTag,
    CloseTag,
    /// `<x/>`, void elements, comments and declarations
    SelfClosingTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Byte range in the scanned HTML
    pub range: Range<usize>,
    pub text: &'a str,
}

impl Token<'_> {
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }
}

/// A header enclosing the scan position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenHeader<'a> {
    pub level: u8,
    pub anchor: &'a str,
}

/// Lazy, restartable scanner over an HTML string
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    html: &'a str,
    pos: usize,
    tags: Vec<&'a str>,
    headers: Vec<OpenHeader<'a>>,
    in_tag: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(html: &'a str) -> Self {
        Self {
            html,
            pos: 0,
            tags: Vec::new(),
            headers: Vec::new(),
            in_tag: false,
        }
    }

    /// Rewinds to the start of the input with empty stacks
    pub fn reset(&mut self) {
        self.pos = 0;
        self.tags.clear();
        self.headers.clear();
        self.in_tag = false;
    }

    /// Open element names for the last text token; `None` after a tag token
    pub fn open_tags(&self) -> Option<&[&'a str]> {
        if self.in_tag {
            None
        } else {
            Some(&self.tags)
        }
    }

    /// Headers enclosing the last token, outermost first
    pub fn open_headers(&self) -> &[OpenHeader<'a>] {
        &self.headers
    }

    fn text(&mut self, start: usize, end: usize) -> Token<'a> {
        let html = self.html;
        self.in_tag = false;
        Token {
            kind: TokenKind::Text,
            range: start..end,
            text: &html[start..end],
        }
    }

    fn markup(&mut self, start: usize, end: usize) -> Token<'a> {
        let html = self.html;
        let text = &html[start..end];
        self.in_tag = true;

        let kind = if let Some(rest) = text.strip_prefix("</") {
            let name = tag_name(rest);
            if let Some(i) = self.tags.iter().rposition(|t| t.eq_ignore_ascii_case(name)) {
                self.tags.truncate(i);
            }
            TokenKind::CloseTag
        } else if text.starts_with("<!") || text.starts_with("<?") || text.ends_with("/>") {
            TokenKind::SelfClosingTag
        } else {
            let name = tag_name(&text[1..]);
            if VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name)) {
                TokenKind::SelfClosingTag
            } else {
                self.tags.push(name);
                self.push_header(name, text);
                TokenKind::OpenTag
            }
        };

        Token {
            kind,
            range: start..end,
            text,
        }
    }

    fn push_header(&mut self, name: &str, tag: &'a str) {
        let (Some(level), Some(anchor)) = (header_level(name), id_attribute(tag)) else {
            return;
        };

        while self.headers.last().is_some_and(|h| h.level >= level) {
            self.headers.pop();
        }
        self.headers.push(OpenHeader { level, anchor });
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let rest = self.html.get(start..).filter(|r| !r.is_empty())?;

        let token = if opens_markup(rest) {
            match markup_len(rest) {
                Some(len) => self.markup(start, start + len),
                // Unterminated markup: the remainder is text
                None => self.text(start, self.html.len()),
            }
        } else {
            // A stray `<` belongs to the text that follows it
            let skip = usize::from(rest.starts_with('<'));
            let end = rest[skip..]
                .find('<')
                .map_or(self.html.len(), |i| start + skip + i);
            self.text(start, end)
        };

        self.pos = token.range.end;
        Some(token)
    }
}

fn opens_markup(rest: &str) -> bool {
    let mut bytes = rest.bytes();
    bytes.next() == Some(b'<')
        && bytes
            .next()
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

/// Length of the markup at the start of `rest`, including the closing `>`
fn markup_len(rest: &str) -> Option<usize> {
    if let Some(comment) = rest.strip_prefix("<!--") {
        return comment.find("-->").map(|i| 4 + i + 3);
    }

    let mut quoted = false;
    for (i, b) in rest.bytes().enumerate().skip(1) {
        match b {
            b'"' => quoted = !quoted,
            b'>' if !quoted => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn tag_name(after_lt: &str) -> &str {
    let end = after_lt
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(after_lt.len());
    &after_lt[..end]
}

fn header_level(name: &str) -> Option<u8> {
    match name.as_bytes() {
        [h, digit @ b'1'..=b'6'] if h.eq_ignore_ascii_case(&b'h') => Some(digit - b'0'),
        _ => None,
    }
}

fn id_attribute(tag: &str) -> Option<&str> {
    let (at, _) = tag
        .match_indices("id=\"")
        .find(|(i, _)| tag[..*i].ends_with(char::is_whitespace))?;
    let value = &tag[at + 4..];
    let len = value.find('"')?;
    Some(&value[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// (text, open tags, enclosing anchors) for every text token
    fn text_spans(html: &str) -> Vec<(String, Vec<String>, Vec<String>)> {
        let mut tokenizer = Tokenizer::new(html);
        let mut spans = Vec::new();
        while let Some(token) = tokenizer.next() {
            if let Some(tags) = tokenizer.open_tags() {
                spans.push((
                    token.text.to_string(),
                    tags.iter().map(|t| t.to_string()).collect(),
                    tokenizer
                        .open_headers()
                        .iter()
                        .map(|h| h.anchor.to_string())
                        .collect(),
                ));
            }
        }
        spans
    }

    #[test]
    fn tracks_open_tags() {
        let spans = text_spans("<p>Hello <em>there</em> friend</p>\n");

        assert_eq!(spans[0].0, "Hello ");
        assert_eq!(spans[0].1, vec!["p"]);
        assert_eq!(spans[1].0, "there");
        assert_eq!(spans[1].1, vec!["p", "em"]);
        assert_eq!(spans[2].1, vec!["p"]);
        assert_eq!(spans[3].0, "\n");
        assert!(spans[3].1.is_empty());
    }

    #[test]
    fn tag_tokens_have_no_tag_stack() {
        let mut tokenizer = Tokenizer::new("<p>x</p>");

        let open = tokenizer.next().unwrap();
        assert_eq!(open.kind, TokenKind::OpenTag);
        assert_eq!(open.text, "<p>");
        assert!(tokenizer.open_tags().is_none());

        let text = tokenizer.next().unwrap();
        assert!(text.is_text());
        assert_eq!(tokenizer.open_tags(), Some(&["p"][..]));

        let close = tokenizer.next().unwrap();
        assert_eq!(close.kind, TokenKind::CloseTag);
        assert!(tokenizer.next().is_none());
    }

    #[test]
    fn void_and_self_closing_do_not_push() {
        let html = "<p>a<br>b<img src=\"x.png\" alt=\"y\" />c<!-- <span> -->d</p>";
        let spans = text_spans(html);

        assert_eq!(
            spans.iter().map(|s| s.0.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c", "d"]
        );
        assert!(spans.iter().all(|s| s.1 == vec!["p"]));
    }

    #[test]
    fn header_stack_follows_levels() {
        let html = "<h2 id=\"a\">A</h2><p>x</p>\
                    <h3 id=\"b\">B</h3><p>y</p>\
                    <h3 id=\"c\">C</h3><p>z</p>\
                    <h2 id=\"d\">D</h2><p>w</p>";
        let spans = text_spans(html);
        let anchors: Vec<_> = spans.iter().map(|s| (s.0.as_str(), s.2.clone())).collect();

        assert_eq!(anchors[0], ("A", vec!["a".to_string()]));
        assert_eq!(anchors[1], ("x", vec!["a".to_string()]));
        assert_eq!(anchors[3], ("y", vec!["a".to_string(), "b".to_string()]));
        assert_eq!(anchors[5], ("z", vec!["a".to_string(), "c".to_string()]));
        assert_eq!(anchors[7], ("w", vec!["d".to_string()]));
    }

    #[test]
    fn header_without_id_is_not_tracked() {
        let spans = text_spans("<h2 id=\"a\">A</h2><h3>B</h3><p>x</p><h4 data-id=\"q\">C</h4>");

        assert!(spans.iter().all(|s| s.2 == vec!["a"]));
        assert_eq!(spans[1].1, vec!["h3"]);
    }

    #[test]
    fn stray_close_tag_is_ignored() {
        let spans = text_spans("</div><p>x</p>");
        assert_eq!(spans[0].1, vec!["p"]);
    }

    #[test]
    fn close_tag_pops_to_its_match() {
        let spans = text_spans("<div><p><em>x</div>y");
        assert_eq!(spans[1].0, "y");
        assert!(spans[1].1.is_empty());
    }

    #[test]
    fn unterminated_markup_becomes_text() {
        let tokens: Vec<_> = Tokenizer::new("<p>a < b and <em class=\"x").collect();

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].text, "a ");
        assert_eq!(tokens[2].text, "< b and ");
        assert_eq!(tokens[3].text, "<em class=\"x");
        assert!(tokens[3].is_text());
    }

    #[test]
    fn quoted_angle_bracket_stays_in_tag() {
        let tokens: Vec<_> = Tokenizer::new("<a title=\"a>b\">x</a>").collect();
        assert_eq!(tokens[0].text, "<a title=\"a>b\">");
        assert_eq!(tokens[1].text, "x");
    }

    #[test]
    fn reset_and_clone_restart() {
        let html = "<p>one</p><p>two</p>";
        let mut tokenizer = Tokenizer::new(html);
        let first: Vec<_> = tokenizer.by_ref().take(2).collect();

        let copy = tokenizer.clone();
        assert_eq!(copy.count(), 4);

        tokenizer.reset();
        let again: Vec<_> = tokenizer.take(2).collect();
        assert_eq!(first, again);
    }

    proptest! {
        #[test]
        fn tokens_cover_input(html in "(<[a-z/!]{0,3}[^<>]{0,4}>?|[^<]{0,6}|<h[1-6] id=\"[a-z]{1,3}\">){0,12}") {
            let mut end = 0;
            let mut rebuilt = String::new();

            for token in Tokenizer::new(&html) {
                prop_assert_eq!(token.range.start, end);
                prop_assert!(!token.text.is_empty());
                end = token.range.end;
                rebuilt.push_str(token.text);
            }

            prop_assert_eq!(rebuilt, html);
        }
    }
}
