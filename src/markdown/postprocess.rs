//! Context-free HTML postprocessors

use regex::{Captures, Regex};
use std::sync::LazyLock;

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<img .*?/>").expect("image tag pattern is valid"));

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(.*?)""#).expect("src pattern is valid"));

static IMG_ALT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"alt="(.*?)""#).expect("alt pattern is valid"));

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

static HEADER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h([0-9]).*?>").expect("header tag pattern is valid"));

/// A deeper heading closer than this to the section start joins the section
const SECTION_JOIN_BYTES: usize = 500;

/// Turns opening single and double curly quotes into closing ones
pub fn swedish_quotes(html: &str) -> String {
    html.replace('\u{2018}', "\u{2019}")
        .replace('\u{201c}', "\u{201d}")
        .replace("&#8216;", "&#8217;")
        .replace("&#8220;", "&#8221;")
}

/// Wraps images in links to themselves and turns alt hashtags into classes
///
/// `![Diagram #wide](d.svg)` becomes a linked image with classes
/// `wide shadow`. PNG images get no shadow, and neither does `#noshadow`.
pub fn link_images(html: &str) -> String {
    IMG_TAG
        .replace_all(html, |caps: &Captures<'_>| {
            let tag = &caps[0];
            let (Some(src), Some(alt)) = (IMG_SRC.captures(tag), IMG_ALT.captures(tag)) else {
                return tag.to_string();
            };
            let src = &src[1];

            let mut classes: Vec<&str> = HASHTAG
                .find_iter(&alt[1])
                .map(|m| m.as_str().trim_start_matches('#'))
                .collect();
            let alt = HASHTAG.replace_all(&alt[1], "");

            if !src.ends_with(".png") && !classes.contains(&"noshadow") {
                classes.push("shadow");
            }

            format!(
                "<a href=\"{src}\"><img class=\"{}\" src=\"{src}\" alt=\"{}\" /></a>",
                classes.join(" "),
                alt.trim()
            )
        })
        .into_owned()
}

/// Wraps each heading and its content in a `no-break-section` div
pub fn header_sections(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 8);
    let mut last_pos = 0;
    let mut last_level = 0u32;

    for caps in HEADER_TAG.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let pos = whole.start();
        let level: u32 = caps[1].parse().unwrap_or(0);

        if last_level > 0 && level > last_level && pos < last_pos + SECTION_JOIN_BYTES {
            continue;
        }

        out.push_str(&html[last_pos..pos]);
        if last_level > 0 {
            out.push_str("</div>\n");
        }
        out.push_str("<div class=\"no-break-section\">\n");
        last_pos = pos;
        last_level = level;
    }

    out.push_str(&html[last_pos..]);
    if last_level > 0 {
        out.push_str("</div>\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_closed() {
        assert_eq!(swedish_quotes("\u{201c}Hej\u{201d} \u{2018}då\u{2019}"), "\u{201d}Hej\u{201d} \u{2019}då\u{2019}");
        assert_eq!(swedish_quotes("&#8220;x&#8221;"), "&#8221;x&#8221;");
    }

    #[test]
    fn images_get_links_and_classes() {
        let html = link_images("<p><img src=\"d.svg\" alt=\"Diagram #wide\" /></p>");
        assert_eq!(
            html,
            "<p><a href=\"d.svg\"><img class=\"wide shadow\" src=\"d.svg\" alt=\"Diagram\" /></a></p>"
        );
    }

    #[test]
    fn png_and_noshadow_skip_shadow() {
        let png = link_images("<img src=\"a.png\" alt=\"A\" />");
        assert!(png.contains("class=\"\""));

        let flat = link_images("<img src=\"a.jpg\" alt=\"A #noshadow\" />");
        assert!(flat.contains("class=\"noshadow\""));
    }

    #[test]
    fn image_without_alt_is_untouched() {
        let html = "<img src=\"a.jpg\" />";
        assert_eq!(link_images(html), html);
    }

    #[test]
    fn sections_wrap_headings() {
        let html = "<h1 id=\"a\">A</h1>\n<p>x</p>\n<h1 id=\"b\">B</h1>\n<p>y</p>\n";
        assert_eq!(
            header_sections(html),
            "<div class=\"no-break-section\">\n<h1 id=\"a\">A</h1>\n<p>x</p>\n</div>\n\
             <div class=\"no-break-section\">\n<h1 id=\"b\">B</h1>\n<p>y</p>\n</div>\n"
        );
    }

    #[test]
    fn close_subheading_joins_section() {
        let html = "<h2 id=\"a\">A</h2>\n<h3 id=\"b\">B</h3>\n<p>x</p>\n";
        let out = header_sections(html);
        assert_eq!(out.matches("no-break-section").count(), 1);

        let far = format!("<h2 id=\"a\">A</h2>\n<p>{}</p>\n<h3 id=\"b\">B</h3>\n", "x".repeat(600));
        assert_eq!(header_sections(&far).matches("no-break-section").count(), 2);
    }

    #[test]
    fn no_headings_no_sections() {
        assert_eq!(header_sections("<p>x</p>\n"), "<p>x</p>\n");
    }
}
