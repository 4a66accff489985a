//! Reference linking postprocessor
//!
//! Rewrites occurrences of reference aliases in rendered HTML text into
//! links to their defining heading.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::pipeline::RenderContext;
use super::tokenizer::{OpenHeader, Tokenizer};
use crate::domain::{ReferenceEntry, ReferenceTable};

/// Text inside these elements is never linked
const PROTECTED_TAGS: &[&str] = &["a", "span", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Character references; aliases never match inside one
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("entity pattern is valid")
});

/// Links alias occurrences in `html` to their reference entries
pub fn link_references(ctx: &RenderContext, html: &str) -> String {
    if ctx.no_refs {
        return html.to_string();
    }
    let (Some(table), Some(path)) = (ctx.references.as_deref(), ctx.path.as_deref()) else {
        return html.to_string();
    };
    if table.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut tokenizer = Tokenizer::new(html);

    while let Some(token) = tokenizer.next() {
        match tokenizer.open_tags() {
            Some(tags) if !is_protected(tags) => {
                link_span(token.text, table, path, tokenizer.open_headers(), &mut out)
            }
            _ => out.push_str(token.text),
        }
    }

    out
}

fn is_protected(tags: &[&str]) -> bool {
    tags.iter()
        .any(|tag| PROTECTED_TAGS.iter().any(|p| p.eq_ignore_ascii_case(tag)))
}

fn link_span(
    text: &str,
    table: &ReferenceTable,
    path: &Path,
    headers: &[OpenHeader<'_>],
    out: &mut String,
) {
    let mut last = 0;
    for entity in ENTITY.find_iter(text) {
        link_segment(&text[last..entity.start()], table, path, headers, out);
        out.push_str(entity.as_str());
        last = entity.end();
    }
    link_segment(&text[last..], table, path, headers, out);
}

fn link_segment(
    text: &str,
    table: &ReferenceTable,
    path: &Path,
    headers: &[OpenHeader<'_>],
    out: &mut String,
) {
    let mut last = 0;

    for found in table.find_iter(text) {
        out.push_str(&text[last..found.range.start]);
        if is_self_reference(found.entry, path, headers) {
            out.push_str("<span class=\"self-reference\">");
            out.push_str(found.text);
            out.push_str("</span>");
        } else {
            out.push_str("<a class=\"reference\" href=\"");
            out.push_str(&found.entry.canonical_url);
            out.push_str("\">");
            out.push_str(found.text);
            out.push_str("</a>");
        }
        last = found.range.end;
    }

    out.push_str(&text[last..]);
}

fn is_self_reference(entry: &ReferenceEntry, path: &Path, headers: &[OpenHeader<'_>]) -> bool {
    entry.source_path == path && headers.iter().any(|h| h.anchor == entry.anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Heading;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn table(source: &str) -> Arc<ReferenceTable> {
        let headings = vec![
            Heading::new(2, "cat", "Cat / Kitty"),
            Heading::new(2, "dog", "Dog"),
        ];
        let levels = BTreeSet::from([2]);
        Arc::new(
            ReferenceTable::from_headings(&headings, &levels, Path::new(source), "/ref.html")
                .unwrap(),
        )
    }

    fn context(path: &str) -> RenderContext {
        RenderContext {
            path: Some(PathBuf::from(path)),
            references: Some(table("/site/ref.md")),
            ..RenderContext::default()
        }
    }

    #[test]
    fn links_plain_text() {
        let html = link_references(&context("/site/page.md"), "<p>My cats and a dog.</p>");
        assert_eq!(
            html,
            "<p>My <a class=\"reference\" href=\"/ref.html#cat\">cats</a> and a \
             <a class=\"reference\" href=\"/ref.html#dog\">dog</a>.</p>"
        );
    }

    #[test]
    fn protected_elements_pass_through() {
        let html = "<h2 id=\"x\">Cat</h2><p><a href=\"/\">dog</a> <span>kitty</span></p>";
        assert_eq!(link_references(&context("/site/page.md"), html), html);
    }

    #[test]
    fn tag_markup_is_not_linked() {
        let html = "<p class=\"dog\">text</p>";
        assert_eq!(link_references(&context("/site/page.md"), html), html);
    }

    #[test]
    fn entities_are_never_split() {
        let headings = vec![Heading::new(2, "gt", "GT"), Heading::new(2, "amp", "amp / quot")];
        let levels = BTreeSet::from([2]);
        let table =
            ReferenceTable::from_headings(&headings, &levels, Path::new("/site/r.md"), "/r.html")
                .unwrap();
        let ctx = RenderContext {
            path: Some(PathBuf::from("/site/page.md")),
            references: Some(Arc::new(table)),
            ..RenderContext::default()
        };

        let html = "<p>a &gt; b &amp; &quot;c&quot; &#62; GT</p>";
        assert_eq!(
            link_references(&ctx, html),
            "<p>a &gt; b &amp; &quot;c&quot; &#62; \
             <a class=\"reference\" href=\"/r.html#gt\">GT</a></p>"
        );
    }

    #[test]
    fn alias_next_to_entity_is_linked() {
        let html = link_references(&context("/site/page.md"), "<p>cat&amp;dog</p>");
        assert_eq!(
            html,
            "<p><a class=\"reference\" href=\"/ref.html#cat\">cat</a>&amp;\
             <a class=\"reference\" href=\"/ref.html#dog\">dog</a></p>"
        );
    }

    #[test]
    fn self_reference_inside_defining_section() {
        let ctx = context("/site/ref.md");
        let html = "<h2 id=\"cat\">Cat</h2>\n<p>A kitty. A dog.</p>\n";

        assert_eq!(
            link_references(&ctx, html),
            "<h2 id=\"cat\">Cat</h2>\n<p>A <span class=\"self-reference\">kitty</span>. \
             A <a class=\"reference\" href=\"/ref.html#dog\">dog</a>.</p>\n"
        );
    }

    #[test]
    fn opted_out_or_pathless_is_unchanged() {
        let html = "<p>cat</p>";

        let mut ctx = context("/site/page.md");
        ctx.no_refs = true;
        assert_eq!(link_references(&ctx, html), html);

        let mut ctx = context("/site/page.md");
        ctx.path = None;
        assert_eq!(link_references(&ctx, html), html);

        assert_eq!(link_references(&RenderContext::default(), html), html);
    }
}
