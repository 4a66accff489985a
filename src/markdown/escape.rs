//! HTML escaping for text spliced into generated markup

/// Escapes `&`, `<`, `>` and `"` for use in element content or attributes.
///
/// # Examples
///
/// ```
/// use markweave::markdown::escape_html;
///
/// assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(escape_html("Fix the thing"), "Fix the thing");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>O'Neil & co</b>"), "&lt;b&gt;O'Neil &amp; co&lt;/b&gt;");
    }
}
