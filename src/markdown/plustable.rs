//! Plus-table preprocessor
//!
//! A lightweight table syntax where columns are separated by two or more
//! spaces:
//!
//! ```text
//! +++small,nowrap
//! Name        Meaning
//! `--fast`    Skip *slow* checks
//! ++
//! Group two   Second header row
//! +++
//! ```
//!
//! The first row, and the row after each `++` line, is a header row. Cells
//! are rendered as inline Markdown.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::render::render_inline;

static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^\+\+\+([^\n]*)\n(.*?)\n\+\+\+\n").expect("plus-table pattern is valid")
});

static CELL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("cell separator pattern is valid"));

/// Replaces every plus-table block in `text` with an HTML table
pub fn plus_tables(text: &str) -> String {
    TABLE
        .replace_all(text, |caps: &Captures<'_>| render_table(&caps[1], &caps[2]))
        .into_owned()
}

fn render_table(options: &str, body: &str) -> String {
    let options: Vec<&str> = options.split(',').map(str::trim).collect();
    let small = options.contains(&"small");
    let nowrap = options.contains(&"nowrap");

    let mut html = format!(
        "<div class=\"scroll-x\">\n<table class=\"{}\">\n<thead>\n",
        if small { "small" } else { "" }
    );
    let mut header = true;
    let mut width = 0;

    for line in body.split('\n') {
        if line == "++" {
            html.push_str("</tbody>\n<thead>\n");
            header = true;
            continue;
        }

        let mut cells: Vec<String> = CELL_SEPARATOR.split(line).map(render_inline).collect();
        if header {
            width = cells.len();
        } else if cells.len() < width {
            cells.resize(width, String::new());
        }

        let cell = if header { "th" } else { "td" };
        html.push_str("<tr>");
        for (i, content) in cells.iter().enumerate() {
            if i == 0 && nowrap {
                html.push_str(&format!("<{cell} class=\"nowrap\">{content}</{cell}>"));
            } else {
                html.push_str(&format!("<{cell}>{content}</{cell}>"));
            }
        }
        html.push_str("</tr>\n");

        if header {
            html.push_str("</thead>\n<tbody>\n");
            header = false;
        }
    }

    // The blank line ends the HTML block for the Markdown converter
    html.push_str("</tbody>\n</table>\n</div>\n\n");
    html
}
