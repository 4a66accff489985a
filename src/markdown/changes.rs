//! Change annotation preprocessor
//!
//! Marks every section heading with the commits that touched the section
//! since a given ref. It must run before any other preprocessor: it maps
//! source lines to blame line numbers and needs the pristine text.

use std::sync::Arc;

use tracing::{debug, warn};

use super::escape::escape_html;
use super::pipeline::RenderContext;
use crate::git::{BlameMap, Commit, GitRepo, GitSettings};

/// Annotates headings of `text` with changes since `ctx.changes.since`
///
/// Any git failure is logged and leaves the text unchanged.
pub fn annotate_changes(ctx: &RenderContext, text: &str, git: &GitSettings) -> String {
    let (Some(since), Some(path)) = (ctx.changes.since.as_deref(), ctx.path.as_deref()) else {
        return text.to_string();
    };

    let blame = GitRepo::discover(path, git.clone()).and_then(|repo| repo.blame_file(path, Some(since)));

    match blame {
        Ok(blame) => {
            debug!(path = %path.display(), since, lines = blame.len(), "Annotating changes");
            annotate_with_blame(
                text,
                &blame,
                ctx.front_matter_lines,
                ctx.changes.link_template.as_deref(),
            )
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Skipping change annotation");
            text.to_string()
        }
    }
}

/// Appends a change tooltip to each heading line whose section has blamed lines
///
/// Line `i` of `text` (0-based) is blame line `offset + i + 1`.
pub fn annotate_with_blame(
    text: &str,
    blame: &BlameMap,
    offset: usize,
    link_template: Option<&str>,
) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut section: Option<(usize, Vec<Arc<Commit>>)> = None;
    let mut fence: Option<char> = None;

    for (index, line) in lines.iter().enumerate() {
        fence = next_fence_state(fence, line);
        if fence.is_none() && is_heading_line(line) {
            flush(&mut out, &mut section, link_template);
            section = Some((out.len(), Vec::new()));
        }

        out.push((*line).to_string());

        if line.is_empty() {
            continue;
        }
        let Some((_, commits)) = section.as_mut() else {
            continue;
        };
        let number = u32::try_from(offset + index + 1).unwrap_or(u32::MAX);
        if let Some(commit) = blame.get(&number) {
            if !commits.iter().any(|c| c.hash == commit.hash) {
                commits.push(Arc::clone(commit));
            }
        }
    }
    flush(&mut out, &mut section, link_template);

    let mut result = out.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn flush(out: &mut [String], section: &mut Option<(usize, Vec<Arc<Commit>>)>, link_template: Option<&str>) {
    if let Some((heading, commits)) = section.take() {
        if !commits.is_empty() {
            out[heading].push_str(&tooltip(&commits, link_template));
        }
    }
}

/// Tracks fenced code blocks; returns the open fence character, if any
fn next_fence_state(open: Option<char>, line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    let marker = if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    };

    match (open, marker) {
        (None, Some(m)) => Some(m),
        (Some(o), Some(m)) if o == m => None,
        (state, _) => state,
    }
}

fn is_heading_line(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }

    let rest = &line[indent..];
    let hashes = rest.len() - rest.trim_start_matches('#').len();
    (1..=6).contains(&hashes)
        && rest[hashes..]
            .chars()
            .next()
            .map_or(true, |c| c == ' ' || c == '\t')
}

fn tooltip(commits: &[Arc<Commit>], link_template: Option<&str>) -> String {
    let items: String = commits
        .iter()
        .map(|commit| {
            let summary = escape_html(&commit.summary);
            let summary = match link_template {
                Some(template) => format!(
                    "<a href=\"{}\">{}</a>",
                    template.replace("{commit}", &commit.hash),
                    summary
                ),
                None => summary,
            };
            format!(
                "<div class=\"change-item\"><span class=\"change-author\">{}</span> \
                 <span class=\"change-date\">{}:</span><br/>\
                 <span class=\"change-summary\">{}</span></div>",
                escape_html(&commit.author),
                commit.date,
                summary
            )
        })
        .collect();

    format!(
        "<div class=\"tooltip change\"><div class=\"change-icon\"><span>{}</span></div>\
         <div class=\"change-list\">{}</div></div>",
        commits.len(),
        items
    )
}
