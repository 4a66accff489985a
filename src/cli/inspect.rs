//! Read-only commands: `toc`, `blame` and `refs`

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::build_toc_tree;
use crate::git::GitRepo;
use crate::markdown::{build_reference_table, Pipeline, RenderContext};
use crate::storage::Config;

/// Prints the table of contents of `file`
pub fn toc(output: &Output, config: &Config, file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let pipeline = Pipeline::standard(&config.project.pipeline_settings());
    // No path: the page is neither linked nor blamed
    let mut ctx = RenderContext::default();
    pipeline
        .convert_document(&source, &mut ctx)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let headings = ctx.store.toc.unwrap_or_default();
    if output.is_json() {
        output.data(&build_toc_tree(&headings));
    } else if let Some(html) = ctx.store.toc_html {
        output.markup(&html);
    } else {
        output.summary("No headings");
    }

    Ok(())
}

#[derive(Serialize)]
struct BlameLine<'a> {
    line: u32,
    hash: &'a str,
    date: &'a str,
    author: &'a str,
    summary: &'a str,
}

/// Prints the commit that last changed each line of `file`
pub fn blame(output: &Output, config: &Config, file: &Path, since: Option<&str>) -> Result<()> {
    let file = file
        .canonicalize()
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let repo = GitRepo::discover(&file, config.project.git.settings())?;
    let blame = repo
        .blame_file(&file, since)
        .with_context(|| format!("Failed to blame {}", file.display()))?;

    if output.is_json() {
        let lines: Vec<BlameLine> = blame
            .iter()
            .map(|(line, commit)| BlameLine {
                line: *line,
                hash: &commit.hash,
                date: &commit.date,
                author: &commit.author,
                summary: &commit.summary,
            })
            .collect();
        output.data(&lines);
        return Ok(());
    }

    for (line, commit) in &blame {
        let short = commit.hash.get(..8).unwrap_or(&commit.hash);
        let line = line.to_string();
        output.row(&[
            line.as_str(),
            short,
            commit.date.as_str(),
            commit.author.as_str(),
            commit.summary.as_str(),
        ]);
    }
    if blame.is_empty() {
        output.detail("No matching changes");
    }

    Ok(())
}

/// Lists the aliases defined by the reference document `file`
pub fn refs(
    output: &Output,
    config: &Config,
    file: &Path,
    root: Option<&Path>,
    levels: &[u8],
) -> Result<()> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => config.root_or_cwd()?,
    };
    let levels = if levels.is_empty() {
        config.project.reference_level_set()
    } else {
        levels.iter().copied().collect()
    };

    let pipeline = Pipeline::standard(&config.project.pipeline_settings());
    let table = build_reference_table(&pipeline, file, &levels, &root)
        .with_context(|| format!("Failed to index {}", file.display()))?;

    let entries = table.entries();
    if output.is_json() {
        output.data(&entries);
    } else {
        for entry in entries {
            output.row(&[entry.alias.as_str(), entry.canonical_url.as_str()]);
        }
    }

    Ok(())
}
