//! The `build` command

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::output::Output;
use crate::storage::{Config, Site, SiteOptions};

/// Arguments of `markweave build`
pub struct BuildArgs {
    pub paths: Vec<PathBuf>,
    pub recursive: bool,
    pub root: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub reference_levels: Vec<u8>,
    pub output_dir: Option<PathBuf>,
}

/// Resolves flags over configuration into site options
pub fn site_options(config: &Config, args: &BuildArgs) -> Result<SiteOptions> {
    let project = &config.project;

    let root = match &args.root {
        Some(root) => root.clone(),
        None => config.root_or_cwd()?,
    };

    let reference = args
        .reference
        .clone()
        .or_else(|| project.reference.as_deref().map(|p| config.resolve(p)));

    let reference_levels: BTreeSet<u8> = if args.reference_levels.is_empty() {
        project.reference_level_set()
    } else {
        args.reference_levels.iter().copied().collect()
    };

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| project.output_dir.as_deref().map(|p| config.resolve(p)));

    Ok(SiteOptions {
        root,
        reference,
        reference_levels,
        output_dir,
        recursive: args.recursive,
        pipeline: project.pipeline_settings(),
    })
}

/// Builds the given pages and reports what was written
pub fn run(output: &Output, config: &Config, args: BuildArgs) -> Result<()> {
    let options = site_options(config, &args)?;
    let root = options.root.clone();

    let site = Site::new(options).context("Failed to prepare site")?;
    let report = site.build(&args.paths);

    if output.is_json() {
        output.data(&report);
    } else {
        for page in &report.written {
            let source = relative(&page.source, &root);
            let target = relative(&page.output, &root);
            output.row(&[source.as_str(), "->", target.as_str()]);
        }
        for failure in &report.failed {
            output.problem(&failure.error);
        }
        if report.is_success() {
            output.summary(&format!("Built {} page(s)", report.written.len()));
        }
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} page(s) failed, {} written",
            report.failed.len(),
            report.written.len()
        );
    }

    Ok(())
}

fn relative(path: &Path, root: &Path) -> String {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    path.strip_prefix(&root)
        .unwrap_or(path)
        .display()
        .to_string()
}
