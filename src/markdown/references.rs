//! Building the reference table from a reference document

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path};

use tracing::{debug, info};

use super::pipeline::{Pipeline, RenderContext};
use crate::domain::{ReferenceError, ReferenceTable};
use crate::storage::Document;

/// Converts the reference document and indexes its headings at `levels`
///
/// The document is rendered without a path, so it is neither linked nor
/// annotated with changes. Canonical URLs are relative to `root`.
pub fn build_reference_table(
    pipeline: &Pipeline,
    reference_path: &Path,
    levels: &BTreeSet<u8>,
    root: &Path,
) -> Result<ReferenceTable, ReferenceError> {
    let read_error = |source| ReferenceError::Read {
        path: reference_path.to_path_buf(),
        source,
    };
    let path = reference_path.canonicalize().map_err(read_error)?;
    let root = root.canonicalize().map_err(|source| ReferenceError::Read {
        path: root.to_path_buf(),
        source,
    })?;

    let source = fs::read_to_string(&path).map_err(|source| ReferenceError::Read {
        path: path.clone(),
        source,
    })?;
    let document = Document::parse(&source).map_err(|e| ReferenceError::FrontMatter {
        path: path.clone(),
        message: e.to_string(),
    })?;

    let mut ctx = RenderContext::default();
    pipeline.convert(&document.body, &mut ctx);
    let headings = ctx.store.toc.unwrap_or_default();
    debug!(path = %path.display(), headings = headings.len(), "Converted reference document");

    let page = site_url(&path, &root)?;
    let table = ReferenceTable::from_headings(&headings, levels, &path, &page)?;
    info!(path = %path.display(), aliases = table.len(), "Built reference table");

    Ok(table)
}

/// Site-absolute URL of the page rendered from `path`, e.g. `/docs/ref.html`
pub fn site_url(path: &Path, root: &Path) -> Result<String, ReferenceError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ReferenceError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?
        .with_extension("html");

    let mut url = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            url.push('/');
            url.push_str(&part.to_string_lossy());
        }
    }
    Ok(url)
}
