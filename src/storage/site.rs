//! Site build: discover pages, link metadata, convert and write HTML
//!
//! Every page's front matter is parsed before any page renders, so each
//! page's metadata can inherit from the `index.md` of its nearest ancestor
//! directory. A page that fails is reported and the rest of the build goes
//! on; only a broken reference document stops the build up front.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::frontmatter::{Document, FrontMatterError};
use crate::domain::{MetadataChain, ReferenceError, ReferenceTable, DEFAULT_REFERENCE_LEVELS};
use crate::markdown::{build_reference_table, escape_html, Pipeline, PipelineSettings, RenderContext};

const INDEX_PAGE: &str = "index.md";

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("{0}: no such file")]
    Missing(PathBuf),

    #[error("{0}: directory skipped (use --recursive)")]
    Directory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to build and how
#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Site root; output URLs are relative to it
    pub root: PathBuf,
    pub reference: Option<PathBuf>,
    pub reference_levels: BTreeSet<u8>,
    /// Mirror the site tree here instead of writing next to sources
    pub output_dir: Option<PathBuf>,
    /// Descend into directories given as inputs
    pub recursive: bool,
    pub pipeline: PipelineSettings,
}

impl SiteOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reference: None,
            reference_levels: DEFAULT_REFERENCE_LEVELS.into_iter().collect(),
            output_dir: None,
            recursive: false,
            pipeline: PipelineSettings::default(),
        }
    }
}

/// A page written by the build
#[derive(Debug, Clone, Serialize)]
pub struct BuiltPage {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// A page or input that could not be built
#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub path: PathBuf,
    pub error: String,
}

impl PageFailure {
    fn new(path: &Path, error: &SiteError) -> Self {
        warn!(path = %path.display(), "{}", error);
        Self {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub written: Vec<BuiltPage>,
    pub failed: Vec<PageFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A parsed page waiting to be rendered
struct Page {
    path: PathBuf,
    document: Document,
}

/// A configured site builder
pub struct Site {
    options: SiteOptions,
    root: PathBuf,
    pipeline: Pipeline,
    references: Option<Arc<ReferenceTable>>,
}

impl Site {
    /// Prepares the pipeline and, if configured, the reference table
    pub fn new(options: SiteOptions) -> Result<Self, ReferenceError> {
        let root = options
            .root
            .canonicalize()
            .map_err(|source| ReferenceError::Read {
                path: options.root.clone(),
                source,
            })?;
        let pipeline = Pipeline::standard(&options.pipeline);

        let references = match &options.reference {
            Some(reference) => Some(Arc::new(build_reference_table(
                &pipeline,
                reference,
                &options.reference_levels,
                &root,
            )?)),
            None => None,
        };

        Ok(Self {
            options,
            root,
            pipeline,
            references,
        })
    }

    pub fn references(&self) -> Option<&ReferenceTable> {
        self.references.as_deref()
    }

    /// Expands inputs into Markdown files; bad inputs are reported
    pub fn discover(&self, inputs: &[PathBuf]) -> (Vec<PathBuf>, Vec<PageFailure>) {
        let mut pages = BTreeSet::new();
        let mut failed = Vec::new();

        for input in inputs {
            if input.is_file() {
                match input.canonicalize() {
                    Ok(path) => {
                        pages.insert(path);
                    }
                    Err(source) => failed.push(PageFailure::new(
                        input,
                        &SiteError::Read {
                            path: input.clone(),
                            source,
                        },
                    )),
                }
            } else if input.is_dir() {
                if !self.options.recursive {
                    failed.push(PageFailure::new(input, &SiteError::Directory(input.clone())));
                    continue;
                }
                if let Err(source) = collect_markdown(input, &mut pages) {
                    failed.push(PageFailure::new(
                        input,
                        &SiteError::Read {
                            path: input.clone(),
                            source,
                        },
                    ));
                }
            } else {
                failed.push(PageFailure::new(input, &SiteError::Missing(input.clone())));
            }
        }

        (pages.into_iter().collect(), failed)
    }

    /// Builds every page reachable from `inputs`
    pub fn build(&self, inputs: &[PathBuf]) -> BuildReport {
        let (paths, failed) = self.discover(inputs);
        let mut report = BuildReport {
            failed,
            ..BuildReport::default()
        };

        let mut pages = Vec::new();
        for path in paths {
            match read_page(&path) {
                Ok(page) => pages.push(page),
                Err(e) => report.failed.push(PageFailure::new(&path, &e)),
            }
        }

        let chains = link_metadata(&pages);

        for page in &pages {
            let Some(metadata) = chains.get(&page.path) else {
                continue;
            };
            match self.render_page(page, metadata) {
                Ok(output) => {
                    info!(source = %page.path.display(), output = %output.display(), "Wrote page");
                    report.written.push(BuiltPage {
                        source: page.path.clone(),
                        output,
                    });
                }
                Err(e) => report.failed.push(PageFailure::new(&page.path, &e)),
            }
        }

        report
    }

    fn render_page(&self, page: &Page, metadata: &MetadataChain) -> Result<PathBuf, SiteError> {
        let mut ctx = RenderContext {
            path: Some(page.path.clone()),
            references: self.references.clone(),
            front_matter_lines: page.document.front_matter_lines,
            ..RenderContext::default()
        };
        ctx.apply_metadata(metadata);

        let body = self.pipeline.convert(&page.document.body, &mut ctx);

        let title = metadata
            .get_str("title")
            .map(str::to_string)
            .or_else(|| {
                page.path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let html = page_shell(&title, ctx.store.toc_html.as_deref(), &body);

        let output = self.output_path(&page.path);
        write_atomic(&output, &html)?;
        Ok(output)
    }

    /// `<name>.html` next to the source, or mirrored under the output directory
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let html = source.with_extension("html");
        match &self.options.output_dir {
            Some(dir) => match html.strip_prefix(&self.root) {
                Ok(relative) => dir.join(relative),
                Err(_) => dir.join(html.file_name().unwrap_or_default()),
            },
            None => html,
        }
    }
}

fn collect_markdown(dir: &Path, pages: &mut BTreeSet<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            collect_markdown(&path, pages)?;
        } else if path.extension().is_some_and(|e| e == "md") {
            pages.insert(path.canonicalize()?);
        }
    }
    Ok(())
}

fn read_page(path: &Path) -> Result<Page, SiteError> {
    let source = fs::read_to_string(path).map_err(|source| SiteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = Document::parse(&source).map_err(|source| SiteError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Page {
        path: path.to_path_buf(),
        document,
    })
}

/// Chains each page's metadata onto its nearest ancestor index page
fn link_metadata(pages: &[Page]) -> HashMap<PathBuf, MetadataChain> {
    let by_path: HashMap<&Path, &Page> = pages.iter().map(|p| (p.path.as_path(), p)).collect();

    // Parents first: shallower pages, and index pages before their siblings
    let mut order: Vec<&Page> = pages.iter().collect();
    order.sort_by_key(|p| (p.path.components().count(), !is_index(&p.path)));

    let mut chains: HashMap<PathBuf, MetadataChain> = HashMap::new();
    for page in order {
        let layer = page.document.metadata.clone();
        let chain = match parent_index(&page.path, &by_path).and_then(|parent| chains.get(parent)) {
            Some(parent) => parent.new_child(layer),
            None => MetadataChain::new(layer),
        };
        debug!(path = %page.path.display(), depth = chain.depth(), "Linked metadata");
        chains.insert(page.path.clone(), chain);
    }

    chains
}

fn is_index(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == INDEX_PAGE)
}

/// The `index.md` of the nearest ancestor directory that has one
fn parent_index<'p>(path: &Path, pages: &HashMap<&'p Path, &Page>) -> Option<&'p Path> {
    let mut dir = path.parent()?.to_path_buf();
    if is_index(path) && !dir.pop() {
        return None;
    }

    loop {
        let candidate = dir.join(INDEX_PAGE);
        if let Some((found, _)) = pages.get_key_value(candidate.as_path()) {
            return Some(*found);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn page_shell(title: &str, toc: Option<&str>, body: &str) -> String {
    let nav = toc
        .map(|toc| format!("<nav class=\"toc\">{}\n</nav>\n", toc))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}<main>\n{}</main>\n</body>\n</html>\n",
        escape_html(title),
        nav,
        body
    )
}

/// Writes via a temp file and rename so readers never see partial pages
fn write_atomic(path: &Path, content: &str) -> Result<(), SiteError> {
    let write_error = |source| SiteError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let temp_path = path.with_extension("html.tmp");
    fs::write(&temp_path, content).map_err(write_error)?;
    fs::rename(&temp_path, path).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn site(dir: &TempDir) -> Site {
        let mut options = SiteOptions::new(dir.path());
        options.recursive = true;
        Site::new(options).unwrap()
    }

    #[test]
    fn builds_page_next_to_source() {
        let dir = TempDir::new().unwrap();
        let page = write(dir.path(), "page.md", "---\ntitle: Hello & bye\n---\n# One\n\ntext\n");

        let report = site(&dir).build(&[page]);

        assert!(report.is_success());
        let html = fs::read_to_string(dir.path().join("page.html")).unwrap();
        assert!(html.contains("<title>Hello &amp; bye</title>"));
        assert!(html.contains("<nav class=\"toc\">"));
        assert!(html.contains("<h1 id=\"one\">One</h1>"));
        assert!(!dir.path().join("page.html.tmp").exists());
    }

    #[test]
    fn recursive_discovery_skips_hidden() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "a");
        write(dir.path(), "sub/b.md", "b");
        write(dir.path(), ".hidden/c.md", "c");
        write(dir.path(), "notes.txt", "x");

        let (pages, failed) = site(&dir).discover(&[dir.path().to_path_buf()]);

        assert!(failed.is_empty());
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn directory_without_recursive_is_reported() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(SiteOptions::new(dir.path())).unwrap();

        let (pages, failed) = site.discover(&[dir.path().to_path_buf(), dir.path().join("nope.md")]);

        assert!(pages.is_empty());
        assert_eq!(failed.len(), 2);
        assert!(failed[0].error.contains("--recursive"));
        assert!(failed[1].error.contains("no such file"));
    }

    #[test]
    fn bad_page_does_not_stop_the_build() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.md", "---\ntitle: x\n");
        write(dir.path(), "good.md", "# Fine\n");

        let report = site(&dir).build(&[dir.path().to_path_buf()]);

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.contains("not terminated"));
        assert!(dir.path().join("good.html").exists());
    }

    #[test]
    fn metadata_inherits_from_index_pages() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "---\ntitle: Site\nno-refs: true\nprivate: [title]\n---\n");
        write(dir.path(), "guide/index.md", "---\nauthor: Ann\n---\n");
        write(dir.path(), "guide/deep/page.md", "---\n---\n");

        let pages: Vec<Page> = [
            dir.path().join("guide/deep/page.md"),
            dir.path().join("guide/index.md"),
            dir.path().join("index.md"),
        ]
        .iter()
        .map(|p| read_page(&p.canonicalize().unwrap()).unwrap())
        .collect();
        let chains = link_metadata(&pages);

        let page = &chains[&pages[0].path];
        assert_eq!(page.depth(), 3);
        assert_eq!(page.get_str("author"), Some("Ann"));
        assert!(page.flag("no-refs"));
        assert_eq!(page.get_str("title"), None);

        let root = &chains[&pages[2].path];
        assert_eq!(root.depth(), 1);
        assert_eq!(root.get_str("title"), Some("Site"));
        assert_eq!(chains[&pages[1].path].depth(), 2);
    }

    #[test]
    fn output_dir_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let page = write(dir.path(), "docs/page.md", "text\n");

        let mut options = SiteOptions::new(dir.path());
        options.output_dir = Some(out.path().to_path_buf());
        let site = Site::new(options).unwrap();
        let report = site.build(&[page]);

        assert!(report.is_success());
        assert!(out.path().join("docs/page.html").exists());
        assert!(!dir.path().join("docs/page.html").exists());
    }

    #[test]
    fn shell_without_toc() {
        let html = page_shell("T", None, "<p>x</p>\n");
        assert!(!html.contains("<nav"));
        assert!(html.contains("<main>\n<p>x</p>\n</main>"));
    }
}
