//! Conversion pipeline
//!
//! ```text
//! source ─▶ preprocessors ─▶ render_markdown ─▶ postprocessors ─▶ html
//!                                  │
//!                                  └─▶ headings ─▶ ctx.store.toc / toc_html
//! ```
//!
//! Both chains run in registration order. Order matters: the change
//! annotator works on source line numbers, so it is registered before any
//! other preprocessor rewrites the text.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::Value;
use tracing::trace;

use super::changes::annotate_changes;
use super::linker::link_references;
use super::plustable::plus_tables;
use super::postprocess::{header_sections, link_images, swedish_quotes};
use super::render::render_markdown;
use crate::domain::{
    build_toc_html, Heading, MetadataChain, MetadataLayer, ReferenceTable, DEFAULT_ORDERED_LEVELS,
};
use crate::git::GitSettings;
use crate::storage::{Document, FrontMatterError};

/// Front-matter keys that configure a conversion
pub const NO_REFS_KEY: &str = "no-refs";
pub const CHANGES_SINCE_KEY: &str = "show-changes-since";
pub const CHANGES_LINK_KEY: &str = "show-changes-repo";

/// Change annotation settings for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSettings {
    /// Ref after which changes are shown
    pub since: Option<String>,

    /// Commit link with a `{commit}` placeholder
    pub link_template: Option<String>,
}

/// Values produced during a conversion
#[derive(Debug, Clone, Default)]
pub struct Store {
    /// Set while a conversion is running
    pub in_markdown: bool,
    pub toc: Option<Vec<Heading>>,
    pub toc_html: Option<String>,
}

/// Per-conversion state handed to contextual processors
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Source file of the document, if it has one
    pub path: Option<PathBuf>,
    pub references: Option<Arc<ReferenceTable>>,
    /// Document opted out of reference linking
    pub no_refs: bool,
    pub changes: ChangeSettings,
    /// Lines taken by front matter before the body
    pub front_matter_lines: usize,
    pub store: Store,
}

impl RenderContext {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reads `no-refs`, `show-changes-since` and `show-changes-repo`
    pub fn apply_metadata(&mut self, metadata: &MetadataChain) {
        self.no_refs |= metadata.flag(NO_REFS_KEY);
        if let Some(since) = metadata.get(CHANGES_SINCE_KEY).and_then(scalar_string) {
            self.changes.since = Some(since);
        }
        if let Some(link) = metadata.get_str(CHANGES_LINK_KEY) {
            self.changes.link_template = Some(link.to_string());
        }
    }
}

/// Refs like `2024` or `1.5` parse as YAML numbers
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

type PlainFn = dyn Fn(&str) -> String + Send + Sync;
type ContextualFn = dyn Fn(&RenderContext, &str) -> String + Send + Sync;

enum Run {
    Plain(Box<PlainFn>),
    Contextual(Box<ContextualFn>),
}

/// A named text transformation in one of the chains
pub struct Processor {
    name: String,
    run: Run,
}

impl Processor {
    /// A processor that only sees the text
    pub fn plain<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Run::Plain(Box::new(f)),
        }
    }

    /// A processor that also sees the conversion context
    pub fn contextual<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RenderContext, &str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Run::Contextual(Box::new(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_contextual(&self) -> bool {
        matches!(self.run, Run::Contextual(_))
    }

    fn apply(&self, ctx: &RenderContext, text: &str) -> String {
        match &self.run {
            Run::Plain(f) => f(text),
            Run::Contextual(f) => f(ctx, text),
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field("contextual", &self.is_contextual())
            .finish()
    }
}

/// Options for the standard processor set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub git: GitSettings,
    pub swedish_quotes: bool,
    pub toc_ordered_levels: BTreeSet<u8>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            git: GitSettings::default(),
            swedish_quotes: false,
            toc_ordered_levels: DEFAULT_ORDERED_LEVELS.into_iter().collect(),
        }
    }
}

/// A converted document
#[derive(Debug, Clone)]
pub struct Converted {
    pub html: String,
    pub metadata: MetadataLayer,
}

/// Ordered processor chains around the Markdown converter
#[derive(Debug)]
pub struct Pipeline {
    preprocessors: Vec<Processor>,
    postprocessors: Vec<Processor>,
    toc_ordered_levels: BTreeSet<u8>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// A pipeline with empty chains
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            postprocessors: Vec::new(),
            toc_ordered_levels: DEFAULT_ORDERED_LEVELS.into_iter().collect(),
        }
    }

    /// The built-in processors, in their required order
    pub fn standard(settings: &PipelineSettings) -> Self {
        let mut pipeline = Self::new();
        pipeline.toc_ordered_levels = settings.toc_ordered_levels.clone();

        let git = settings.git.clone();
        pipeline
            .add_preprocessor(Processor::contextual("changes", move |ctx, text| {
                annotate_changes(ctx, text, &git)
            }))
            .add_preprocessor(Processor::plain("plus-tables", plus_tables));

        if settings.swedish_quotes {
            pipeline.add_postprocessor(Processor::plain("swedish-quotes", swedish_quotes));
        }
        pipeline
            .add_postprocessor(Processor::contextual("references", link_references))
            .add_postprocessor(Processor::plain("image-links", link_images))
            .add_postprocessor(Processor::plain("header-sections", header_sections));

        pipeline
    }

    pub fn add_preprocessor(&mut self, processor: Processor) -> &mut Self {
        self.preprocessors.push(processor);
        self
    }

    pub fn add_postprocessor(&mut self, processor: Processor) -> &mut Self {
        self.postprocessors.push(processor);
        self
    }

    pub fn preprocessors(&self) -> impl Iterator<Item = &str> {
        self.preprocessors.iter().map(Processor::name)
    }

    pub fn postprocessors(&self) -> impl Iterator<Item = &str> {
        self.postprocessors.iter().map(Processor::name)
    }

    /// Converts a document body, storing its TOC in `ctx.store`
    ///
    /// Returns the text unchanged when a conversion is already running on
    /// this context.
    pub fn convert(&self, text: &str, ctx: &mut RenderContext) -> String {
        self.convert_inner(text, ctx, true)
    }

    /// Converts a snippet without touching the stored TOC
    pub fn convert_fragment(&self, text: &str, ctx: &mut RenderContext) -> String {
        self.convert_inner(text, ctx, false)
    }

    /// Splits front matter off `source`, applies it to `ctx` and converts the body
    pub fn convert_document(
        &self,
        source: &str,
        ctx: &mut RenderContext,
    ) -> Result<Converted, FrontMatterError> {
        let document = Document::parse(source)?;

        ctx.front_matter_lines = document.front_matter_lines;
        ctx.apply_metadata(&MetadataChain::new(document.metadata.clone()));

        Ok(Converted {
            html: self.convert(&document.body, ctx),
            metadata: document.metadata,
        })
    }

    fn convert_inner(&self, text: &str, ctx: &mut RenderContext, capture_toc: bool) -> String {
        if ctx.store.in_markdown {
            return text.to_string();
        }

        ctx.store.in_markdown = true;
        let (html, headings) = self.run(text, ctx);
        ctx.store.in_markdown = false;

        if capture_toc && !headings.is_empty() {
            ctx.store.toc_html = Some(build_toc_html(&headings, &self.toc_ordered_levels));
            ctx.store.toc = Some(headings);
        }

        html
    }

    fn run(&self, text: &str, ctx: &RenderContext) -> (String, Vec<Heading>) {
        let mut text = text.to_string();
        for processor in &self.preprocessors {
            text = processor.apply(ctx, &text);
            trace!(processor = processor.name(), len = text.len(), "Preprocessed");
        }

        let rendered = render_markdown(&text);

        let mut html = rendered.html;
        for processor in &self.postprocessors {
            html = processor.apply(ctx, &html);
            trace!(processor = processor.name(), len = html.len(), "Postprocessed");
        }

        (html, rendered.headings)
    }
}
