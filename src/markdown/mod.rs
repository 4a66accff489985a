//! # Markdown Layer
//!
//! Converts page bodies to HTML through an ordered chain of processors.
//!
//! ## Standard chain
//!
//! | Stage | Processor | Kind |
//! |-------|-----------|------|
//! | pre | `changes` - change tooltips on headings | contextual |
//! | pre | `plus-tables` - `+++` table blocks | plain |
//! | base | [`render_markdown`] - pulldown-cmark, heading anchors | |
//! | post | `swedish-quotes` (opt-in) | plain |
//! | post | `references` - alias links | contextual |
//! | post | `image-links` - linked images, hashtag classes | plain |
//! | post | `header-sections` - `no-break-section` wrappers | plain |
//!
//! ## Key Types
//!
//! - [`Pipeline`] - Processor chains and the conversion entry points
//! - [`RenderContext`] - Per-conversion state, including the TOC [`Store`]
//! - [`Tokenizer`] - Scanner over generated HTML with tag and header stacks

mod changes;
mod escape;
mod linker;
mod pipeline;
mod plustable;
mod postprocess;
mod references;
mod render;
mod tokenizer;

pub use changes::{annotate_changes, annotate_with_blame};
pub use escape::escape_html;
pub use linker::link_references;
pub use pipeline::{
    ChangeSettings, Converted, Pipeline, PipelineSettings, Processor, RenderContext, Store,
    CHANGES_LINK_KEY, CHANGES_SINCE_KEY, NO_REFS_KEY,
};
pub use plustable::plus_tables;
pub use postprocess::{header_sections, link_images, swedish_quotes};
pub use references::{build_reference_table, site_url};
pub use render::{render_inline, render_markdown, Rendered};
pub use tokenizer::{OpenHeader, Token, TokenKind, Tokenizer};
