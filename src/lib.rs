//! Markweave - Markdown to HTML for small documentation sites
//!
//! Pages are converted through an ordered pipeline of text preprocessors,
//! a CommonMark renderer and HTML postprocessors. Along the way headings
//! feed a table of contents, terms defined in a reference document are
//! linked wherever they appear, and sections changed since a git ref can
//! be marked.

pub mod cli;
pub mod domain;
pub mod git;
pub mod markdown;
pub mod storage;

pub use domain::{Heading, MetadataChain, MetadataLayer, ReferenceTable};
pub use markdown::{Pipeline, PipelineSettings, RenderContext};
