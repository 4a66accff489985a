//! Domain models for markweave
//!
//! Pure data types and algorithms without any I/O concerns.

mod heading;
mod metadata;
mod reference;
mod toc;

pub use heading::{slugify, AnchorAllocator, Heading};
pub use metadata::{MetadataChain, MetadataLayer, PRIVATE_KEY};
pub use reference::{
    AliasOptions, AliasSpec, ReferenceEntry, ReferenceError, ReferenceMatch, ReferenceTable,
    DEFAULT_REFERENCE_LEVELS,
};
pub use toc::{build_toc_html, build_toc_tree, TocNode, DEFAULT_ORDERED_LEVELS};
