//! Traceable requirements, published as documents.
//!
//! Requirements are items stored as YAML files, grouped into documents that
//! form a tree. The tree can be published as HTML, Markdown, plain text or a
//! CSV traceability matrix.

pub mod domain;
pub use domain::{Document, Item, PublishConfig, Tree, Uid};

pub mod publish;
pub use publish::{publish_lines, Format, PublishError, Publisher, Target};

/// Filesystem storage for documents and templates.
pub mod storage;
pub use storage::{load_tree, FileSystem, LoadError, MemoryFileSystem, OsFileSystem};
