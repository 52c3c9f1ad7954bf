//! Domain models for traceable requirements.
//!
//! This module contains the core domain types: items and their identifiers,
//! documents, the document tree and the publishing configuration.

/// Item identifiers.
pub mod uid;
pub use uid::{Uid, UidError, UidParts};

mod level;
pub use level::{Level, LevelError};

/// Requirement items and their links.
pub mod item;
pub use item::{AttributeError, Item};

mod document;
pub use document::{Document, DocumentError};

pub mod tree;
pub use tree::{TraceItem, TraceRow, Tree, TreeError};

mod config;
pub use config::{PublishConfig, DEFAULT_TEMPLATE};
