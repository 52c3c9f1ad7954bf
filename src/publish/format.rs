use std::{fmt, path::Path, str::FromStr};

use crate::publish::PublishError;

/// The output formats documents can be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// An HTML page per document, wrapped in a template.
    Html,
    /// Markdown with `#` headings.
    Markdown,
    /// Plain text.
    Text,
    /// A CSV traceability matrix.
    Csv,
}

impl Format {
    /// All formats, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Html, Self::Markdown, Self::Text, Self::Csv];

    /// Resolves a format from a file extension, with or without the leading
    /// dot.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" | "text" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Resolves a format from the extension of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
    }

    /// The canonical file extension, without a dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| PublishError::UnsupportedFormat(s.to_string()))
    }
}
