//! HTML page templates.
//!
//! A template is an HTML page with three placeholders: `{{title}}`, `{{toc}}`
//! and `{{body}}`. Rendered items replace `{{body}}`, so everything before it
//! is emitted as the page head and everything after it as the page tail.

use std::{io, path::PathBuf};

use crate::{domain::DEFAULT_TEMPLATE, storage::FileSystem};

const TITLE: &str = "{{title}}";
const TOC: &str = "{{toc}}";
const BODY: &str = "{{body}}";

const DEFAULT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}}</title>
<style>
body { font-family: sans-serif; max-width: 60em; margin: 0 auto; padding: 1em; }
nav ul { list-style: none; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 0.25em 0.5em; text-align: left; }
</style>
</head>
<body>
{{toc}}
{{body}}
</body>
</html>
"#;

/// Errors that can occur when loading a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template with this name exists.
    #[error("template '{0}' not found")]
    NotFound(String),

    /// The template has no `{{body}}` placeholder.
    #[error("template '{0}' has no {{{{body}}}} placeholder")]
    Malformed(String),

    /// The template file could not be read.
    #[error("failed to read template: {0}")]
    Io(#[from] io::Error),
}

/// A source of named templates.
pub trait TemplateLoader {
    /// Returns the raw text of the named template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] if the template does not exist.
    fn load(&self, name: &str) -> Result<String, TemplateError>;
}

/// The templates compiled into the binary.
///
/// Only [`DEFAULT_TEMPLATE`] is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateLoader for BuiltinTemplates {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        if name == DEFAULT_TEMPLATE {
            Ok(DEFAULT_HTML.to_string())
        } else {
            Err(TemplateError::NotFound(name.to_string()))
        }
    }
}

/// Templates stored as `<name>.html` in a directory, falling back to the
/// built-in templates.
pub struct DirectoryTemplates<'a> {
    fs: &'a dyn FileSystem,
    directory: PathBuf,
}

impl<'a> DirectoryTemplates<'a> {
    /// Creates a loader reading from `directory`.
    pub fn new(fs: &'a dyn FileSystem, directory: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            directory: directory.into(),
        }
    }
}

impl TemplateLoader for DirectoryTemplates<'_> {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.directory.join(format!("{name}.html"));
        if self.fs.is_file(&path) {
            let bytes = self.fs.read(&path)?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        BuiltinTemplates.load(name)
    }
}

/// A template split around its `{{body}}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    head: String,
    tail: String,
}

impl Template {
    /// Loads and splits the named template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be loaded or has no `{{body}}`
    /// placeholder.
    pub fn load(loader: &dyn TemplateLoader, name: &str) -> Result<Self, TemplateError> {
        let text = loader.load(name)?;
        let (head, tail) = text
            .split_once(BODY)
            .ok_or_else(|| TemplateError::Malformed(name.to_string()))?;
        Ok(Self {
            head: head.to_string(),
            tail: tail.to_string(),
        })
    }

    /// The part of the page before the body, with the title and table of
    /// contents filled in.
    #[must_use]
    pub fn head(&self, title: &str, toc: &str) -> String {
        fill(&self.head, title, toc)
    }

    /// The part of the page after the body.
    #[must_use]
    pub fn tail(&self, title: &str, toc: &str) -> String {
        fill(&self.tail, title, toc)
    }
}

fn fill(text: &str, title: &str, toc: &str) -> String {
    text.replace(TITLE, title).replace(TOC, toc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFileSystem;

    #[test]
    fn builtin_default_has_a_body() {
        let template = Template::load(&BuiltinTemplates, DEFAULT_TEMPLATE).unwrap();
        let head = template.head("SYS", "<nav></nav>");
        assert!(head.contains("<title>SYS</title>"));
        assert!(head.contains("<nav></nav>"));
        assert!(template.tail("SYS", "").contains("</html>"));
    }

    #[test]
    fn unknown_builtin_is_not_found() {
        assert!(matches!(
            BuiltinTemplates.load("fancy"),
            Err(TemplateError::NotFound(name)) if name == "fancy"
        ));
    }

    #[test]
    fn directory_templates_shadow_builtins() {
        let fs = MemoryFileSystem::new()
            .with_file("/tpl/fancy.html", "<h1>{{title}}</h1>{{body}}<footer/>");
        let loader = DirectoryTemplates::new(&fs, "/tpl");

        let template = Template::load(&loader, "fancy").unwrap();
        assert_eq!(template.head("Doc", ""), "<h1>Doc</h1>");
        assert_eq!(template.tail("Doc", ""), "<footer/>");

        assert!(Template::load(&loader, DEFAULT_TEMPLATE).is_ok());
        assert!(matches!(
            Template::load(&loader, "missing"),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn template_without_body_is_malformed() {
        let fs = MemoryFileSystem::new().with_file("/tpl/bad.html", "<html>{{title}}</html>");
        let loader = DirectoryTemplates::new(&fs, "/tpl");
        assert!(matches!(
            Template::load(&loader, "bad"),
            Err(TemplateError::Malformed(name)) if name == "bad"
        ));
    }
}
