//! Publishing documents and trees to files.
//!
//! The [`Publisher`] ties the line-generation engine to a [`FileSystem`]:
//! it resolves the output format, prepares the destination and its assets
//! folder, renders the complete output and writes it in a single call.

use std::{
    ffi::OsStr,
    io,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, info, instrument};

use crate::{
    domain::{PublishConfig, Tree},
    storage::{FileSystem, Template, TemplateError, TemplateLoader},
};

mod format;
mod html;
mod lines;
mod markdown;
mod matrix;

pub use format::Format;
pub use lines::{publish_lines, Lines, Target};
pub use matrix::MATRIX_FILE;

/// Default name of the index page.
pub const INDEX_FILE: &str = "index.html";

/// Name of the assets folder published beside documents.
pub const ASSETS_DIR: &str = "assets";

/// Errors that can occur while publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Neither the explicit format nor the path's extension names a known
    /// format.
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    /// The configured template could not be used.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The traceability matrix could not be written as CSV.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Publishes documents through a filesystem.
pub struct Publisher<'a> {
    fs: &'a dyn FileSystem,
    templates: &'a dyn TemplateLoader,
    config: PublishConfig,
}

impl<'a> Publisher<'a> {
    /// Creates a publisher writing through `fs` and loading HTML templates
    /// from `templates`.
    pub fn new(
        fs: &'a dyn FileSystem,
        templates: &'a dyn TemplateLoader,
        config: PublishConfig,
    ) -> Self {
        Self {
            fs,
            templates,
            config,
        }
    }

    /// The rendering configuration.
    #[must_use]
    pub const fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Renders `target` as lines, using this publisher's templates.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Template`] if the configured HTML template
    /// cannot be loaded, or [`PublishError::Csv`] if the matrix cannot be
    /// encoded.
    pub fn lines<'t>(
        &'t self,
        tree: &'t Tree,
        target: Target<'t>,
        format: Format,
    ) -> Result<Lines<'t>, PublishError> {
        lines::render_lines(self.templates, tree, target, format, &self.config)
    }

    /// Publishes `target` to `path` and returns the path written.
    ///
    /// The format is `format` if given, and otherwise taken from the
    /// extension of `path`. A [`Target::Tree`] is published into the
    /// directory `path`: one `<prefix>.<ext>` file per document, followed by
    /// an index page (HTML only) and the traceability matrix.
    ///
    /// If the target has assets, the `assets` folder beside the output is
    /// emptied and refilled with fresh copies.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unsupported, the template cannot be
    /// loaded, or a filesystem operation fails. Configuration errors are
    /// raised before anything is written.
    #[instrument(skip(self, tree, target))]
    pub fn publish(
        &self,
        tree: &Tree,
        target: Target<'_>,
        path: &Path,
        format: Option<Format>,
    ) -> Result<PathBuf, PublishError> {
        let format = match format {
            Some(format) => format,
            None => Format::from_path(path)
                .ok_or_else(|| PublishError::UnsupportedFormat(path.display().to_string()))?,
        };

        if matches!(target, Target::Tree) {
            return self.publish_tree(tree, path, format);
        }

        let assets: Vec<&Path> = match &target {
            Target::Document(document) => document.assets().into_iter().collect(),
            Target::Items(_) | Target::Tree => Vec::new(),
        };
        let text = self.lines(tree, target, format)?.into_text();

        let directory = parent_directory(path);
        self.fs.create_dir_all(directory)?;
        self.copy_assets(&assets, &directory.join(ASSETS_DIR))?;
        self.fs.write(path, text.as_bytes())?;
        info!("published {}", path.display());
        Ok(path.to_path_buf())
    }

    fn publish_tree(
        &self,
        tree: &Tree,
        directory: &Path,
        format: Format,
    ) -> Result<PathBuf, PublishError> {
        // Render everything first so a bad template leaves the directory untouched.
        let outputs = tree
            .documents()
            .iter()
            .map(|document| {
                let text = self
                    .lines(tree, Target::Document(document), format)?
                    .into_text();
                Ok((directory.join(document.file_name(format.extension())), text))
            })
            .collect::<Result<Vec<_>, PublishError>>()?;

        self.fs.create_dir_all(directory)?;
        let assets: Vec<&Path> = tree.documents().iter().filter_map(|d| d.assets()).collect();
        self.copy_assets(&assets, &directory.join(ASSETS_DIR))?;

        for (path, text) in outputs {
            self.fs.write(&path, text.as_bytes())?;
            info!("published {}", path.display());
        }

        if format == Format::Html {
            self.create_index(directory, None, Some(tree))?;
        }
        self.create_matrix(directory, tree)?;
        Ok(directory.to_path_buf())
    }

    /// Empties `destination` and copies every source folder into it.
    ///
    /// Nothing happens when there are no sources, or when `destination` is
    /// itself one of the sources.
    fn copy_assets(&self, sources: &[&Path], destination: &Path) -> io::Result<()> {
        if sources.is_empty() {
            return Ok(());
        }
        let target = normalize(destination)?;
        for source in sources {
            if normalize(source)? == target {
                debug!("assets already in place at {}", destination.display());
                return Ok(());
            }
        }
        if self.fs.is_dir(destination) {
            for entry in self.fs.read_dir(destination)? {
                debug!("removing stale asset {}", entry.display());
                self.fs.remove(&entry)?;
            }
        }
        for source in sources {
            debug!("copying assets from {}", source.display());
            self.fs.copy_dir(source, destination)?;
        }
        Ok(())
    }

    /// Writes an HTML index page listing the `.html` files in `folder`.
    ///
    /// With a tree, the page also shows the document hierarchy and the
    /// traceability table. Returns `None`, writing nothing, if the folder
    /// holds no HTML files other than the index itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be read, the template cannot be
    /// loaded, or the index cannot be written.
    #[instrument(skip(self, tree))]
    pub fn create_index(
        &self,
        folder: &Path,
        index: Option<&str>,
        tree: Option<&Tree>,
    ) -> Result<Option<PathBuf>, PublishError> {
        let index = index.unwrap_or(INDEX_FILE);
        let files: Vec<String> = self
            .fs
            .read_dir(folder)?
            .into_iter()
            .filter(|path| {
                path.extension() == Some(OsStr::new(Format::Html.extension()))
                    && path.file_name() != Some(OsStr::new(index))
                    && self.fs.is_file(path)
            })
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();

        if files.is_empty() {
            debug!("no documents to index in {}", folder.display());
            return Ok(None);
        }

        let template = Template::load(self.templates, self.config.template_name())?;
        let body = html::index_body(&files, tree).join("\n");
        let page = format!(
            "{}{body}{}",
            template.head("Index", ""),
            template.tail("Index", "")
        );

        let path = folder.join(index);
        self.fs.write(&path, page.as_bytes())?;
        info!("published {}", path.display());
        Ok(Some(path))
    }

    /// Writes the tree's traceability matrix to `traceability.csv` in
    /// `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be created or the file cannot
    /// be written.
    #[instrument(skip(self, tree))]
    pub fn create_matrix(&self, folder: &Path, tree: &Tree) -> Result<PathBuf, PublishError> {
        self.fs.create_dir_all(folder)?;
        let path = folder.join(MATRIX_FILE);
        self.fs.write(&path, matrix::matrix(tree)?.as_bytes())?;
        info!("published {}", path.display());
        Ok(path)
    }
}

/// An absolute form of `path` with `.` and `..` components resolved
/// lexically.
fn normalize(path: &Path) -> io::Result<PathBuf> {
    let mut normal = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    Ok(normal)
}

fn parent_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Document, Item},
        storage::{BuiltinTemplates, DirectoryTemplates, MemoryFileSystem},
    };

    fn item(uid: &str, level: &str, links: &[&str]) -> Item {
        let mut item = Item::new(uid.parse().unwrap()).unwrap();
        item.set_level(level.parse().unwrap());
        item.set_text(format!("Text of {uid}."));
        item.set_links(links.iter().map(|link| link.parse().unwrap()));
        item
    }

    fn tree() -> Tree {
        let mut sys = Document::new("SYS").unwrap().with_assets("/reqs/sys/assets");
        sys.add_item(item("SYS001", "1", &[])).unwrap();
        sys.add_item(item("SYS002", "2", &[])).unwrap();
        let mut hlr = Document::new("HLR").unwrap().with_parent("SYS").unwrap();
        hlr.add_item(item("HLR001", "1", &["SYS001"])).unwrap();
        Tree::new([sys, hlr]).unwrap()
    }

    fn filesystem() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file("/reqs/sys/assets/css/style.css", "body {}")
            .with_file("/reqs/sys/assets/logo.png", [1u8, 2, 3])
    }

    #[test]
    fn publish_document_returns_the_path() {
        let fs = filesystem();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let sys = tree.document("SYS").unwrap();
        let path = Path::new("/out/published.html");

        let written = publisher
            .publish(&tree, Target::Document(sys), path, None)
            .unwrap();

        assert_eq!(written, path);
        assert!(fs.is_dir(Path::new("/out")));
        let html = fs.contents(path).unwrap();
        assert!(html.contains("<title>SYS</title>"));
        assert!(html.contains("<h1 id=\"SYS001\">1 SYS001</h1>"));
        assert_eq!(
            fs.writes().iter().filter(|p| p.as_path() == path).count(),
            1
        );
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let fs = filesystem();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let sys = tree.document("SYS").unwrap();
        let path = Path::new("/out/published.custom");

        publisher
            .publish(&tree, Target::Document(sys), path, Some(Format::Html))
            .unwrap();
        assert!(fs.contents(path).unwrap().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn unknown_format_is_rejected_before_writing() {
        let fs = filesystem();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let sys = tree.document("SYS").unwrap();

        let err = publisher
            .publish(&tree, Target::Document(sys), Path::new("/out/published.custom"), None)
            .unwrap_err();
        assert!(matches!(err, PublishError::UnsupportedFormat(_)));
        assert!(fs.writes().is_empty());
        assert!(!fs.is_dir(Path::new("/out")));
    }

    #[test]
    fn missing_template_is_rejected_before_writing() {
        let fs = filesystem();
        let config = PublishConfig {
            template: Some("missing".to_string()),
            ..PublishConfig::default()
        };
        let publisher = Publisher::new(&fs, &BuiltinTemplates, config);
        let tree = tree();

        let err = publisher
            .publish(&tree, Target::Tree, Path::new("/out"), Some(Format::Html))
            .unwrap_err();
        assert!(matches!(err, PublishError::Template(TemplateError::NotFound(_))));
        assert!(fs.writes().is_empty());
    }

    #[test]
    fn republish_leaves_only_fresh_assets() {
        let fs = filesystem()
            .with_file("/out/assets/stale.js", "old")
            .with_file("/out/assets/old/nested.txt", "old");
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let sys = tree.document("SYS").unwrap();
        let path = Path::new("/out/SYS.html");

        publisher.publish(&tree, Target::Document(sys), path, None).unwrap();
        publisher.publish(&tree, Target::Document(sys), path, None).unwrap();

        let assets: Vec<PathBuf> = fs
            .files()
            .into_iter()
            .filter(|file| file.starts_with("/out/assets"))
            .collect();
        assert_eq!(
            assets,
            [
                PathBuf::from("/out/assets/css/style.css"),
                PathBuf::from("/out/assets/logo.png"),
            ]
        );
        assert!(fs.is_dir(Path::new("/out/assets")));
    }

    #[test]
    fn publishing_beside_the_source_assets_keeps_them() {
        let fs = filesystem();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let sys = tree.document("SYS").unwrap();

        publisher
            .publish(&tree, Target::Document(sys), Path::new("/reqs/sys/SYS.html"), None)
            .unwrap();
        publisher
            .publish(&tree, Target::Document(sys), Path::new("/reqs/x/../sys/SYS.md"), None)
            .unwrap();

        let files = fs.files();
        for expected in [
            "/reqs/sys/SYS.html",
            "/reqs/sys/assets/css/style.css",
            "/reqs/sys/assets/logo.png",
        ] {
            assert!(files.contains(&PathBuf::from(expected)), "{expected}");
        }
        assert_eq!(fs.contents("/reqs/sys/assets/css/style.css").unwrap(), "body {}");
    }

    #[test]
    fn items_target_copies_no_assets() {
        let fs = filesystem();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();
        let item = tree.find_item(&"HLR001".parse().unwrap()).unwrap();

        publisher
            .publish(&tree, Target::Items(vec![item]), Path::new("/out/hlr.md"), None)
            .unwrap();
        assert!(!fs.is_dir(Path::new("/out/assets")));
        assert!(fs
            .contents("/out/hlr.md")
            .unwrap()
            .contains("*Parent links: SYS001*"));
    }

    #[test]
    fn publish_tree_writes_documents_index_and_matrix() {
        let fs = filesystem();
        let config = PublishConfig {
            linkify: true,
            ..PublishConfig::default()
        };
        let publisher = Publisher::new(&fs, &BuiltinTemplates, config);
        let tree = tree();

        let written = publisher
            .publish(&tree, Target::Tree, Path::new("/out"), Some(Format::Html))
            .unwrap();

        assert_eq!(written, Path::new("/out"));
        let files = fs.files();
        for expected in [
            "/out/SYS.html",
            "/out/HLR.html",
            "/out/index.html",
            "/out/traceability.csv",
            "/out/assets/logo.png",
        ] {
            assert!(files.contains(&PathBuf::from(expected)), "{expected}");
        }
        assert!(fs
            .contents("/out/HLR.html")
            .unwrap()
            .contains("<a href=\"SYS.html#SYS001\">SYS001</a>"));
        let index = fs.contents("/out/index.html").unwrap();
        assert!(index.contains("SYS.html"));
        assert!(index.contains("HLR.html"));
    }

    #[test]
    fn index_is_not_written_for_empty_folder() {
        let fs = MemoryFileSystem::new().with_dir("/out");
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());

        assert_eq!(publisher.create_index(Path::new("/out"), None, None).unwrap(), None);
        assert!(!fs.is_file(Path::new("/out/index.html")));
    }

    #[test]
    fn index_lists_every_html_file() {
        let fs = MemoryFileSystem::new()
            .with_file("/out/SYS.html", "")
            .with_file("/out/HLR.html", "")
            .with_file("/out/notes.txt", "")
            .with_file("/out/index.html", "old index");
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());

        let path = publisher
            .create_index(Path::new("/out"), None, None)
            .unwrap()
            .unwrap();
        let index = fs.contents(&path).unwrap();
        assert!(index.contains("<a href=\"SYS.html\">SYS.html</a>"));
        assert!(index.contains("<a href=\"HLR.html\">HLR.html</a>"));
        assert!(!index.contains("notes.txt"));
        assert!(!index.contains("old index"));
    }

    #[test]
    fn index_with_tree_uses_custom_name_and_template() {
        let fs = MemoryFileSystem::new()
            .with_file("/out/SYS.html", "")
            .with_file("/tpl/site.html", "<main>{{body}}</main>");
        let templates = DirectoryTemplates::new(&fs, "/tpl");
        let config = PublishConfig {
            template: Some("site".to_string()),
            ..PublishConfig::default()
        };
        let publisher = Publisher::new(&fs, &templates, config);
        let tree = tree();

        let path = publisher
            .create_index(Path::new("/out"), Some("index2.html"), Some(&tree))
            .unwrap()
            .unwrap();
        assert_eq!(path, Path::new("/out/index2.html"));
        let index = fs.contents(&path).unwrap();
        assert!(index.starts_with("<main>"));
        assert!(index.contains("<pre>SYS\n└── HLR</pre>"));
        assert!(index.contains("<h2>Traceability</h2>"));
    }

    #[test]
    fn matrix_rows_and_columns() {
        let fs = MemoryFileSystem::new();
        let publisher = Publisher::new(&fs, &BuiltinTemplates, PublishConfig::default());
        let tree = tree();

        let path = publisher.create_matrix(Path::new("/out"), &tree).unwrap();
        assert_eq!(path, Path::new("/out/traceability.csv"));
        let csv = fs.contents(&path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), tree.traceability().len() + 1);
        assert_eq!(lines, ["SYS,HLR", "SYS001,HLR001", "SYS002,"]);
    }
}
