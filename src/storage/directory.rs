//! A filesystem backed store of documents.
//!
//! Every directory below the root that contains a `document.toml` is a
//! document. Its items are the `*.yml` files directly inside it, and an
//! `assets` subdirectory, when present, is published alongside it.

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
    domain::{Document, Item, Tree},
    storage::{DocumentSettings, FileSystem, LoadError},
};

/// Name of the settings file that marks a document directory.
pub const SETTINGS_FILE: &str = "document.toml";

/// Name of a document's asset directory.
pub const ASSETS_DIR: &str = "assets";

/// Extension of item files.
pub const ITEM_EXTENSION: &str = "yml";

/// Loads every document below `root` and assembles them into a tree.
///
/// # Errors
///
/// Returns an error if any document fails to load, or if the documents do not
/// form a valid tree.
#[instrument(skip(fs))]
pub fn load_tree(fs: &dyn FileSystem, root: &Path) -> Result<Tree, LoadError> {
    let documents = fs
        .walk(root)?
        .into_iter()
        .filter(|path| path.file_name() == Some(OsStr::new(SETTINGS_FILE)))
        .filter_map(|settings| settings.parent().map(Path::to_path_buf))
        .map(|directory| load_document(fs, &directory))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(documents = documents.len(), "loaded documents");
    Ok(Tree::new(documents)?)
}

/// Loads a single document directory.
///
/// Items are sorted by level, then by UID.
///
/// # Errors
///
/// Returns an error if the settings or any item cannot be read.
#[instrument(skip(fs))]
pub fn load_document(fs: &dyn FileSystem, directory: &Path) -> Result<Document, LoadError> {
    let settings_path = directory.join(SETTINGS_FILE);
    let settings = fs.read(&settings_path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(settings_path.clone()),
        _ => LoadError::Io(error),
    })?;
    let settings = DocumentSettings::parse(&String::from_utf8_lossy(&settings))?;

    let assets = directory.join(ASSETS_DIR);
    let assets = fs.is_dir(&assets).then_some(assets);
    let mut document = settings.into_document(assets)?;

    for path in fs.read_dir(directory)? {
        if is_item_file(fs, &path) {
            document.add_item(Item::load(fs, &path)?)?;
        }
    }
    document.sort();
    debug!(prefix = document.prefix(), items = document.len(), "loaded document");
    Ok(document)
}

/// Writes a document's settings and items into `directory`.
///
/// Returns the paths written.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be
/// written.
pub fn save_document(
    fs: &dyn FileSystem,
    document: &Document,
    directory: &Path,
) -> io::Result<Vec<PathBuf>> {
    fs.create_dir_all(directory)?;
    let settings = directory.join(SETTINGS_FILE);
    fs.write(&settings, DocumentSettings::from(document).to_toml().as_bytes())?;
    let mut written = vec![settings];
    for item in document.items() {
        written.push(item.save(fs, directory)?);
    }
    Ok(written)
}

fn is_item_file(fs: &dyn FileSystem, path: &Path) -> bool {
    path.extension() == Some(OsStr::new(ITEM_EXTENSION)) && fs.is_file(path)
}
