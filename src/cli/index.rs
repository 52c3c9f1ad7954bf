use std::path::{Path, PathBuf};

use clap::Parser;
use reqpub::{
    publish::INDEX_FILE, storage::BuiltinTemplates, OsFileSystem, PublishConfig, Publisher,
};
use tracing::instrument;

use super::{load, RenderArgs};

/// Write an HTML index page for a folder of published documents.
#[derive(Debug, Parser)]
pub struct Index {
    /// The folder holding published HTML documents
    folder: PathBuf,

    /// File name of the index page
    #[arg(long, default_value = INDEX_FILE)]
    name: String,

    /// Leave out the document hierarchy and traceability table
    #[arg(long)]
    no_tree: bool,

    #[command(flatten)]
    render: RenderArgs,
}

impl Index {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let tree = if self.no_tree { None } else { Some(load(root)?) };
        let config = self.render.config(root, false)?;
        let templates = self.render.templates(&OsFileSystem, root);
        let publisher = Publisher::new(&OsFileSystem, &templates, config);

        match publisher.create_index(&self.folder, Some(&self.name), tree.as_ref())? {
            Some(path) => println!("published: {}", path.display()),
            None => println!("no documents to index in {}", self.folder.display()),
        }
        Ok(())
    }
}

/// Write the traceability matrix as `traceability.csv`.
#[derive(Debug, Parser)]
pub struct Matrix {
    /// The folder to write the matrix into
    folder: PathBuf,
}

impl Matrix {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let tree = load(root)?;
        let publisher = Publisher::new(&OsFileSystem, &BuiltinTemplates, PublishConfig::default());
        let path = publisher.create_matrix(&self.folder, &tree)?;
        println!("published: {}", path.display());
        Ok(())
    }
}
