use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use reqpub::{Format, OsFileSystem, Publisher, Target, Tree};
use tracing::instrument;

use super::{load, parse_format, RenderArgs};

/// Publish a document, or the whole tree with `all`.
///
/// Without a path the rendered lines are printed.
#[derive(Debug, Parser)]
pub struct Publish {
    /// The prefix of the document to publish, or `all` for every document
    target: String,

    /// Output file, or output directory when publishing `all`
    path: Option<PathBuf>,

    /// Output format (html, md, txt, csv) [default: from the path's extension]
    #[arg(short, long, value_parser = parse_format)]
    format: Option<Format>,

    #[command(flatten)]
    pub(super) render: RenderArgs,
}

impl Publish {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let tree = load(root)?;
        let all = self.target.eq_ignore_ascii_case("all");
        let config = self.render.config(root, all)?;
        let templates = self.render.templates(&OsFileSystem, root);
        let publisher = Publisher::new(&OsFileSystem, &templates, config);

        let target = if all {
            Target::Tree
        } else {
            Target::Document(find_document(&tree, &self.target)?)
        };

        match &self.path {
            Some(path) => {
                let written = publisher
                    .publish(&tree, target, path, self.format)
                    .with_context(|| format!("failed to publish to {}", path.display()))?;
                println!("published: {}", written.display());
            }
            None => {
                let format = self.format.unwrap_or(Format::Text);
                for line in publisher.lines(&tree, target, format)? {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}

fn find_document<'t>(tree: &'t Tree, prefix: &str) -> anyhow::Result<&'t reqpub::Document> {
    tree.document(prefix)
        .or_else(|| {
            tree.documents()
                .iter()
                .find(|document| document.prefix().eq_ignore_ascii_case(prefix))
        })
        .ok_or_else(|| anyhow::anyhow!("no document with prefix '{prefix}'"))
}
