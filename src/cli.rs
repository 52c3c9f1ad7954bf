use std::path::{Path, PathBuf};

mod index;
mod publish;

use clap::ArgAction;
use index::{Index, Matrix};
use publish::Publish;
use reqpub::{
    load_tree,
    storage::{DirectoryTemplates, FileSystem},
    Format, OsFileSystem, PublishConfig, Tree,
};
use tracing::{instrument, warn};

/// Name of the optional configuration file at the root of the tree.
const CONFIG_FILE: &str = "publish.toml";

/// Name of the optional template directory at the root of the tree.
const TEMPLATE_DIR: &str = "templates";

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the requirements tree
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Publish a document, or the whole tree
    Publish(Publish),

    /// Write an HTML index page for a folder of published documents
    Index(Index),

    /// Write the traceability matrix as CSV
    Matrix(Matrix),

    /// Show the document hierarchy
    Tree,
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Publish(command) => command.run(root)?,
            Self::Index(command) => command.run(root)?,
            Self::Matrix(command) => command.run(root)?,
            Self::Tree => println!("{}", load(root)?.draw()),
        }
        Ok(())
    }
}

/// Loads the tree below `root`, warning about links that do not resolve.
#[instrument]
fn load(root: &Path) -> anyhow::Result<Tree> {
    let tree = load_tree(&OsFileSystem, root)?;
    for (item, uid) in tree.unknown_links() {
        warn!("{item} links to unknown item {uid}");
    }
    Ok(tree)
}

/// Rendering options shared by the commands that produce HTML.
///
/// Flags override the configuration file.
#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// Configuration file [default: <root>/publish.toml, if present]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Turn references to other items into hyperlinks
    #[arg(long, overrides_with = "no_linkify")]
    linkify: bool,

    /// Never turn references into hyperlinks
    #[arg(long)]
    no_linkify: bool,

    /// Leave out the table of contents
    #[arg(long)]
    no_toc: bool,

    /// The HTML template to use
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Directory holding `<name>.html` templates [default: <root>/templates]
    #[arg(long, value_name = "DIR")]
    template_dir: Option<PathBuf>,

    /// Leave out level numbers in headings
    #[arg(long)]
    no_levels: bool,

    /// Leave out child links
    #[arg(long)]
    no_child_links: bool,
}

impl RenderArgs {
    /// Resolves the configuration: file first, then flags.
    ///
    /// `linkify` applies when neither the file nor a flag enables it.
    fn config(&self, root: &Path, linkify: bool) -> anyhow::Result<PublishConfig> {
        let path = self.config.clone().unwrap_or_else(|| root.join(CONFIG_FILE));
        let mut config = if self.config.is_some() || OsFileSystem.is_file(&path) {
            PublishConfig::load(&path).map_err(anyhow::Error::msg)?
        } else {
            PublishConfig::default()
        };

        config.linkify = if self.linkify {
            true
        } else if self.no_linkify {
            false
        } else {
            config.linkify || linkify
        };
        if self.no_toc {
            config.toc = false;
        }
        if let Some(template) = &self.template {
            config.template = Some(template.clone());
        }
        if self.no_levels {
            config.heading_levels = false;
        }
        if self.no_child_links {
            config.child_links = false;
        }
        Ok(config)
    }

    fn templates<'a>(&self, fs: &'a dyn FileSystem, root: &Path) -> DirectoryTemplates<'a> {
        let directory = self
            .template_dir
            .clone()
            .unwrap_or_else(|| root.join(TEMPLATE_DIR));
        DirectoryTemplates::new(fs, directory)
    }
}
