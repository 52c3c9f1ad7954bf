use std::path::Path;

use serde::{Deserialize, Serialize};

/// Settings that control how documents are rendered.
///
/// A configuration value is passed to every rendering call; nothing is read
/// from global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct PublishConfig {
    /// Turn references to other items into hyperlinks.
    pub linkify: bool,

    /// Include a table of contents when publishing a whole document.
    pub toc: bool,

    /// Name of the template used to wrap HTML documents.
    ///
    /// When unset the built-in template is used.
    pub template: Option<String>,

    /// Show the level number (`1.2.3`) in front of each heading.
    pub heading_levels: bool,

    /// Show a "Child links" line listing the items that link to each item.
    ///
    /// When enabled, the upward links line is labelled "Parent links"
    /// instead of "Links".
    pub child_links: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            linkify: false,
            toc: true,
            template: None,
            heading_levels: true,
            child_links: true,
        }
    }
}

impl PublishConfig {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The name of the HTML template to use.
    #[must_use]
    pub fn template_name(&self) -> &str {
        self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE)
    }
}

/// Name of the built-in HTML template.
pub const DEFAULT_TEMPLATE: &str = "default";

const fn enabled() -> bool {
    true
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        linkify: bool,

        #[serde(default = "enabled")]
        toc: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,

        #[serde(default = "enabled")]
        heading_levels: bool,

        #[serde(default = "enabled")]
        child_links: bool,
    },
}

impl From<Versions> for PublishConfig {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                linkify,
                toc,
                template,
                heading_levels,
                child_links,
            } => Self {
                linkify,
                toc,
                template,
                heading_levels,
                child_links,
            },
        }
    }
}

impl From<PublishConfig> for Versions {
    fn from(config: PublishConfig) -> Self {
        Self::V1 {
            linkify: config.linkify,
            toc: config.toc,
            template: config.template,
            heading_levels: config.heading_levels,
            child_links: config.child_links,
        }
    }
}
