//! On-disk record formats.
//!
//! Items are stored one per file as YAML mappings named `<UID>.yml`. Each
//! document directory carries a versioned `document.toml` describing the
//! document's prefix, parent and numbering.

use std::{collections::BTreeMap, io, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::domain::{
    item::Content, Document, DocumentError, Item, Level, LevelError, TreeError, Uid, UidError,
};

/// Errors that can occur when loading items, documents or trees.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file name is not a valid item file name.
    #[error("not an item file: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The file was not found.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The item record could not be parsed.
    #[error("invalid item record: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document settings could not be parsed.
    #[error("invalid document settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// A UID in the record is not valid.
    #[error(transparent)]
    Uid(#[from] UidError),

    /// The level in the record is not valid.
    #[error(transparent)]
    Level(#[from] LevelError),

    /// The document could not be assembled.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The documents do not form a valid tree.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

const fn enabled() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_enabled(value: &bool) -> bool {
    *value
}

fn default_level() -> String {
    Level::default().to_string()
}

/// Reads a level written either as a string (`'1.2'`) or as a bare YAML
/// number (`1.2`).
fn level_from_yaml<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(level) => Ok(level),
        Value::Number(level) => Ok(level.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a level, found {other:?}"
        ))),
    }
}

/// The stored form of a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default = "enabled", skip_serializing_if = "is_enabled")]
    active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<String>,

    #[serde(default = "default_level", deserialize_with = "level_from_yaml")]
    level: String,

    #[serde(default)]
    links: Vec<String>,

    #[serde(default = "enabled", skip_serializing_if = "is_enabled")]
    normative: bool,

    #[serde(default)]
    text: String,

    #[serde(flatten)]
    attributes: BTreeMap<String, Value>,
}

impl Default for ItemRecord {
    fn default() -> Self {
        Self {
            active: true,
            header: None,
            level: default_level(),
            links: Vec::new(),
            normative: true,
            text: String::new(),
            attributes: BTreeMap::new(),
        }
    }
}

impl ItemRecord {
    /// Parses a record from YAML. An empty file is an empty item.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Yaml`] if the YAML is malformed.
    pub fn parse(yaml: &str) -> Result<Self, LoadError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes the record to YAML.
    #[must_use]
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).expect("this must never fail")
    }

    /// Builds the item identified by `uid` from this record.
    ///
    /// # Errors
    ///
    /// Returns an error if a link or the level is malformed, or if `uid` has
    /// no number.
    pub fn into_item(self, uid: Uid) -> Result<Item, LoadError> {
        let links = self
            .links
            .iter()
            .map(|link| link.parse::<Uid>())
            .collect::<Result<_, _>>()?;
        let content = Content {
            text: self.text,
            header: self.header.filter(|header| !header.trim().is_empty()),
            level: self.level.parse()?,
            normative: self.normative,
            active: self.active,
            links,
            attributes: self.attributes,
        };
        Ok(Item::with_content(uid, content)?)
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            active: item.is_active(),
            header: item.header().map(str::to_string),
            level: item.level().to_string(),
            links: item.links().map(ToString::to_string).collect(),
            normative: item.is_normative(),
            text: item.text().to_string(),
            attributes: item
                .attributes()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }
}

/// The settings stored in a document directory's `document.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SettingsVersion", into = "SettingsVersion")]
pub struct DocumentSettings {
    prefix: String,
    parent: Option<String>,
    sep: String,
    digits: usize,
    publish: Vec<String>,
}

impl DocumentSettings {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Settings`] if the TOML is malformed.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(text)?)
    }

    /// Serializes the settings to TOML.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string(self).expect("this must never fail")
    }

    /// Builds an empty document from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Document`] if the prefix or parent is invalid.
    pub fn into_document(self, assets: Option<PathBuf>) -> Result<Document, LoadError> {
        let mut document = Document::new(self.prefix)?
            .with_numbering(self.sep, self.digits)
            .with_publish_attributes(self.publish);
        if let Some(parent) = self.parent {
            document = document.with_parent(parent)?;
        }
        if let Some(assets) = assets {
            document = document.with_assets(assets);
        }
        Ok(document)
    }
}

impl From<&Document> for DocumentSettings {
    fn from(document: &Document) -> Self {
        Self {
            prefix: document.prefix().to_string(),
            parent: document.parent().map(str::to_string),
            sep: document.sep().to_string(),
            digits: document.digits(),
            publish: document.publish_attributes().to_vec(),
        }
    }
}

const fn default_digits() -> usize {
    3
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum SettingsVersion {
    #[serde(rename = "1")]
    V1 {
        prefix: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,

        #[serde(default)]
        sep: String,

        #[serde(default = "default_digits")]
        digits: usize,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        publish: Vec<String>,
    },
}

impl From<SettingsVersion> for DocumentSettings {
    fn from(version: SettingsVersion) -> Self {
        match version {
            SettingsVersion::V1 {
                prefix,
                parent,
                sep,
                digits,
                publish,
            } => Self {
                prefix,
                parent,
                sep,
                digits,
                publish,
            },
        }
    }
}

impl From<DocumentSettings> for SettingsVersion {
    fn from(settings: DocumentSettings) -> Self {
        let DocumentSettings {
            prefix,
            parent,
            sep,
            digits,
            publish,
        } = settings;
        Self::V1 {
            prefix,
            parent,
            sep,
            digits,
            publish,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn uid(value: &str) -> Uid {
        value.parse().unwrap()
    }

    #[test]
    fn empty_file_is_an_empty_item() {
        let item = ItemRecord::parse("").unwrap().into_item(uid("REQ001")).unwrap();
        assert_eq!(item.text(), "");
        assert!(!item.has_links());
        assert!(item.is_normative());
        assert!(item.is_active());
        assert_eq!(item.level().to_string(), "1");
    }

    #[test]
    fn full_record_is_read() {
        let yaml = "\
active: false
header: Power
level: 1.2
links:
- SYS001
- SYS002
normative: false
text: |
  Supply

  details
status: draft
";
        let item = ItemRecord::parse(yaml).unwrap().into_item(uid("HLR004")).unwrap();
        assert!(!item.is_active());
        assert!(item.is_heading());
        assert_eq!(item.header(), Some("Power"));
        assert_eq!(item.level().to_string(), "1.2");
        assert_eq!(
            item.links().map(Uid::as_str).collect::<Vec<_>>(),
            ["SYS001", "SYS002"]
        );
        assert_eq!(item.text(), "Supply\n\ndetails\n");
        assert_eq!(item.attribute("status"), Some(&Value::from("draft")));
    }

    #[test_case("level: '1.10'", "1.10"; "quoted")]
    #[test_case("level: 2", "2"; "integer")]
    #[test_case("level: 1.2.0", "1.2"; "trailing zero")]
    fn level_forms(yaml: &str, expected: &str) {
        let item = ItemRecord::parse(yaml).unwrap().into_item(uid("REQ001")).unwrap();
        assert_eq!(item.level().to_string(), expected);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            ItemRecord::parse("links: [unclosed"),
            Err(LoadError::Yaml(_))
        ));
    }

    #[test]
    fn blank_link_is_an_error() {
        let record = ItemRecord::parse("links: ['  ']").unwrap();
        assert!(matches!(
            record.into_item(uid("REQ001")),
            Err(LoadError::Uid(UidError::Empty))
        ));
    }

    #[test]
    fn saved_item_reads_back() {
        let mut item = Item::new(uid("REQ001")).unwrap();
        item.set_text("The system shall boot.");
        item.set_level("1.10".parse().unwrap());
        item.add_link(uid("SYS002"));
        item.set_attribute("status", Value::from("draft")).unwrap();

        let yaml = ItemRecord::from(&item).to_yaml();
        assert!(!yaml.contains("active"));
        let reloaded = ItemRecord::parse(&yaml)
            .unwrap()
            .into_item(uid("REQ001"))
            .unwrap();
        assert_eq!(reloaded, item);
    }

    #[test]
    fn settings_defaults() {
        let settings = DocumentSettings::parse("_version = \"1\"\nprefix = \"REQ\"\n").unwrap();
        let document = settings.into_document(None).unwrap();
        assert_eq!(document.prefix(), "REQ");
        assert_eq!(document.parent(), None);
        assert_eq!(document.sep(), "");
        assert_eq!(document.digits(), 3);
    }

    #[test]
    fn settings_with_parent_and_publish_list() {
        let toml = "_version = \"1\"\nprefix = \"HLR\"\nparent = \"SYS\"\nsep = \"-\"\ndigits = 4\npublish = [\"status\"]\n";
        let document = DocumentSettings::parse(toml)
            .unwrap()
            .into_document(Some(PathBuf::from("/reqs/hlr/assets")))
            .unwrap();
        assert_eq!(document.parent(), Some("SYS"));
        assert_eq!(document.sep(), "-");
        assert_eq!(document.digits(), 4);
        assert_eq!(document.publish_attributes(), ["status"]);
        assert_eq!(
            document.assets(),
            Some(std::path::Path::new("/reqs/hlr/assets"))
        );

        let written = DocumentSettings::from(&document).to_toml();
        assert_eq!(DocumentSettings::parse(&written).unwrap(), DocumentSettings::from(&document));
    }

    #[test]
    fn settings_with_invalid_prefix_are_rejected() {
        let settings = DocumentSettings::parse("_version = \"1\"\nprefix = \"1X\"\n").unwrap();
        assert!(matches!(
            settings.into_document(None),
            Err(LoadError::Document(DocumentError::InvalidPrefix(_)))
        ));
    }
}
