use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    io,
    path::{Path, PathBuf},
};

use serde_yaml::Value;

use crate::{
    domain::{Level, Uid, UidError},
    storage::{FileSystem, ItemRecord, LoadError},
};

/// Names that identify an item and can never be reassigned.
const IDENTITY_ATTRIBUTES: [&str; 3] = ["uid", "prefix", "number"];

/// Names of the built-in attributes, which have dedicated setters.
const BUILTIN_ATTRIBUTES: [&str; 6] = ["text", "header", "level", "links", "normative", "active"];

/// A single requirement record.
///
/// An item is identified by its [`Uid`], which is split once on construction
/// into a document prefix and a number. The identity is fixed for the life of
/// the item; everything else (text, header, level, links and custom
/// attributes) can be changed and persisted back to storage.
///
/// Links point *upwards*, from an item to the items it depends on. They are
/// kept as a set, so adding a link twice or removing a missing link has no
/// effect, and they are always read back in lexicographic order.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    uid: Uid,
    prefix: String,
    number: usize,
    pub(crate) content: Content,
}

/// The mutable content of an item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Content {
    /// Markdown body of the item.
    pub(crate) text: String,
    /// Short title used when generating headings.
    pub(crate) header: Option<String>,
    /// Position within the document outline.
    pub(crate) level: Level,
    /// `false` for heading-only items.
    pub(crate) normative: bool,
    /// Inactive items are not published.
    pub(crate) active: bool,
    /// UIDs of the items this item links to.
    pub(crate) links: BTreeSet<Uid>,
    /// Custom attributes, keyed by name.
    pub(crate) attributes: BTreeMap<String, Value>,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            text: String::new(),
            header: None,
            level: Level::default(),
            normative: true,
            active: true,
            links: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }
}

impl Item {
    /// Creates an empty item with the given UID.
    ///
    /// # Errors
    ///
    /// Returns [`UidError::Syntax`] if the UID does not split into a prefix
    /// and a number.
    pub fn new(uid: Uid) -> Result<Self, UidError> {
        Self::with_content(uid, Content::default())
    }

    pub(crate) fn with_content(uid: Uid, content: Content) -> Result<Self, UidError> {
        let parts = uid
            .parts()
            .ok_or_else(|| UidError::Syntax(uid.to_string()))?;
        let prefix = parts.prefix.to_string();
        let number = parts.number;
        Ok(Self {
            uid,
            prefix,
            number,
            content,
        })
    }

    /// The unique identifier of the item.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        &self.uid
    }

    /// The document prefix of the item.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The item number within its document.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// The Markdown body of the item.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.content.text
    }

    /// Replaces the body of the item.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content.text = text.into();
    }

    /// The short title of the item, if any.
    #[must_use]
    pub fn header(&self) -> Option<&str> {
        self.content.header.as_deref()
    }

    /// Sets or clears the short title of the item.
    pub fn set_header(&mut self, header: Option<String>) {
        self.content.header = header.filter(|h| !h.trim().is_empty());
    }

    /// The position of the item in the document outline.
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.content.level
    }

    /// Moves the item to another position in the document outline.
    pub fn set_level(&mut self, level: Level) {
        self.content.level = level;
    }

    /// Whether the item is a requirement rather than a heading.
    #[must_use]
    pub const fn is_normative(&self) -> bool {
        self.content.normative
    }

    /// Marks the item as a requirement (`true`) or a heading (`false`).
    pub const fn set_normative(&mut self, normative: bool) {
        self.content.normative = normative;
    }

    /// Whether the item is a heading-only item.
    ///
    /// The first line of a heading's text is its title.
    #[must_use]
    pub const fn is_heading(&self) -> bool {
        !self.content.normative
    }

    /// Whether the item takes part in publishing and traceability.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.content.active
    }

    /// Activates or deactivates the item.
    pub const fn set_active(&mut self, active: bool) {
        self.content.active = active;
    }

    /// The UIDs this item links to, in lexicographic order.
    pub fn links(&self) -> impl ExactSizeIterator<Item = &Uid> + '_ {
        self.content.links.iter()
    }

    /// Whether the item links to anything.
    #[must_use]
    pub fn has_links(&self) -> bool {
        !self.content.links.is_empty()
    }

    /// Adds a link to another item.
    ///
    /// Returns `true` if the link was new.
    pub fn add_link(&mut self, uid: Uid) -> bool {
        self.content.links.insert(uid)
    }

    /// Removes a link to another item.
    ///
    /// Returns `true` if the link was present.
    pub fn remove_link(&mut self, uid: &Uid) -> bool {
        self.content.links.remove(uid)
    }

    /// Replaces all of the item's links.
    pub fn set_links(&mut self, links: impl IntoIterator<Item = Uid>) {
        self.content.links = links.into_iter().collect();
    }

    /// Reads a custom attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.content.attributes.get(name)
    }

    /// The custom attributes of the item, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.content
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Sets a custom attribute, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Immutable`] for the identity attributes
    /// (`uid`, `prefix`, `number`) and [`AttributeError::Reserved`] for the
    /// built-in attributes, which have dedicated setters.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: Value,
    ) -> Result<Option<Value>, AttributeError> {
        if IDENTITY_ATTRIBUTES.contains(&name) {
            return Err(AttributeError::Immutable(name.to_string()));
        }
        if BUILTIN_ATTRIBUTES.contains(&name) {
            return Err(AttributeError::Reserved(name.to_string()));
        }
        Ok(self.content.attributes.insert(name.to_string(), value))
    }

    /// Builds an item from the text of its stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or `uid` has no number.
    pub fn from_record(uid: Uid, record: &str) -> Result<Self, LoadError> {
        ItemRecord::parse(record)?.into_item(uid)
    }

    /// The text of the item's stored record.
    #[must_use]
    pub fn to_record(&self) -> String {
        ItemRecord::from(self).to_yaml()
    }

    /// Reads an item from its stored record at `path`.
    ///
    /// The UID is taken from the file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, its name is not a valid
    /// UID, or its content is not a valid item record.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, LoadError> {
        let uid = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| LoadError::InvalidPath(path.to_path_buf()))?
            .parse::<Uid>()?;
        let bytes = fs.read(path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io(error),
        })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| LoadError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        Self::from_record(uid, &text)
    }

    /// Writes the item's record into `directory` as `<UID>.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn save(&self, fs: &dyn FileSystem, directory: &Path) -> io::Result<PathBuf> {
        let path = directory.join(format!("{}.yml", self.uid));
        fs.write(&path, self.to_record().as_bytes())?;
        Ok(path)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.uid, f)
    }
}

/// Errors raised when setting an item attribute.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttributeError {
    /// The attribute is part of the item's identity.
    #[error("attribute '{0}' is immutable")]
    Immutable(String),

    /// The attribute is built in and has a dedicated setter.
    #[error("attribute '{0}' is reserved")]
    Reserved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uid: &str) -> Item {
        Item::new(uid.parse().unwrap()).unwrap()
    }

    fn uid(value: &str) -> Uid {
        value.parse().unwrap()
    }

    fn links(item: &Item) -> Vec<&str> {
        item.links().map(Uid::as_str).collect()
    }

    #[test]
    fn identity_is_parsed_once() {
        let item = item("RQ001");
        assert_eq!(item.uid(), &uid("RQ001"));
        assert_eq!(item.prefix(), "RQ");
        assert_eq!(item.number(), 1);
        assert_eq!(item.to_string(), "RQ001");
    }

    #[test]
    fn uid_without_number_is_rejected() {
        assert_eq!(
            Item::new(uid("abc")),
            Err(UidError::Syntax("abc".to_string()))
        );
    }

    #[test]
    fn text_can_be_set_and_read() {
        let mut item = item("RQ001");
        item.set_text("test text");
        assert_eq!(item.text(), "test text");
    }

    #[test]
    fn links_are_sorted() {
        let mut item = item("RQ001");
        item.add_link(uid("abc"));
        item.add_link(uid("123"));
        assert_eq!(links(&item), ["123", "abc"]);
    }

    #[test]
    fn duplicate_links_are_ignored() {
        let mut item = item("RQ001");
        assert!(item.add_link(uid("abc")));
        assert!(!item.add_link(uid("abc")));
        assert_eq!(links(&item), ["abc"]);
    }

    #[test]
    fn removing_a_link_twice_is_not_an_error() {
        let mut item = item("RQ001");
        item.set_links([uid("123"), uid("abc")]);
        assert!(item.remove_link(&uid("abc")));
        assert!(!item.remove_link(&uid("abc")));
        assert_eq!(links(&item), ["123"]);
    }

    #[test]
    fn identity_attributes_are_immutable() {
        let mut item = item("RQ001");
        for name in ["uid", "prefix", "number"] {
            assert_eq!(
                item.set_attribute(name, Value::from("RQ002")),
                Err(AttributeError::Immutable(name.to_string()))
            );
        }
        assert_eq!(item.uid(), &uid("RQ001"));
        assert_eq!(item.number(), 1);
    }

    #[test]
    fn builtin_attributes_are_reserved() {
        let mut item = item("RQ001");
        assert_eq!(
            item.set_attribute("text", Value::from("x")),
            Err(AttributeError::Reserved("text".to_string()))
        );
    }

    #[test]
    fn custom_attributes_round_trip() {
        let mut item = item("RQ001");
        assert_eq!(item.set_attribute("status", Value::from("draft")), Ok(None));
        assert_eq!(
            item.set_attribute("status", Value::from("approved")),
            Ok(Some(Value::from("draft")))
        );
        assert_eq!(item.attribute("status"), Some(&Value::from("approved")));
    }

    #[test]
    fn equality_is_value_based() {
        let mut a = item("RQ001");
        let mut b = item("RQ001");
        assert_eq!(a, b);
        a.set_text("changed");
        assert_ne!(a, b);
        b.set_text("changed");
        assert_eq!(a, b);
        assert_ne!(a, item("RQ002"));
        assert!(format!("{a:?}").contains("RQ001"));
    }

    #[test]
    fn empty_item_round_trips() {
        let item = item("RQ001");
        let reloaded = Item::from_record(uid("RQ001"), &item.to_record()).unwrap();
        assert_eq!(reloaded.text(), "");
        assert!(!reloaded.has_links());
        assert_eq!(reloaded, item);
    }

    #[test]
    fn blank_header_is_cleared() {
        let mut item = item("RQ001");
        item.set_header(Some("  ".to_string()));
        assert_eq!(item.header(), None);
        item.set_header(Some("Title".to_string()));
        assert_eq!(item.header(), Some("Title"));
    }
}
