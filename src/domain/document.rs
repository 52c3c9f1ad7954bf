use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::domain::{Item, Level, Uid, UidError};

/// An ordered collection of items sharing a UID prefix.
///
/// A document may name a parent document by prefix; items in a child
/// document are expected to link to items in the parent. Item order is
/// significant: it is the order items are numbered and published in.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    prefix: String,
    parent: Option<String>,
    sep: String,
    digits: usize,
    items: Vec<Item>,
    assets: Option<PathBuf>,
    publish: Vec<String>,
}

impl Document {
    /// Creates an empty root document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPrefix`] unless the prefix starts with
    /// an ASCII letter and contains only ASCII letters, digits, `-` and `_`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, DocumentError> {
        let prefix = validate_prefix(prefix.into())?;
        Ok(Self {
            prefix,
            parent: None,
            sep: String::new(),
            digits: 3,
            items: Vec::new(),
            assets: None,
            publish: Vec::new(),
        })
    }

    /// Sets the parent document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPrefix`] if the parent prefix is not
    /// valid.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Result<Self, DocumentError> {
        self.parent = Some(validate_prefix(parent.into())?);
        Ok(self)
    }

    /// Sets the folder of static files published alongside the document.
    #[must_use]
    pub fn with_assets(mut self, assets: impl Into<PathBuf>) -> Self {
        self.assets = Some(assets.into());
        self
    }

    /// Sets the separator and digit width used for new item UIDs.
    #[must_use]
    pub fn with_numbering(mut self, sep: impl Into<String>, digits: usize) -> Self {
        self.sep = sep.into();
        self.digits = digits;
        self
    }

    /// Sets the custom attributes shown in each item's attribute table.
    #[must_use]
    pub fn with_publish_attributes(mut self, names: Vec<String>) -> Self {
        self.publish = names;
        self
    }

    /// The UID prefix shared by the document's items.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefix of the parent document, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The separator placed between prefix and number in new UIDs.
    #[must_use]
    pub fn sep(&self) -> &str {
        &self.sep
    }

    /// The digit width of numbers in new UIDs.
    #[must_use]
    pub const fn digits(&self) -> usize {
        self.digits
    }

    /// The folder of static files published alongside the document.
    #[must_use]
    pub fn assets(&self) -> Option<&Path> {
        self.assets.as_deref()
    }

    /// Custom attribute names rendered in each item's attribute table.
    #[must_use]
    pub fn publish_attributes(&self) -> &[String] {
        &self.publish
    }

    /// The document's items, in document order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The number of items in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the document has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finds an item by UID.
    #[must_use]
    pub fn item(&self, uid: &Uid) -> Option<&Item> {
        self.items.iter().find(|item| item.uid() == uid)
    }

    /// Finds an item by UID for modification.
    pub fn item_mut(&mut self, uid: &Uid) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.uid() == uid)
    }

    /// Appends an item to the end of the document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::PrefixMismatch`] if the item belongs to
    /// another document, or [`DocumentError::DuplicateItem`] if an item with
    /// the same UID is already present.
    pub fn add_item(&mut self, item: Item) -> Result<(), DocumentError> {
        if item.prefix() != self.prefix {
            return Err(DocumentError::PrefixMismatch {
                uid: item.uid().clone(),
                prefix: self.prefix.clone(),
            });
        }
        if self.item(item.uid()).is_some() {
            return Err(DocumentError::DuplicateItem(item.uid().clone()));
        }
        self.items.push(item);
        Ok(())
    }

    /// Creates a new item with the next free UID and appends it.
    ///
    /// The new item is placed one position after the current last item, at
    /// the same depth.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated UID cannot be parsed back, which
    /// happens when the prefix ends in a digit and no separator is set.
    pub fn new_item(&mut self) -> Result<&mut Item, DocumentError> {
        let uid = self.next_uid()?;
        let mut item = Item::new(uid)?;
        if let Some(last) = self.items.last() {
            let mut parts = last.level().parts().to_vec();
            if let Some(tail) = parts.last_mut() {
                *tail += 1;
            }
            item.set_level(Level::new(parts)?);
        }
        self.add_item(item)?;
        let index = self.items.len() - 1;
        Ok(&mut self.items[index])
    }

    /// Removes an item by UID.
    pub fn remove_item(&mut self, uid: &Uid) -> Option<Item> {
        let index = self.items.iter().position(|item| item.uid() == uid)?;
        Some(self.items.remove(index))
    }

    /// The UID the next new item will receive.
    ///
    /// # Errors
    ///
    /// Returns an error if the UID cannot be formed from the prefix.
    pub fn next_uid(&self) -> Result<Uid, UidError> {
        let next = self.items.iter().map(Item::number).max().unwrap_or(0) + 1;
        Uid::from_parts(&self.prefix, &self.sep, next, self.digits)
    }

    /// Orders items by level, then by UID.
    pub fn sort(&mut self) {
        self.items
            .sort_by(|a, b| a.level().cmp(b.level()).then_with(|| a.uid().cmp(b.uid())));
    }

    /// Renumbers item levels sequentially in document order.
    ///
    /// Each item keeps its depth, so the outline structure is preserved while
    /// gaps and duplicates in the numbering are removed.
    pub fn renumber(&mut self) {
        let mut levels: Vec<Level> = self.items.iter().map(|item| item.level().clone()).collect();
        Level::renumber(levels.iter_mut());
        for (item, level) in self.items.iter_mut().zip(levels) {
            item.set_level(level);
        }
    }

    /// The file name the document is published under for an extension.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.prefix)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

fn validate_prefix(prefix: String) -> Result<String, DocumentError> {
    let mut chars = prefix.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(prefix)
    } else {
        Err(DocumentError::InvalidPrefix(prefix))
    }
}

/// Errors that can occur when building a document.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The prefix is empty or contains unsupported characters.
    #[error("invalid document prefix '{0}'")]
    InvalidPrefix(String),

    /// An item was added to a document with a different prefix.
    #[error("item {uid} does not belong to document {prefix}")]
    PrefixMismatch {
        /// UID of the rejected item.
        uid: Uid,
        /// Prefix of the document.
        prefix: String,
    },

    /// An item with the same UID already exists in the document.
    #[error("duplicate item {0}")]
    DuplicateItem(Uid),

    /// A generated UID was not well formed.
    #[error(transparent)]
    Uid(#[from] UidError),

    /// A generated level was not well formed.
    #[error(transparent)]
    Level(#[from] crate::domain::LevelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uid: &str, level: &str) -> Item {
        let mut item = Item::new(uid.parse().unwrap()).unwrap();
        item.set_level(level.parse().unwrap());
        item
    }

    fn levels(document: &Document) -> Vec<String> {
        document
            .items()
            .iter()
            .map(|item| item.level().to_string())
            .collect()
    }

    #[test]
    fn rejects_invalid_prefixes() {
        for prefix in ["", "1REQ", "RE Q", "RE/Q"] {
            assert_eq!(
                Document::new(prefix),
                Err(DocumentError::InvalidPrefix(prefix.to_string()))
            );
        }
    }

    #[test]
    fn items_must_share_the_prefix() {
        let mut document = Document::new("REQ").unwrap();
        let err = document.add_item(item("TST001", "1")).unwrap_err();
        assert!(matches!(err, DocumentError::PrefixMismatch { .. }));
        assert!(document.is_empty());
    }

    #[test]
    fn duplicate_items_are_rejected() {
        let mut document = Document::new("REQ").unwrap();
        document.add_item(item("REQ001", "1")).unwrap();
        let err = document.add_item(item("REQ001", "2")).unwrap_err();
        assert_eq!(err, DocumentError::DuplicateItem("REQ001".parse().unwrap()));
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn new_items_follow_numbering_settings() {
        let mut document = Document::new("REQ").unwrap().with_numbering("-", 4);
        document.add_item(item("REQ-0007", "1.1")).unwrap();

        let created = document.new_item().unwrap();
        assert_eq!(created.uid().as_str(), "REQ-0008");
        assert_eq!(created.level().to_string(), "1.2");
    }

    #[test]
    fn first_new_item_starts_at_one() {
        let mut document = Document::new("REQ").unwrap();
        let created = document.new_item().unwrap();
        assert_eq!(created.uid().as_str(), "REQ001");
        assert_eq!(created.level().to_string(), "1");
    }

    #[test]
    fn sort_orders_by_level_then_uid() {
        let mut document = Document::new("REQ").unwrap();
        document.add_item(item("REQ003", "2")).unwrap();
        document.add_item(item("REQ002", "1.1")).unwrap();
        document.add_item(item("REQ001", "1.1")).unwrap();
        document.sort();
        let uids: Vec<_> = document.items().iter().map(|i| i.uid().as_str()).collect();
        assert_eq!(uids, ["REQ001", "REQ002", "REQ003"]);
    }

    #[test]
    fn renumber_keeps_depth() {
        let mut document = Document::new("REQ").unwrap();
        document.add_item(item("REQ001", "1")).unwrap();
        document.add_item(item("REQ002", "1.5")).unwrap();
        document.add_item(item("REQ003", "1.5")).unwrap();
        document.add_item(item("REQ004", "4")).unwrap();
        document.renumber();
        assert_eq!(levels(&document), ["1", "1.1", "1.2", "2"]);
    }

    #[test]
    fn remove_item_returns_the_item() {
        let mut document = Document::new("REQ").unwrap();
        document.add_item(item("REQ001", "1")).unwrap();
        let uid = "REQ001".parse().unwrap();
        assert!(document.remove_item(&uid).is_some());
        assert!(document.remove_item(&uid).is_none());
    }

    #[test]
    fn file_name_uses_prefix() {
        let document = Document::new("tst").unwrap();
        assert_eq!(document.file_name("html"), "tst.html");
    }
}
