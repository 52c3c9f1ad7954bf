//! In-memory hierarchy of documents and the link graph between their items.
//!
//! The [`Tree`] knows nothing about the filesystem. It is built from a set of
//! [`Document`]s, checks that their parent references form a forest, and
//! resolves item links into a graph used for child lookups and the
//! traceability table.

use std::collections::{HashMap, HashSet};

use petgraph::{
    algo::{is_cyclic_directed, tarjan_scc},
    graphmap::DiGraphMap,
    Direction,
};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{Document, Item, Uid};

/// Position of an item: document index (tree order), then item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ItemIndex {
    document: usize,
    item: usize,
}

/// A forest of documents connected by parent prefixes.
///
/// Documents are stored in *tree order*: depth first from each root, with
/// roots and siblings ordered by prefix. This is the column order of the
/// traceability table and the order documents are published in.
#[derive(Debug, Default)]
pub struct Tree {
    /// Documents in tree order.
    documents: Vec<Document>,

    /// Index of each document's parent document.
    parents: Vec<Option<usize>>,

    /// Indices of each document's child documents, ordered by prefix.
    children: Vec<Vec<usize>>,

    /// Forward lookup from UID to item position.
    lookup: HashMap<Uid, ItemIndex>,

    /// Resolved links. Edges point from the linking item to the linked item.
    links: DiGraphMap<ItemIndex, ()>,
}

/// A reference to an item found while following links.
#[derive(Debug, Clone, Copy)]
pub enum TraceItem<'t> {
    /// A link target that exists in the tree.
    Known {
        /// The linked item.
        item: &'t Item,
        /// The document that owns the item.
        document: &'t Document,
    },
    /// A link target that does not exist in the tree.
    Unknown(&'t Uid),
}

impl<'t> TraceItem<'t> {
    /// The UID of the referenced item.
    #[must_use]
    pub const fn uid(&self) -> &'t Uid {
        match *self {
            Self::Known { item, .. } => item.uid(),
            Self::Unknown(uid) => uid,
        }
    }

    /// The owning document, for known items.
    #[must_use]
    pub const fn document(&self) -> Option<&'t Document> {
        match *self {
            Self::Known { document, .. } => Some(document),
            Self::Unknown(_) => None,
        }
    }

    /// The header of the item, for known items that have one.
    #[must_use]
    pub fn header(&self) -> Option<&'t str> {
        match *self {
            Self::Known { item, .. } => item.header(),
            Self::Unknown(_) => None,
        }
    }

    /// Whether the reference resolved to an item in the tree.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }
}

/// One row of the traceability table.
///
/// A row holds one cell per document, in tree order. A cell holds the item
/// from that document taking part in the trace, or nothing. Unknown link
/// targets whose column is already taken are kept aside as *unresolved*.
#[derive(Debug, Clone)]
pub struct TraceRow<'t> {
    cells: Vec<Option<TraceItem<'t>>>,
    unresolved: Vec<&'t Uid>,
}

impl<'t> TraceRow<'t> {
    /// The cells of the row, one per document in tree order.
    #[must_use]
    pub fn cells(&self) -> &[Option<TraceItem<'t>>] {
        &self.cells
    }

    /// Unknown link targets with no free column in this row.
    #[must_use]
    pub fn unresolved(&self) -> &[&'t Uid] {
        &self.unresolved
    }

    /// Whether any cell of the row refers to `uid`.
    #[must_use]
    pub fn contains(&self, uid: &Uid) -> bool {
        self.cells.iter().flatten().any(|cell| cell.uid() == uid)
    }

    fn key(&self) -> (Vec<Option<&'t str>>, Vec<&'t str>) {
        let cells = self
            .cells
            .iter()
            .map(|cell| cell.map(|cell| cell.uid().as_str()))
            .collect();
        let unresolved = self.unresolved.iter().map(|uid| uid.as_str()).collect();
        (cells, unresolved)
    }
}

/// Errors that can occur when assembling a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// Two documents share a prefix.
    #[error("duplicate document prefix {0}")]
    DuplicatePrefix(String),

    /// A document names a parent that is not in the tree.
    #[error("document {prefix} has unknown parent {parent}")]
    UnknownParent {
        /// Prefix of the orphaned document.
        prefix: String,
        /// The missing parent prefix.
        parent: String,
    },

    /// Parent references form a cycle.
    #[error("document parents form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// A chain of linked items, as `(column, item)` pairs.
type Chain<'t> = Vec<(usize, TraceItem<'t>)>;

impl Tree {
    /// Assembles a tree from documents.
    ///
    /// # Errors
    ///
    /// Returns an error if two documents share a prefix, a document names an
    /// unknown parent, or the parent references form a cycle.
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Result<Self, TreeError> {
        let documents: Vec<Document> = documents.into_iter().collect();
        let order = tree_order(&documents)?;

        let mut slots: Vec<Option<Document>> = documents.into_iter().map(Some).collect();
        let documents: Vec<Document> = order
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();

        let position: HashMap<&str, usize> = documents
            .iter()
            .enumerate()
            .map(|(index, document)| (document.prefix(), index))
            .collect();
        let parents: Vec<Option<usize>> = documents
            .iter()
            .map(|document| document.parent().and_then(|p| position.get(p).copied()))
            .collect();
        let mut children = vec![Vec::new(); documents.len()];
        for (index, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(index);
            }
        }

        let mut lookup = HashMap::new();
        let mut links = DiGraphMap::new();
        for (d, document) in documents.iter().enumerate() {
            for (i, item) in document.items().iter().enumerate() {
                let index = ItemIndex {
                    document: d,
                    item: i,
                };
                lookup.insert(item.uid().clone(), index);
                links.add_node(index);
            }
        }
        for (d, document) in documents.iter().enumerate() {
            for (i, item) in document.items().iter().enumerate() {
                let from = ItemIndex {
                    document: d,
                    item: i,
                };
                for uid in item.links() {
                    match lookup.get(uid) {
                        Some(&to) => {
                            links.add_edge(from, to, ());
                        }
                        None => tracing::debug!("{} links to unknown item {uid}", item.uid()),
                    }
                }
            }
        }

        Ok(Self {
            documents,
            parents,
            children,
            lookup,
            links,
        })
    }

    /// The documents in tree order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The document prefixes in tree order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> + '_ {
        self.documents.iter().map(Document::prefix)
    }

    /// Whether the tree holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Finds a document by prefix.
    #[must_use]
    pub fn document(&self, prefix: &str) -> Option<&Document> {
        self.documents.iter().find(|document| document.prefix() == prefix)
    }

    /// Iterates over every item in tree order.
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.documents.iter().flat_map(Document::items)
    }

    /// Finds an item anywhere in the tree.
    #[must_use]
    pub fn find_item(&self, uid: &Uid) -> Option<&Item> {
        self.lookup.get(uid).map(|&index| self.item_at(index))
    }

    /// Finds the document owning the item with this UID.
    #[must_use]
    pub fn document_of(&self, uid: &Uid) -> Option<&Document> {
        self.lookup
            .get(uid)
            .map(|index| &self.documents[index.document])
    }

    /// Resolves an item's links, in link order.
    ///
    /// Links that do not resolve are returned as [`TraceItem::Unknown`].
    pub fn parent_items<'t>(&'t self, item: &'t Item) -> Vec<TraceItem<'t>> {
        item.links().map(|uid| self.resolve(uid)).collect()
    }

    /// Finds the items in child documents that link to `item`.
    ///
    /// Only items in the direct child documents of the item's document are
    /// considered. Items that are not part of the tree have no children.
    #[must_use]
    pub fn child_items(&self, item: &Item) -> Vec<TraceItem<'_>> {
        self.lookup
            .get(item.uid())
            .map(|&index| {
                self.children_of(index)
                    .into_iter()
                    .map(|child| self.known(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lists every link that does not resolve, as `(item, target)` pairs.
    pub fn unknown_links(&self) -> impl Iterator<Item = (&Item, &Uid)> + '_ {
        self.items().flat_map(move |item| {
            item.links()
                .filter(|uid| !self.lookup.contains_key(*uid))
                .map(move |uid| (item, uid))
        })
    }

    /// Builds the traceability table.
    ///
    /// Each active item contributes one row for every combination of a chain
    /// of items above it (following links) and a chain of items below it
    /// (following child links). Rows are produced in tree order, document by
    /// document and item by item, and repeated rows are dropped.
    ///
    /// Unknown link targets are never dropped: one that cannot be placed in
    /// a free column is listed in [`TraceRow::unresolved`].
    #[instrument(skip(self))]
    #[must_use]
    pub fn traceability(&self) -> Vec<TraceRow<'_>> {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for (d, document) in self.documents.iter().enumerate() {
            for (i, item) in document.items().iter().enumerate() {
                if !item.is_active() {
                    continue;
                }
                let index = ItemIndex {
                    document: d,
                    item: i,
                };
                let mut visited = vec![index];
                let upward = self.upward_chains(index, &mut visited);
                let downward = self.downward_chains(index, &mut visited);

                for up in &upward {
                    for down in &downward {
                        let mut cells = vec![None; self.documents.len()];
                        let mut unresolved = Vec::new();
                        cells[d] = Some(self.known(index));
                        for &(column, entry) in up.iter().chain(down) {
                            if cells[column].is_none() {
                                cells[column] = Some(entry);
                            } else if let TraceItem::Unknown(uid) = entry {
                                if !unresolved.contains(&uid) {
                                    unresolved.push(uid);
                                }
                            }
                        }
                        let row = TraceRow { cells, unresolved };
                        if seen.insert(row.key()) {
                            rows.push(row);
                        }
                    }
                }
            }
        }

        tracing::debug!("traceability table has {} rows", rows.len());
        rows
    }

    /// Draws the document hierarchy as plain text.
    ///
    /// ```text
    /// SYS
    /// ├── HLR
    /// │   └── LLR
    /// └── HLT
    /// ```
    #[must_use]
    pub fn draw(&self) -> String {
        let mut lines = Vec::new();
        for (index, parent) in self.parents.iter().enumerate() {
            if parent.is_none() {
                lines.push(self.documents[index].prefix().to_string());
                self.draw_children(index, "", &mut lines);
            }
        }
        lines.join("\n")
    }

    fn draw_children(&self, index: usize, indent: &str, lines: &mut Vec<String>) {
        let children = &self.children[index];
        for (position, &child) in children.iter().enumerate() {
            let last = position + 1 == children.len();
            let (branch, extension) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            lines.push(format!("{indent}{branch}{}", self.documents[child].prefix()));
            self.draw_children(child, &format!("{indent}{extension}"), lines);
        }
    }

    fn item_at(&self, index: ItemIndex) -> &Item {
        &self.documents[index.document].items()[index.item]
    }

    fn known(&self, index: ItemIndex) -> TraceItem<'_> {
        TraceItem::Known {
            item: self.item_at(index),
            document: &self.documents[index.document],
        }
    }

    fn resolve<'t>(&'t self, uid: &'t Uid) -> TraceItem<'t> {
        self.lookup
            .get(uid)
            .map_or(TraceItem::Unknown(uid), |&index| self.known(index))
    }

    /// Active items in the direct child documents that link to `index`, in
    /// tree order.
    fn children_of(&self, index: ItemIndex) -> Vec<ItemIndex> {
        let mut children: Vec<ItemIndex> = self
            .links
            .neighbors_directed(index, Direction::Incoming)
            .filter(|child| self.parents[child.document] == Some(index.document))
            .filter(|&child| self.item_at(child).is_active())
            .collect();
        children.sort_unstable();
        children
    }

    /// The column an unresolved link is shown in.
    ///
    /// This is the document matching the UID's prefix if there is one, then
    /// the parent of the linking document, then the linking document itself.
    fn unknown_column(&self, uid: &Uid, from: usize) -> usize {
        uid.prefix()
            .and_then(|prefix| {
                self.documents
                    .iter()
                    .position(|document| document.prefix() == prefix)
            })
            .or(self.parents[from])
            .unwrap_or(from)
    }

    fn upward_chains(&self, index: ItemIndex, visited: &mut Vec<ItemIndex>) -> Vec<Chain<'_>> {
        let mut chains = Vec::new();
        for uid in self.item_at(index).links() {
            match self.lookup.get(uid) {
                Some(&parent) => {
                    if visited.contains(&parent)
                        || parent.document == index.document
                        || !self.item_at(parent).is_active()
                    {
                        continue;
                    }
                    visited.push(parent);
                    for mut chain in self.upward_chains(parent, visited) {
                        chain.insert(0, (parent.document, self.known(parent)));
                        chains.push(chain);
                    }
                    visited.pop();
                }
                None => {
                    let column = self.unknown_column(uid, index.document);
                    chains.push(vec![(column, TraceItem::Unknown(uid))]);
                }
            }
        }
        if chains.is_empty() {
            chains.push(Vec::new());
        }
        chains
    }

    fn downward_chains(&self, index: ItemIndex, visited: &mut Vec<ItemIndex>) -> Vec<Chain<'_>> {
        let mut chains = Vec::new();
        for child in self.children_of(index) {
            if visited.contains(&child) {
                continue;
            }
            visited.push(child);
            for mut chain in self.downward_chains(child, visited) {
                chain.insert(0, (child.document, self.known(child)));
                chains.push(chain);
            }
            visited.pop();
        }
        if chains.is_empty() {
            chains.push(Vec::new());
        }
        chains
    }
}

/// Computes tree order: depth first from each root, siblings by prefix.
fn tree_order(documents: &[Document]) -> Result<Vec<usize>, TreeError> {
    let mut position = HashMap::new();
    for (index, document) in documents.iter().enumerate() {
        if position.insert(document.prefix(), index).is_some() {
            return Err(TreeError::DuplicatePrefix(document.prefix().to_string()));
        }
    }

    let mut hierarchy: DiGraphMap<&str, ()> = DiGraphMap::new();
    for document in documents {
        hierarchy.add_node(document.prefix());
        if let Some(parent) = document.parent() {
            if !position.contains_key(parent) {
                return Err(TreeError::UnknownParent {
                    prefix: document.prefix().to_string(),
                    parent: parent.to_string(),
                });
            }
            hierarchy.add_edge(parent, document.prefix(), ());
        }
    }

    if is_cyclic_directed(&hierarchy) {
        let mut cycle = tarjan_scc(&hierarchy)
            .into_iter()
            .find(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| hierarchy.contains_edge(node, node))
            })
            .unwrap_or_default();
        cycle.sort_unstable();
        return Err(TreeError::Cycle(
            cycle.into_iter().map(ToString::to_string).collect(),
        ));
    }

    let mut roots: Vec<&str> = documents
        .iter()
        .filter(|document| document.parent().is_none())
        .map(Document::prefix)
        .collect();
    roots.sort_unstable();

    let mut order = Vec::with_capacity(documents.len());
    let mut stack: Vec<&str> = roots.into_iter().rev().collect();
    while let Some(prefix) = stack.pop() {
        order.push(position[prefix]);
        let mut children: Vec<&str> = hierarchy
            .neighbors_directed(prefix, Direction::Outgoing)
            .collect();
        children.sort_unstable();
        stack.extend(children.into_iter().rev());
    }
    Ok(order)
}
