//! The format-agnostic line-generation engine.
//!
//! [`publish_lines`] walks a target in document order and produces a lazy
//! sequence of output lines. Outline formats (HTML, Markdown and text) share
//! one walk and differ only in their [`Markup`]; CSV is rendered from the
//! tree's traceability rows instead.

use std::fmt;

use serde_yaml::Value;

use crate::{
    domain::{Document, Item, PublishConfig, TraceItem, Tree, Uid},
    publish::{
        html::Html,
        markdown::{Markdown, Text},
        matrix, Format, PublishError,
    },
    storage::{BuiltinTemplates, Template, TemplateLoader},
};

/// What to publish.
#[derive(Debug, Clone)]
pub enum Target<'a> {
    /// An explicit list of items, rendered without a page wrapper.
    Items(Vec<&'a Item>),
    /// A single document.
    Document(&'a Document),
    /// Every document in the tree.
    Tree,
}

/// A lazy, one-shot sequence of output lines.
///
/// Lines do not include a trailing newline. The sequence cannot be restarted;
/// call [`publish_lines`] again for a fresh pass.
pub struct Lines<'a>(Box<dyn Iterator<Item = String> + 'a>);

impl<'a> Lines<'a> {
    pub(crate) fn new(lines: impl Iterator<Item = String> + 'a) -> Self {
        Self(Box::new(lines))
    }

    /// Joins the remaining lines, terminating each with a newline.
    #[must_use]
    pub fn into_text(self) -> String {
        self.map(|line| line + "\n").collect()
    }
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl fmt::Debug for Lines<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lines").finish_non_exhaustive()
    }
}

/// Renders `target` in `format`, using the built-in templates.
///
/// Links are resolved against `tree`. Inactive items are skipped.
///
/// # Errors
///
/// Returns [`PublishError::Template`] if the configured HTML template cannot
/// be loaded. The check happens before any line is produced.
pub fn publish_lines<'a>(
    tree: &'a Tree,
    target: Target<'a>,
    format: Format,
    config: &'a PublishConfig,
) -> Result<Lines<'a>, PublishError> {
    render_lines(&BuiltinTemplates, tree, target, format, config)
}

pub(crate) fn render_lines<'a>(
    templates: &dyn TemplateLoader,
    tree: &'a Tree,
    target: Target<'a>,
    format: Format,
    config: &'a PublishConfig,
) -> Result<Lines<'a>, PublishError> {
    let outline = |markup: &'static dyn Markup| Outline {
        tree,
        config,
        format,
        markup,
        anchors: config.linkify,
    };
    let lines = match format {
        Format::Html => {
            let template = Template::load(templates, config.template_name())?;
            outline(&Html).lines(target, Some(template))
        }
        Format::Markdown => outline(&Markdown).lines(target, None),
        Format::Text => outline(&Text).lines(target, None),
        Format::Csv => Lines::new(matrix::matrix_lines(tree, &target)?.into_iter()),
    };
    Ok(lines)
}

/// A heading line, before format-specific markup is applied.
#[derive(Debug, Clone)]
pub(crate) struct Heading<'a> {
    pub uid: &'a Uid,
    pub depth: usize,
    /// The outline number, when heading levels are shown.
    pub number: Option<String>,
    pub title: Option<&'a str>,
    /// Requirements show their UID; headings show only their title.
    pub normative: bool,
    /// Whether cross-references to this heading are hyperlinks.
    pub anchor: bool,
}

impl Heading<'_> {
    /// The number followed by the title, or by the UID when there is no
    /// title.
    pub fn label(&self) -> String {
        let text = match self.title {
            Some(title) => title,
            None if self.normative => self.uid.as_str(),
            None => "",
        };
        match &self.number {
            Some(number) if text.is_empty() => number.clone(),
            Some(number) => format!("{number} {text}"),
            None => text.to_string(),
        }
    }
}

/// A reference to another item on a links line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reference {
    pub uid: String,
    /// `<file>#<uid>`, when linkify is on and the target is known.
    pub href: Option<String>,
    pub known: bool,
}

impl Reference {
    /// The reference as plain text, marking unresolved UIDs.
    pub fn text(&self) -> String {
        if self.known {
            self.uid.clone()
        } else {
            format!("{} (unknown)", self.uid)
        }
    }
}

/// Format-specific syntax for outline formats.
pub(crate) trait Markup: Sync {
    /// Whether blocks are separated by blank lines.
    fn spaced(&self) -> bool;

    fn heading(&self, heading: &Heading<'_>) -> String;

    /// The item body. Empty text yields no lines.
    fn body(&self, text: &str) -> Vec<String>;

    fn links(&self, label: &str, references: &[Reference]) -> String;

    fn attributes(&self, rows: &[(&str, String)]) -> Vec<String>;

    /// A table of contents for a document, or nothing if the format has none.
    fn toc(&self, entries: &[Heading<'_>]) -> Vec<String>;
}

#[derive(Clone, Copy)]
struct Outline<'a> {
    tree: &'a Tree,
    config: &'a PublishConfig,
    format: Format,
    markup: &'static dyn Markup,
    /// Whether headings carry anchors for in-page links.
    anchors: bool,
}

impl<'a> Outline<'a> {
    fn lines(self, target: Target<'a>, template: Option<Template>) -> Lines<'a> {
        match target {
            Target::Items(items) => Lines::new(
                items
                    .into_iter()
                    .filter(|item| item.is_active())
                    .flat_map(move |item| self.item(item)),
            ),
            Target::Tree => Lines::new(
                self.tree
                    .documents()
                    .iter()
                    .flat_map(move |document| self.document(document)),
            ),
            Target::Document(document) => {
                let toc = if self.config.toc {
                    self.markup.toc(&self.toc_entries(document))
                } else {
                    Vec::new()
                };
                let outline = Self {
                    anchors: self.anchors || !toc.is_empty(),
                    ..self
                };
                match template {
                    Some(template) => {
                        let toc = toc.join("\n");
                        let head = split_lines(&template.head(document.prefix(), &toc));
                        let tail = split_lines(&template.tail(document.prefix(), &toc));
                        Lines::new(
                            head.into_iter()
                                .chain(outline.document(document))
                                .chain(tail),
                        )
                    }
                    None => {
                        let gap = (!toc.is_empty()).then(String::new);
                        Lines::new(toc.into_iter().chain(gap).chain(outline.document(document)))
                    }
                }
            }
        }
    }

    fn document(self, document: &'a Document) -> impl Iterator<Item = String> + 'a {
        document
            .items()
            .iter()
            .filter(|item| item.is_active())
            .flat_map(move |item| self.item(item))
    }

    fn toc_entries(self, document: &'a Document) -> Vec<Heading<'a>> {
        document
            .items()
            .iter()
            .filter(|item| item.is_active())
            .map(|item| self.heading(item))
            .collect()
    }

    fn heading(self, item: &'a Item) -> Heading<'a> {
        let title = if item.is_heading() {
            Some(heading_parts(item).0)
        } else {
            item.header()
        };
        Heading {
            uid: item.uid(),
            depth: item.level().depth(),
            number: self
                .config
                .heading_levels
                .then(|| item.level().to_string()),
            title: title.filter(|title| !title.is_empty()),
            normative: item.is_normative(),
            anchor: self.anchors,
        }
    }

    /// All lines for one item, in fixed order: heading, body, links, child
    /// links, attributes.
    fn item(self, item: &'a Item) -> Vec<String> {
        let markup = self.markup;
        let mut lines = vec![markup.heading(&self.heading(item))];

        if item.is_heading() {
            self.push_block(&mut lines, markup.body(heading_parts(item).1));
            self.end_item(&mut lines);
            return lines;
        }

        self.push_block(&mut lines, markup.body(item.text()));

        if item.has_links() {
            let label = if self.config.child_links {
                "Parent links:"
            } else {
                "Links:"
            };
            let references = self.references(self.tree.parent_items(item));
            self.push_block(&mut lines, vec![markup.links(label, &references)]);
        }

        if self.config.child_links {
            let children = self.tree.child_items(item);
            if !children.is_empty() {
                let references = self.references(children);
                self.push_block(&mut lines, vec![markup.links("Child links:", &references)]);
            }
        }

        let rows = self.attribute_rows(item);
        if !rows.is_empty() {
            self.push_block(&mut lines, markup.attributes(&rows));
        }

        self.end_item(&mut lines);
        lines
    }

    fn references(self, items: Vec<TraceItem<'_>>) -> Vec<Reference> {
        items
            .into_iter()
            .map(|trace| Reference {
                uid: trace.uid().to_string(),
                href: trace
                    .document()
                    .filter(|_| self.config.linkify)
                    .map(|document| {
                        format!(
                            "{}#{}",
                            document.file_name(self.format.extension()),
                            trace.uid()
                        )
                    }),
                known: trace.is_known(),
            })
            .collect()
    }

    fn attribute_rows(self, item: &'a Item) -> Vec<(&'a str, String)> {
        let Some(document) = self.tree.document_of(item.uid()) else {
            return Vec::new();
        };
        document
            .publish_attributes()
            .iter()
            .filter_map(|name| {
                item.attribute(name)
                    .filter(|value| !value.is_null())
                    .map(|value| (name.as_str(), attribute_text(value)))
            })
            .collect()
    }

    fn push_block(self, lines: &mut Vec<String>, block: Vec<String>) {
        if block.is_empty() {
            return;
        }
        if self.markup.spaced() {
            lines.push(String::new());
        }
        lines.extend(block);
    }

    fn end_item(self, lines: &mut Vec<String>) {
        if self.markup.spaced() {
            lines.push(String::new());
        }
    }
}

/// Splits a heading item's content into its title and remaining body.
///
/// The header, when set, is the title and the whole text is the body.
/// Otherwise the first line of the text is the title.
fn heading_parts(item: &Item) -> (&str, &str) {
    if let Some(header) = item.header() {
        return (header, item.text());
    }
    let text = item.text().trim_start();
    match text.split_once('\n') {
        Some((title, body)) => (title.trim(), body),
        None => (text.trim(), ""),
    }
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => serde_yaml::to_string(other)
            .map(|yaml| yaml.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
