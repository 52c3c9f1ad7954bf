//! HTML rendering.

use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{html, Options, Parser};

use crate::{
    domain::{TraceItem, Tree},
    publish::{
        lines::{Heading, Markup, Reference},
        Format,
    },
};

/// HTML markup: numbered `<hN>` headings anchored by UID, Markdown bodies
/// converted to HTML.
pub(crate) struct Html;

impl Markup for Html {
    fn spaced(&self) -> bool {
        false
    }

    fn heading(&self, heading: &Heading<'_>) -> String {
        let level = heading.depth.clamp(1, 6);
        let uid = heading.uid.as_str();
        let text = match heading.title {
            Some(title) if heading.normative => {
                let title = format!("{} <small>{}</small>", encode_text(title), encode_text(uid));
                match &heading.number {
                    Some(number) => format!("{number} {title}"),
                    None => title,
                }
            }
            _ => encode_text(&heading.label()).into_owned(),
        };
        format!(
            "<h{level} id=\"{}\">{text}</h{level}>",
            encode_double_quoted_attribute(uid)
        )
    }

    fn body(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut output = String::new();
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        html::push_html(&mut output, Parser::new_ext(text, options));
        output.lines().map(str::to_string).collect()
    }

    fn links(&self, label: &str, references: &[Reference]) -> String {
        if references.iter().all(|reference| reference.href.is_none()) {
            let text: Vec<String> = references.iter().map(Reference::text).collect();
            return format!(
                "<p><em>{} {}</em></p>",
                encode_text(label),
                encode_text(&text.join(", "))
            );
        }
        let links: Vec<String> = references.iter().map(reference_html).collect();
        format!("<p><em>{}</em> {}</p>", encode_text(label), links.join(", "))
    }

    fn attributes(&self, rows: &[(&str, String)]) -> Vec<String> {
        let mut lines = vec![
            "<table>".to_string(),
            "<tr><th>Attribute</th><th>Value</th></tr>".to_string(),
        ];
        lines.extend(rows.iter().map(|(name, value)| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                encode_text(name),
                encode_text(value)
            )
        }));
        lines.push("</table>".to_string());
        lines
    }

    fn toc(&self, entries: &[Heading<'_>]) -> Vec<String> {
        if entries.is_empty() {
            return Vec::new();
        }
        let mut lines = vec![
            "<nav>".to_string(),
            "<h2>Table of Contents</h2>".to_string(),
            "<ul>".to_string(),
        ];
        lines.extend(entries.iter().map(|entry| {
            format!(
                "<li style=\"margin-left: {}em\"><a href=\"#{}\">{}</a></li>",
                entry.depth.saturating_sub(1),
                encode_double_quoted_attribute(entry.uid.as_str()),
                encode_text(&entry.label())
            )
        }));
        lines.push("</ul>".to_string());
        lines.push("</nav>".to_string());
        lines
    }
}

fn reference_html(reference: &Reference) -> String {
    match &reference.href {
        Some(href) => format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(href),
            encode_text(&reference.uid)
        ),
        None => encode_text(&reference.text()).into_owned(),
    }
}

/// The body of an index page listing published documents.
///
/// With a tree, the page also shows the document hierarchy and the
/// traceability table.
pub(crate) fn index_body(files: &[String], tree: Option<&Tree>) -> Vec<String> {
    let mut lines = vec!["<h1>Published documents</h1>".to_string(), "<ul>".to_string()];
    lines.extend(files.iter().map(|file| {
        format!(
            "<li><a href=\"{}\">{}</a></li>",
            encode_double_quoted_attribute(file),
            encode_text(file)
        )
    }));
    lines.push("</ul>".to_string());

    if let Some(tree) = tree {
        lines.push("<h2>Tree structure</h2>".to_string());
        lines.push(format!("<pre>{}</pre>", encode_text(&tree.draw())));
        lines.extend(traceability_table(tree));
    }
    lines
}

fn traceability_table(tree: &Tree) -> Vec<String> {
    let extension = Format::Html.extension();
    let mut lines = vec![
        "<h2>Traceability</h2>".to_string(),
        "<table>".to_string(),
    ];
    let header: String = tree
        .documents()
        .iter()
        .map(|document| {
            format!(
                "<th><a href=\"{}\">{}</a></th>",
                encode_double_quoted_attribute(&document.file_name(extension)),
                encode_text(document.prefix())
            )
        })
        .collect();
    let rows = tree.traceability();
    let unresolved = rows.iter().any(|row| !row.unresolved().is_empty());
    if unresolved {
        lines.push(format!("<tr>{header}<th>Unresolved</th></tr>"));
    } else {
        lines.push(format!("<tr>{header}</tr>"));
    }

    for row in &rows {
        let mut cells: String = row
            .cells()
            .iter()
            .map(|cell| format!("<td>{}</td>", cell.as_ref().map(trace_cell).unwrap_or_default()))
            .collect();
        if unresolved {
            let unknown: Vec<String> = row
                .unresolved()
                .iter()
                .map(|uid| unknown_marker(uid.as_str()))
                .collect();
            cells.push_str(&format!("<td>{}</td>", unknown.join(", ")));
        }
        lines.push(format!("<tr>{cells}</tr>"));
    }
    lines.push("</table>".to_string());
    lines
}

fn trace_cell(trace: &TraceItem<'_>) -> String {
    let uid = trace.uid().as_str();
    match trace.document() {
        Some(document) => {
            let href = format!("{}#{uid}", document.file_name(Format::Html.extension()));
            let label = match trace.header() {
                Some(header) => format!("{uid} {header}"),
                None => uid.to_string(),
            };
            format!(
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(&href),
                encode_text(&label)
            )
        }
        None => unknown_marker(uid),
    }
}

fn unknown_marker(uid: &str) -> String {
    format!("<span class=\"unknown\">{} (unknown)</span>", encode_text(uid))
}
