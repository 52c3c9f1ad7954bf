//! Markdown and plain-text rendering.

use crate::publish::lines::{Heading, Markup, Reference};

/// Markdown markup: heading depth as repeated `#`, bodies passed through.
pub(crate) struct Markdown;

impl Markup for Markdown {
    fn spaced(&self) -> bool {
        true
    }

    fn heading(&self, heading: &Heading<'_>) -> String {
        let marks = "#".repeat(heading.depth.clamp(1, 6));
        let text = match heading.title {
            Some(title) if heading.normative => {
                let title = format!("{title} <small>{}</small>", heading.uid);
                match &heading.number {
                    Some(number) => format!("{number} {title}"),
                    None => title,
                }
            }
            _ => heading.label(),
        };
        if heading.anchor {
            format!("{marks} {text} {{#{}}}", heading.uid)
        } else {
            format!("{marks} {text}")
        }
    }

    fn body(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        text.trim_end().lines().map(str::to_string).collect()
    }

    fn links(&self, label: &str, references: &[Reference]) -> String {
        if references.iter().all(|reference| reference.href.is_none()) {
            let text: Vec<String> = references.iter().map(Reference::text).collect();
            return format!("*{label} {}*", text.join(", "));
        }
        let links: Vec<String> = references
            .iter()
            .map(|reference| match &reference.href {
                Some(href) => format!("[{}]({href})", reference.uid),
                None => reference.text(),
            })
            .collect();
        format!("*{label}* {}", links.join(", "))
    }

    fn attributes(&self, rows: &[(&str, String)]) -> Vec<String> {
        let mut lines = vec!["| Attribute | Value |".to_string(), "| --- | --- |".to_string()];
        lines.extend(
            rows.iter()
                .map(|(name, value)| format!("| {name} | {} |", value.replace('|', "\\|"))),
        );
        lines
    }

    fn toc(&self, entries: &[Heading<'_>]) -> Vec<String> {
        if entries.is_empty() {
            return Vec::new();
        }
        let mut lines = vec!["### Table of Contents".to_string(), String::new()];
        lines.extend(entries.iter().map(|entry| {
            let indent = "    ".repeat(entry.depth.saturating_sub(1));
            format!("{indent}* [{}](#{})", entry.label(), entry.uid)
        }));
        lines
    }
}

const INDENT: &str = "    ";

/// Plain text: unadorned headings, everything else indented.
pub(crate) struct Text;

impl Markup for Text {
    fn spaced(&self) -> bool {
        true
    }

    fn heading(&self, heading: &Heading<'_>) -> String {
        match heading.title {
            Some(_) if heading.normative => format!("{} ({})", heading.label(), heading.uid),
            _ => heading.label(),
        }
    }

    fn body(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        text.trim_end()
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{INDENT}{line}")
                }
            })
            .collect()
    }

    fn links(&self, label: &str, references: &[Reference]) -> String {
        let text: Vec<String> = references.iter().map(Reference::text).collect();
        format!("{INDENT}{label} {}", text.join(", "))
    }

    fn attributes(&self, rows: &[(&str, String)]) -> Vec<String> {
        rows.iter()
            .map(|(name, value)| format!("{INDENT}{name}: {value}"))
            .collect()
    }

    fn toc(&self, _entries: &[Heading<'_>]) -> Vec<String> {
        Vec::new()
    }
}
