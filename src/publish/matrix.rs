//! CSV traceability matrices.
//!
//! One column per document in tree order, one row per traceability row.
//! A cell holds the UID of the row's item in that document, or is blank.
//! When some row has unknown links with no free column, a final
//! `unresolved` column lists them.

use std::collections::HashSet;

use csv::{Terminator, WriterBuilder};

use crate::{
    domain::{TraceRow, Tree, Uid},
    publish::Target,
};

/// Name of the matrix file written by `create_matrix`.
pub const MATRIX_FILE: &str = "traceability.csv";

/// Header of the column listing unresolved links.
const UNRESOLVED: &str = "unresolved";

/// The complete matrix, header row included.
pub(crate) fn matrix(tree: &Tree) -> csv::Result<String> {
    let rows = tree.traceability();
    let lines = records(tree, &rows)?;
    Ok(lines.into_iter().map(|line| line + "\n").collect())
}

/// The header and the rows that contain an item of `target`.
///
/// A target with no matching rows yields no lines at all.
pub(crate) fn matrix_lines(tree: &Tree, target: &Target<'_>) -> csv::Result<Vec<String>> {
    let wanted: Option<HashSet<&Uid>> = match target {
        Target::Items(items) => Some(items.iter().map(|item| item.uid()).collect()),
        Target::Document(document) => Some(document.items().iter().map(|item| item.uid()).collect()),
        Target::Tree => None,
    };
    let rows: Vec<TraceRow<'_>> = tree
        .traceability()
        .into_iter()
        .filter(|trace| {
            wanted
                .as_ref()
                .is_none_or(|wanted| wanted.iter().any(|uid| trace.contains(uid)))
        })
        .collect();
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    records(tree, &rows)
}

/// Writes the header and `rows` through one CSV writer, one line per record.
fn records(tree: &Tree, rows: &[TraceRow<'_>]) -> csv::Result<Vec<String>> {
    let unresolved = rows.iter().any(|row| !row.unresolved().is_empty());

    let mut header: Vec<String> = tree.prefixes().map(str::to_string).collect();
    if unresolved {
        header.push(UNRESOLVED.to_string());
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    let mut ends = Vec::with_capacity(rows.len() + 1);

    writer.write_record(&header)?;
    writer.flush()?;
    ends.push(writer.get_ref().len());
    for row in rows {
        writer.write_record(fields(row, unresolved))?;
        writer.flush()?;
        ends.push(writer.get_ref().len());
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    let mut start = 0;
    Ok(ends
        .into_iter()
        .map(|end| {
            let line = String::from_utf8_lossy(&bytes[start..end])
                .trim_end_matches('\n')
                .to_string();
            start = end;
            line
        })
        .collect())
}

fn fields(trace: &TraceRow<'_>, unresolved: bool) -> Vec<String> {
    let mut fields: Vec<String> = trace
        .cells()
        .iter()
        .map(|cell| {
            cell.as_ref()
                .map_or_else(String::new, |item| item.uid().to_string())
        })
        .collect();
    if unresolved {
        let uids: Vec<&str> = trace.unresolved().iter().map(|uid| uid.as_str()).collect();
        fields.push(uids.join(" "));
    }
    fields
}
