// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pipe tables
//!
//! Rows are only recognised once a separator line shows up: the separator
//! reaches back over the row-shaped paragraphs right above it and turns them
//! into a table. Row lines after that extend the table.

use crate::ast::{Document, NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{ElementTransformer, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|(.+)\|\s*$").unwrap());
static SEPARATOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|(\s*:?-+:?\s*\|)+\s*$").unwrap());

pub struct Table;

impl ElementTransformer for Table {
    fn name(&self) -> &str {
        "TABLE"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Table, NodeType::TableRow, NodeType::TableCell]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        matches!(cx.doc().kind(node), NodeKind::Table).then(|| cx.render_table(node))
    }

    fn pattern(&self) -> &Regex {
        &ROW_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        if !is_import {
            return Ok(false);
        }
        let line = captures.get(0).map_or("", |m| m.as_str());
        if SEPARATOR_PATTERN.is_match(line) {
            absorb_rows(cx, placeholder)
        } else {
            append_row(cx, placeholder, line)
        }
    }
}

/// Turn the row paragraphs on the lines right above a separator into a table
fn absorb_rows(cx: &mut ImportContext<'_>, placeholder: NodeId) -> Result<bool> {
    let mut rows = Vec::new();
    let mut line = cx.line_index();
    let mut cursor = cx.doc().previous_sibling(placeholder);
    while let Some(paragraph) = cursor {
        let (Some(source), Some(index)) = (cx.source_line(paragraph), cx.source_line_index(paragraph))
        else {
            break;
        };
        if index + 1 != line || !ROW_PATTERN.is_match(source) || SEPARATOR_PATTERN.is_match(source) {
            break;
        }
        rows.push((paragraph, split_row(source)));
        line = index;
        cursor = cx.doc().previous_sibling(paragraph);
    }
    if rows.is_empty() {
        return Ok(false);
    }
    rows.reverse();

    let columns = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
    let table = cx.doc_mut().create(NodeKind::Table);
    for (position, (_, cells)) in rows.iter().enumerate() {
        let row = build_row(cx, cells, columns, position == 0)?;
        cx.doc_mut().append(table, row)?;
    }
    let doc = cx.doc_mut();
    for (paragraph, _) in rows {
        doc.remove(paragraph)?;
    }
    doc.replace(placeholder, table)?;
    tracing::trace!(columns, "table built");
    Ok(true)
}

/// Extend a table that ends right above this line
fn append_row(cx: &mut ImportContext<'_>, placeholder: NodeId, line: &str) -> Result<bool> {
    if cx.follows_blank_line() {
        return Ok(false);
    }
    let Some(table) = cx
        .doc()
        .previous_sibling(placeholder)
        .filter(|&previous| cx.doc().node_type(previous) == NodeType::Table)
    else {
        return Ok(false);
    };
    let cells = split_row(line);
    let widest = cx
        .doc()
        .children(table)
        .iter()
        .map(|&row| cx.doc().children(row).len())
        .max()
        .unwrap_or(0);
    let columns = widest.max(cells.len());
    pad_rows(cx.doc_mut(), table, columns)?;
    let row = build_row(cx, &cells, columns, false)?;
    let doc = cx.doc_mut();
    doc.append(table, row)?;
    doc.remove(placeholder)?;
    Ok(true)
}

fn build_row(
    cx: &mut ImportContext<'_>,
    cells: &[String],
    columns: usize,
    header: bool,
) -> Result<NodeId> {
    let row = cx.doc_mut().create(NodeKind::TableRow);
    for column in 0..columns {
        let cell = cx.doc_mut().create(NodeKind::TableCell { header });
        cx.doc_mut().append(row, cell)?;
        if let Some(raw) = cells.get(column) {
            cx.fill_inline(cell, raw)?;
        }
    }
    Ok(row)
}

/// Give every row of `table` at least `columns` cells
fn pad_rows(doc: &mut Document, table: NodeId, columns: usize) -> Result<()> {
    for row in doc.children(table).to_vec() {
        let header = doc
            .first_child(row)
            .is_some_and(|cell| matches!(doc.kind(cell), NodeKind::TableCell { header: true }));
        for _ in doc.children(row).len()..columns {
            let cell = doc.create(NodeKind::TableCell { header });
            doc.append(row, cell)?;
        }
    }
    Ok(())
}

/// Cells of a pipe row; `\|` is a literal pipe, other escapes are left for the inline scanner
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = line.trim().chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some(next) => {
                    cell.push('\\');
                    cell.push(next);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    cells.iter().map(|cell| cell.trim().to_string()).collect()
}
