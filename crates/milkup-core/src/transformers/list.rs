// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bullet, numbered and check lists
//!
//! Nesting is carried by wrapper items: a `ListItem` whose only child is the
//! nested `List`. A line indented by N levels walks down the last wrapper of
//! each level. An item can open at most one level below the deepest open
//! one, so deeper indentation is clamped.

use crate::ast::{Document, ListKind, NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{ElementTransformer, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CHECK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:-\s)?\s?(\[(\s|x)?\])\s").unwrap());
static BULLET_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)[-*+]\s").unwrap());
static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)(\d{1,9})\.\s").unwrap());

/// One list rule per marker style
pub struct List {
    kind: ListKind,
}

impl List {
    pub fn new(kind: ListKind) -> Self {
        Self { kind }
    }
}

impl ElementTransformer for List {
    fn name(&self) -> &str {
        match self.kind {
            ListKind::Check => "CHECK_LIST",
            ListKind::Bullet => "UNORDERED_LIST",
            ListKind::Number => "ORDERED_LIST",
        }
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::List, NodeType::ListItem]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        match cx.doc().kind(node) {
            NodeKind::List { kind, .. } if *kind == self.kind => Some(cx.render_list(node)),
            _ => None,
        }
    }

    fn pattern(&self) -> &Regex {
        match self.kind {
            ListKind::Check => &CHECK_PATTERN,
            ListKind::Bullet => &BULLET_PATTERN,
            ListKind::Number => &NUMBER_PATTERN,
        }
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        children: Vec<NodeId>,
        captures: &Captures<'_>,
        _is_import: bool,
    ) -> Result<bool> {
        let level = indent_level(
            captures.get(1).map_or("", |m| m.as_str()),
            cx.config().list_indent_size,
        );
        let (start, checked) = match self.kind {
            ListKind::Number => (
                captures
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(1),
                None,
            ),
            ListKind::Check => (1, Some(captures.get(3).is_some_and(|m| m.as_str() == "x"))),
            ListKind::Bullet => (1, None),
        };
        let extends = !cx.follows_blank_line();
        let doc = cx.doc_mut();

        let item = doc.create(NodeKind::ListItem { checked });
        doc.append_all(item, children)?;

        let previous = doc
            .previous_sibling(placeholder)
            .filter(|&previous| extends && doc.node_type(previous) == NodeType::List);
        let target = match previous {
            Some(list) if level > 0 => {
                let level = level.min(open_depth(doc, list) + 1);
                Some(nested_list(doc, list, level, self.kind, start)?)
            }
            Some(list) if list_kind(doc, list) == Some(self.kind) => Some(list),
            _ => None,
        };
        match target {
            Some(list) => {
                doc.append(list, item)?;
                doc.remove(placeholder)?;
            }
            None => {
                let list = doc.create(NodeKind::List {
                    kind: self.kind,
                    depth: 0,
                    start,
                });
                doc.append(list, item)?;
                doc.replace(placeholder, list)?;
            }
        }
        Ok(true)
    }
}

/// Tabs count one level each, spaces count one level per `size`
fn indent_level(indent: &str, size: usize) -> usize {
    let tabs = indent.chars().filter(|&c| c == '\t').count();
    let spaces = indent.chars().filter(|&c| c == ' ').count();
    tabs + spaces / size.max(1)
}

fn list_kind(doc: &Document, list: NodeId) -> Option<ListKind> {
    match doc.kind(list) {
        NodeKind::List { kind, .. } => Some(*kind),
        _ => None,
    }
}

/// The nested list of a wrapper item
fn wrapped_list(doc: &Document, item: NodeId) -> Option<NodeId> {
    match doc.children(item) {
        [only] if doc.node_type(*only) == NodeType::List => Some(*only),
        _ => None,
    }
}

/// Deepest level reachable through the trailing wrapper items of `top`
fn open_depth(doc: &Document, top: NodeId) -> usize {
    let mut depth = 0;
    let mut list = top;
    while let Some(inner) = doc.last_child(list).and_then(|item| wrapped_list(doc, item)) {
        depth += 1;
        list = inner;
    }
    depth
}

/// Descend from `top` to the list at `level`, creating the last level if needed
fn nested_list(
    doc: &mut Document,
    top: NodeId,
    level: usize,
    kind: ListKind,
    start: u32,
) -> Result<NodeId> {
    let mut list = top;
    for depth in 1..=level {
        let existing = doc
            .last_child(list)
            .and_then(|item| wrapped_list(doc, item))
            .filter(|&inner| depth < level || list_kind(doc, inner) == Some(kind));
        list = match existing {
            Some(inner) => inner,
            None => {
                let wrapper = doc.create(NodeKind::ListItem { checked: None });
                let inner_kind = if depth < level { list_kind(doc, list).unwrap_or(kind) } else { kind };
                let inner = doc.create(NodeKind::List {
                    kind: inner_kind,
                    depth,
                    start,
                });
                doc.append(wrapper, inner)?;
                doc.append(list, wrapper)?;
                inner
            }
        };
    }
    Ok(list)
}
