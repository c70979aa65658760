// SPDX-License-Identifier: AGPL-3.0-or-later
//! Block and inline equations
//!
//! `$$` always opens a block on import. While typing, `$$ ` inserts an empty
//! block equation through [`EquationBlockShortcut`] instead.

use super::place_block;
use crate::ast::{Document, NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{
    ElementTransformer, EndPattern, MultilineElementTransformer, Result, TextMatchTransformer,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static BLOCK_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*\$\$").unwrap());
static BLOCK_END: Lazy<EndPattern> = Lazy::new(|| EndPattern {
    regex: Regex::new(r"\$\$[ \t]*$").unwrap(),
    optional: true,
});
static SHORTCUT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\$\s$").unwrap());
static INLINE_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$]+?)\$").unwrap());
static INLINE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$]+?)\$$").unwrap());

pub struct BlockEquation;

impl MultilineElementTransformer for BlockEquation {
    fn name(&self) -> &str {
        "BLOCK_EQUATION"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::BlockEquation]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        match cx.doc().kind(node) {
            NodeKind::BlockEquation { source } => Some(format!("$$\n{source}\n$$")),
            _ => None,
        }
    }

    fn pattern_start(&self) -> &Regex {
        &BLOCK_START
    }

    fn pattern_end(&self) -> Option<&EndPattern> {
        Some(&*BLOCK_END)
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        root: NodeId,
        _children: Option<Vec<NodeId>>,
        _start: &Captures<'_>,
        end: Option<&Captures<'_>>,
        lines: Option<&[&str]>,
        is_import: bool,
    ) -> Result<bool> {
        let Some(lines) = lines.filter(|_| is_import) else {
            return Ok(false);
        };
        // Only the text sharing a line with a `$$` marker is trimmed
        let last = lines.len().saturating_sub(1);
        let mut lines: Vec<&str> = lines
            .iter()
            .enumerate()
            .map(|(index, &line)| {
                let line = if index == 0 { line.trim() } else { line };
                if index == last && end.is_some() {
                    line.trim_end()
                } else {
                    line
                }
            })
            .collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        if lines.first().is_some_and(|line| line.is_empty()) {
            lines.remove(0);
        }
        let source = lines.join("\n");
        let doc = cx.doc_mut();
        let equation = doc.create(NodeKind::BlockEquation { source });
        doc.replace(root, equation)?;
        Ok(true)
    }
}

/// `$$ ` typed into an empty line
pub struct EquationBlockShortcut;

impl ElementTransformer for EquationBlockShortcut {
    fn name(&self) -> &str {
        "EQUATION_BLOCK_SHORTCUT"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::BlockEquation]
    }

    fn export(&self, _node: NodeId, _cx: &ExportContext<'_>) -> Option<String> {
        None
    }

    fn pattern(&self) -> &Regex {
        &SHORTCUT_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        _captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        if is_import {
            return Ok(false);
        }
        let equation = cx.doc_mut().create(NodeKind::BlockEquation {
            source: String::new(),
        });
        place_block(cx, placeholder, equation, is_import)?;
        Ok(true)
    }
}

/// `$source$` inside a text run
pub struct InlineEquation;

impl TextMatchTransformer for InlineEquation {
    fn name(&self) -> &str {
        "INLINE_EQUATION"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::InlineEquation]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        match cx.doc().kind(node) {
            NodeKind::InlineEquation { source } if !source.is_empty() => Some(format!("${source}$")),
            _ => None,
        }
    }

    fn import_pattern(&self) -> &Regex {
        &INLINE_IMPORT
    }

    fn pattern(&self) -> &Regex {
        &INLINE_PATTERN
    }

    fn trigger(&self) -> Option<char> {
        Some('$')
    }

    fn replace(&self, doc: &mut Document, text: NodeId, captures: &Captures<'_>) -> Result<()> {
        let source = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let equation = doc.create(NodeKind::InlineEquation { source });
        doc.replace(text, equation)
    }
}
