// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown shortcuts while typing
//!
//! The host calls [`apply_shortcuts`] after inserting one character into a
//! text node. Rules run with `is_import = false`, so a block rule may insert
//! its node before the paragraph being typed into instead of replacing it.

use crate::ast::{Document, NodeId, NodeKind, NodeType, Selection, TextFormat};
use crate::markdown::{isolate, ImportContext};
use crate::registry::Registry;
use crate::traits::{
    ElementTransformer, EngineError, ImportConfig, MultilineElementTransformer, Result,
};
use regex::{Captures, Regex};

enum BlockRule<'r> {
    Element(&'r dyn ElementTransformer),
    Multiline(&'r dyn MultilineElementTransformer),
}

impl BlockRule<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Element(rule) => rule.name(),
            Self::Multiline(rule) => rule.name(),
        }
    }

    fn pattern(&self) -> &Regex {
        match self {
            Self::Element(rule) => rule.pattern(),
            Self::Multiline(rule) => rule.pattern_start(),
        }
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        paragraph: NodeId,
        children: Vec<NodeId>,
        captures: &Captures<'_>,
    ) -> Result<bool> {
        match self {
            Self::Element(rule) => rule.replace(cx, paragraph, children, captures, false),
            Self::Multiline(rule) => {
                rule.replace(cx, paragraph, Some(children), captures, None, None, false)
            }
        }
    }
}

/// Run the shortcut rules for a character just typed into `text`
///
/// `offset` is the byte offset right after the typed character. Block rules
/// fire on a typed space, then trigger-keyed text matches, then closing
/// emphasis tags, then text matches without a trigger. Returns whether the
/// tree changed.
pub fn apply_shortcuts(
    doc: &mut Document,
    registry: &Registry,
    text: NodeId,
    offset: usize,
) -> Result<bool> {
    let (content, format) = match doc.kind(text) {
        NodeKind::Text { content, format } => (content.clone(), *format),
        _ => return Err(EngineError::NotText(text)),
    };
    if offset > content.len() || !content.is_char_boundary(offset) {
        return Err(EngineError::InvalidOffset {
            offset,
            len: content.len(),
        });
    }
    if doc.parent(text).is_none() {
        return Err(EngineError::Detached(text));
    }
    let Some(typed) = content[..offset].chars().next_back() else {
        return Ok(false);
    };
    if format.code {
        return Ok(false);
    }

    if typed == ' ' && run_block_rules(doc, registry, text, &content, offset)? {
        return Ok(true);
    }
    if run_text_matches(doc, registry, text, &content, offset, typed)? {
        return Ok(true);
    }
    if run_text_formats(doc, registry, text, &content, offset, format)? {
        return Ok(true);
    }
    run_untriggered(doc, registry, text, &content)
}

/// Odd run of backslashes right before `at`
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn run_block_rules(
    doc: &mut Document,
    registry: &Registry,
    text: NodeId,
    content: &str,
    offset: usize,
) -> Result<bool> {
    let Some(paragraph) = doc.parent(text) else {
        return Ok(false);
    };
    if doc.node_type(paragraph) != NodeType::Paragraph
        || doc.parent(paragraph) != Some(doc.root())
        || doc.first_child(paragraph) != Some(text)
    {
        return Ok(false);
    }

    let before = &content[..offset];
    let rules = registry
        .elements()
        .map(BlockRule::Element)
        .chain(registry.multiline_elements().map(BlockRule::Multiline));
    for rule in rules {
        let Some(captures) = rule.pattern().captures(before) else {
            continue;
        };
        let Some(found) = captures.get(0) else {
            continue;
        };
        // The typed space belongs to the match or sits right after it
        let expected = if found.as_str().ends_with(' ') {
            offset
        } else {
            offset - 1
        };
        if found.start() != 0 || found.end() != expected {
            continue;
        }

        let rest = if offset < content.len() {
            Some(doc.split_text(text, offset)?.1)
        } else {
            None
        };
        doc.remove(text)?;
        let children = doc.children(paragraph).to_vec();

        let mut cx = ImportContext::new(doc, registry, ImportConfig::default());
        match rule.replace(&mut cx, paragraph, children.clone(), &captures) {
            Ok(true) => {
                tracing::trace!(transformer = rule.name(), "block shortcut");
                let caret = children
                    .first()
                    .copied()
                    .filter(|&child| doc.is_attached(child))
                    .or_else(|| doc.is_attached(paragraph).then_some(paragraph))
                    .map(|node| Selection { node, offset: 0 });
                doc.set_selection(caret);
                return Ok(true);
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(transformer = rule.name(), %err, "block shortcut failed; restoring text")
            }
        }
        restore_prefix(doc, paragraph, text, content, rest)?;
    }
    Ok(false)
}

/// Put the typed text back after a block rule declined
fn restore_prefix(
    doc: &mut Document,
    paragraph: NodeId,
    text: NodeId,
    content: &str,
    rest: Option<NodeId>,
) -> Result<()> {
    if let Some(rest) = rest.filter(|&rest| doc.parent(rest).is_some()) {
        doc.remove(rest)?;
    }
    doc.set_text(text, content)?;
    match doc.first_child(paragraph) {
        Some(first) => doc.insert_before(first, text),
        None => doc.append(paragraph, text),
    }
}

fn run_text_matches(
    doc: &mut Document,
    registry: &Registry,
    text: NodeId,
    content: &str,
    offset: usize,
    typed: char,
) -> Result<bool> {
    let before = &content[..offset];
    for rule in registry.for_trigger(typed) {
        let Some(captures) = rule.pattern().captures(before) else {
            continue;
        };
        let Some(found) = captures.get(0).filter(|m| !m.is_empty()) else {
            continue;
        };
        if is_escaped(before, found.start()) {
            continue;
        }

        let (matched, after) = isolate(doc, text, found.start(), found.end())?;
        let parent = doc.parent(matched);
        let index = doc.index_in_parent(matched);
        if let Err(err) = rule.replace(doc, matched, &captures) {
            tracing::warn!(transformer = rule.name(), %err, "text shortcut failed; keeping text");
            return Ok(false);
        }
        tracing::trace!(transformer = rule.name(), "text shortcut");
        let caret = match (after, parent.zip(index)) {
            (Some(node), _) => Some(Selection { node, offset: 0 }),
            (None, Some((parent, index))) => Some(Selection {
                node: parent,
                offset: index + 1,
            }),
            (None, None) => None,
        };
        doc.set_selection(caret);
        return Ok(true);
    }
    Ok(false)
}

fn run_text_formats(
    doc: &mut Document,
    registry: &Registry,
    text: NodeId,
    content: &str,
    offset: usize,
    format: TextFormat,
) -> Result<bool> {
    let before = &content[..offset];
    let next = content[offset..].chars().next();
    for rule in registry.text_formats() {
        let Some(marker) = rule.tag.chars().next() else {
            continue;
        };
        let Some(inner) = before.strip_suffix(rule.tag) else {
            continue;
        };
        if inner.ends_with(|c: char| c == marker || c.is_whitespace())
            || is_escaped(before, inner.len())
        {
            continue;
        }
        if !rule.intraword && next.is_some_and(char::is_alphanumeric) {
            continue;
        }
        let Some(open) = inner.rfind(rule.tag) else {
            continue;
        };
        let body = &inner[open + rule.tag.len()..];
        if body.is_empty() || body.starts_with(char::is_whitespace) || is_escaped(before, open) {
            continue;
        }
        let previous = inner[..open].chars().next_back();
        if previous == Some(marker) {
            continue;
        }
        if !rule.intraword && previous.is_some_and(char::is_alphanumeric) {
            continue;
        }

        let body = body.to_string();
        let rebuilt = format!("{}{}{}", &content[..open], body, &content[offset..]);
        doc.set_text(text, rebuilt)?;
        let (formatted, after) = isolate(doc, text, open, open + body.len())?;
        doc.set_format(formatted, format.union(rule.format))?;
        tracing::trace!(transformer = rule.name, "format shortcut");
        doc.set_selection(Some(match after {
            Some(node) => Selection { node, offset: 0 },
            None => Selection {
                node: formatted,
                offset: body.len(),
            },
        }));
        return Ok(true);
    }
    Ok(false)
}

fn run_untriggered(
    doc: &mut Document,
    registry: &Registry,
    text: NodeId,
    content: &str,
) -> Result<bool> {
    for rule in registry.text_matches().filter(|rule| rule.trigger().is_none()) {
        let Some(captures) = rule.import_pattern().captures(content) else {
            continue;
        };
        let Some(found) = captures.get(0).filter(|m| !m.is_empty()) else {
            continue;
        };
        let (matched, _) = isolate(doc, text, found.start(), found.end())?;
        if let Err(err) = rule.replace(doc, matched, &captures) {
            tracing::warn!(transformer = rule.name(), %err, "text shortcut failed; keeping text");
            return Ok(false);
        }
        let changed = !doc.is_attached(matched);
        if changed {
            tracing::trace!(transformer = rule.name(), "text shortcut");
        }
        return Ok(changed);
    }
    Ok(false)
}
