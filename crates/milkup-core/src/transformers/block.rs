// SPDX-License-Identifier: AGPL-3.0-or-later
//! Horizontal rules, headings and quotes

use super::place_block;
use crate::ast::{Document, NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{ElementTransformer, Result, TextMatchTransformer};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(---|\*\*\*|___)\s?$").unwrap());
static HEADING_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s").unwrap());
static QUOTE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s").unwrap());
static DASH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^---$").unwrap());

/// `---`, `***` or `___` on a line of its own
pub struct HorizontalRule;

impl ElementTransformer for HorizontalRule {
    fn name(&self) -> &str {
        "HR"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::HorizontalRule]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        matches!(cx.doc().kind(node), NodeKind::HorizontalRule).then(|| "---".to_string())
    }

    fn pattern(&self) -> &Regex {
        &HR_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        _captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        let rule = cx.doc_mut().create(NodeKind::HorizontalRule);
        place_block(cx, placeholder, rule, is_import)?;
        Ok(true)
    }
}

pub struct Heading;

impl ElementTransformer for Heading {
    fn name(&self) -> &str {
        "HEADING"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Heading]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        match cx.doc().kind(node) {
            NodeKind::Heading { level } => Some(cx.render_heading(node, *level)),
            _ => None,
        }
    }

    fn pattern(&self) -> &Regex {
        &HEADING_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        children: Vec<NodeId>,
        captures: &Captures<'_>,
        _is_import: bool,
    ) -> Result<bool> {
        let level = captures.get(1).map_or(1, |m| m.len()) as u8;
        let doc = cx.doc_mut();
        let heading = doc.create(NodeKind::Heading { level });
        doc.append_all(heading, children)?;
        doc.replace(placeholder, heading)?;
        Ok(true)
    }
}

/// `> ` lines; consecutive lines join one quote
pub struct Quote;

impl ElementTransformer for Quote {
    fn name(&self) -> &str {
        "QUOTE"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Quote]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        matches!(cx.doc().kind(node), NodeKind::Quote).then(|| cx.render_quote(node))
    }

    fn pattern(&self) -> &Regex {
        &QUOTE_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        children: Vec<NodeId>,
        _captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        let continues = is_import && !cx.follows_blank_line();
        let doc = cx.doc_mut();
        if continues {
            if let Some(previous) = doc
                .previous_sibling(placeholder)
                .filter(|&previous| doc.node_type(previous) == NodeType::Quote)
            {
                let line_break = doc.create(NodeKind::LineBreak);
                doc.append(previous, line_break)?;
                doc.append_all(previous, children)?;
                doc.remove(placeholder)?;
                return Ok(true);
            }
        }
        let quote = doc.create(NodeKind::Quote);
        doc.append_all(quote, children)?;
        doc.replace(placeholder, quote)?;
        Ok(true)
    }
}

/// Typing `---` alone in a paragraph turns it into a rule
pub struct DashSpace;

impl TextMatchTransformer for DashSpace {
    fn name(&self) -> &str {
        "DASH_SPACE"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Text, NodeType::HorizontalRule]
    }

    fn export(&self, _node: NodeId, _cx: &ExportContext<'_>) -> Option<String> {
        None
    }

    fn import_pattern(&self) -> &Regex {
        &DASH_PATTERN
    }

    fn pattern(&self) -> &Regex {
        &DASH_PATTERN
    }

    fn trigger(&self) -> Option<char> {
        None
    }

    fn replace(&self, doc: &mut Document, text: NodeId, _captures: &Captures<'_>) -> Result<()> {
        let Some(paragraph) = doc.parent(text) else {
            return Ok(());
        };
        let alone = doc.children(paragraph) == [text];
        let top_level = doc.parent(paragraph) == Some(doc.root());
        if alone && top_level && doc.node_type(paragraph) == NodeType::Paragraph {
            let rule = doc.create(NodeKind::HorizontalRule);
            doc.replace(paragraph, rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{NodeKind, TextFormat, TreeNode};
    use crate::markdown::Markdown;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;

    fn heading(level: u8, children: Vec<TreeNode>) -> TreeNode {
        TreeNode::with_children(NodeKind::Heading { level }, children)
    }

    #[test]
    fn test_rule_variants() {
        let md = Markdown::default();
        for line in ["---", "***", "___", "--- "] {
            assert_eq!(
                md.parse(line).to_tree(),
                TreeNode::root(vec![TreeNode::new(NodeKind::HorizontalRule)]),
                "{line:?}"
            );
        }
        assert_eq!(md.export(&md.parse("***")), "---");
    }

    #[test]
    fn test_heading_levels() {
        let md = Markdown::default();
        assert_eq!(
            md.parse("###### six\n####### seven").to_tree(),
            TreeNode::root(vec![
                heading(6, vec![TreeNode::text("six")]),
                TreeNode::paragraph(vec![TreeNode::text("####### seven")]),
            ])
        );
        assert_eq!(md.export(&md.parse("#  **x**")), "#  **x**");
    }

    #[test]
    fn test_heading_needs_space() {
        let md = Markdown::default();
        assert_eq!(
            md.parse("#tag").to_tree(),
            TreeNode::root(vec![TreeNode::paragraph(vec![TreeNode::text("#tag")])])
        );
    }

    #[test]
    fn test_quote_lines_join() {
        let md = Markdown::default();
        let doc = md.parse("> one\n> *two*\n\n> three");
        assert_eq!(
            doc.to_tree(),
            TreeNode::root(vec![
                TreeNode::with_children(
                    NodeKind::Quote,
                    vec![
                        TreeNode::text("one"),
                        TreeNode::new(NodeKind::LineBreak),
                        TreeNode::formatted("two", TextFormat::ITALIC),
                    ],
                ),
                TreeNode::with_children(NodeKind::Quote, vec![TreeNode::text("three")]),
            ])
        );
        assert_eq!(md.export(&doc), "> one\n> *two*\n\n> three");
    }

    #[test]
    fn test_dash_space_needs_a_lone_paragraph() {
        let registry = Registry::builder()
            .named("DASH_SPACE")
            .unwrap()
            .build()
            .unwrap();
        let md = Markdown::new(registry);
        assert_eq!(
            md.parse("---").to_tree(),
            TreeNode::root(vec![TreeNode::new(NodeKind::HorizontalRule)])
        );
        assert_eq!(
            md.parse("a ---").to_tree(),
            TreeNode::root(vec![TreeNode::paragraph(vec![TreeNode::text("a ---")])])
        );
    }
}
