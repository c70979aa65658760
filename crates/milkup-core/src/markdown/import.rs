// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown to tree
//!
//! Lines are consumed top to bottom. Each non-blank line is offered to the
//! multi-line rules, then to the single-line rules, and otherwise becomes a
//! paragraph. Inline content is scanned once the block node that owns it is
//! in place.

use super::inline::scan_text_node;
use crate::ast::{Document, NodeId, NodeKind, NodeType};
use crate::registry::Registry;
use crate::traits::{EndPattern, EngineError, ImportConfig, MultilineElementTransformer, Result};
use regex::Captures;
use std::collections::HashMap;

/// Replace the content of `doc` with the blocks parsed from `text`
///
/// Returns the new top-level nodes.
pub fn import_document(
    text: &str,
    doc: &mut Document,
    registry: &Registry,
    config: &ImportConfig,
) -> Vec<NodeId> {
    let root = doc.root();
    doc.clear_children(root);
    // The root always takes paragraphs
    import_fragment(text, doc, root, registry, config).unwrap_or_default()
}

/// Append the blocks parsed from `text` below `parent` without clearing it
///
/// `parent` must accept block children; in the built-in node set only the
/// root does.
pub fn import_fragment(
    text: &str,
    doc: &mut Document,
    parent: NodeId,
    registry: &Registry,
    config: &ImportConfig,
) -> Result<Vec<NodeId>> {
    let parent_type = doc.node_type(parent);
    if !parent_type.can_contain(NodeType::Paragraph) {
        return Err(EngineError::IllegalChild {
            parent: parent_type,
            child: NodeType::Paragraph,
        });
    }
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let before = doc.children(parent).len();

    let mut cx = ImportContext::new(doc, registry, config.clone());
    cx.import_lines(parent, &lines);
    cx.finish(parent, before);

    let created = doc.children(parent)[before..].to_vec();
    tracing::debug!(
        lines = lines.len(),
        blocks = created.len(),
        "markdown imported"
    );
    Ok(created)
}

/// Raw line a fallback paragraph was built from
#[derive(Debug, Clone)]
struct SourceLine {
    index: usize,
    text: String,
}

/// Mutable view handed to block transformers
pub struct ImportContext<'a> {
    doc: &'a mut Document,
    registry: &'a Registry,
    config: ImportConfig,
    sources: HashMap<NodeId, SourceLine>,
    line: usize,
    after_blank: bool,
}

impl<'a> ImportContext<'a> {
    pub fn new(doc: &'a mut Document, registry: &'a Registry, config: ImportConfig) -> Self {
        Self {
            doc,
            registry,
            config,
            sources: HashMap::new(),
            line: 0,
            after_blank: false,
        }
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        self.doc
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// The line a paragraph was imported from, if it fell through every block rule
    pub fn source_line(&self, paragraph: NodeId) -> Option<&str> {
        self.sources
            .get(&paragraph)
            .map(|source| source.text.as_str())
    }

    /// Zero-based index of the line being imported
    pub fn line_index(&self) -> usize {
        self.line
    }

    /// Zero-based index of the line a fallback paragraph was built from
    pub fn source_line_index(&self, paragraph: NodeId) -> Option<usize> {
        self.sources.get(&paragraph).map(|source| source.index)
    }

    /// Whether the line being imported comes after a blank line or starts the input
    ///
    /// Rules that extend the previous block (quotes, lists, table rows) only
    /// do so when this is false.
    pub fn follows_blank_line(&self) -> bool {
        self.after_blank
    }

    /// Run the inline scanner over a text node that has a parent
    pub fn scan_inline(&mut self, text: NodeId) -> Result<()> {
        scan_text_node(self.doc, self.registry, text)
    }

    /// Append the inline nodes parsed from `raw` to `parent`
    pub fn fill_inline(&mut self, parent: NodeId, raw: &str) -> Result<()> {
        if raw.is_empty() {
            return Ok(());
        }
        let text = self.doc.create(NodeKind::text(raw));
        self.doc.append(parent, text)?;
        self.scan_inline(text)
    }

    fn import_lines(&mut self, parent: NodeId, lines: &[&str]) {
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            if line.trim().is_empty() {
                index += 1;
                continue;
            }
            self.line = index;
            self.after_blank = index == 0 || lines[index - 1].trim().is_empty();
            if let Some(next) = self.import_multiline(parent, lines, index) {
                index = next;
                continue;
            }
            if let Err(err) = self.import_line(parent, index, line) {
                tracing::warn!(line = index + 1, %err, "line skipped");
            }
            index += 1;
        }
    }

    /// Try each multi-line rule at `index`; on success return the next line to read
    fn import_multiline(&mut self, parent: NodeId, lines: &[&str], index: usize) -> Option<usize> {
        let registry = self.registry;
        let line = lines[index];
        for rule in registry.multiline_elements() {
            let Some(start) = rule.pattern_start().captures(line) else {
                continue;
            };
            let offset = start.get(0).map_or(0, |m| m.end());
            let (last, end) = match find_close(rule.pattern_end(), lines, index, offset) {
                Close::Matched { line, captures } => (line, Some(captures)),
                Close::Implicit { last } => (last, None),
            };
            let end_start = end.as_ref().and_then(|c| c.get(0)).map(|m| m.start());
            let mut body: Vec<&str> = Vec::with_capacity(last + 1 - index);
            if last == index {
                body.push(&line[offset..end_start.unwrap_or(line.len()).max(offset)]);
            } else {
                body.push(&line[offset..]);
                body.extend_from_slice(&lines[index + 1..last]);
                body.push(end_start.map_or(lines[last], |s| &lines[last][..s]));
            }

            match self.apply_multiline(rule, parent, &start, end.as_ref(), &body) {
                Ok(true) => {
                    tracing::trace!(transformer = rule.name(), from = index + 1, to = last + 1, "block rule");
                    return Some(last + 1);
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(transformer = rule.name(), line = index + 1, %err, "block rule failed; trying the next one");
                }
            }
        }
        None
    }

    fn apply_multiline(
        &mut self,
        rule: &dyn MultilineElementTransformer,
        parent: NodeId,
        start: &Captures<'_>,
        end: Option<&Captures<'_>>,
        body: &[&str],
    ) -> Result<bool> {
        let placeholder = self.placeholder(parent)?;
        let handled = rule.replace(self, placeholder, None, start, end, Some(body), true);
        if !matches!(handled, Ok(true)) {
            self.discard(placeholder);
        }
        handled
    }

    fn import_line(&mut self, parent: NodeId, index: usize, line: &str) -> Result<()> {
        let registry = self.registry;
        for rule in registry.elements() {
            let Some(captures) = rule.pattern().captures(line) else {
                continue;
            };
            let Some(found) = captures.get(0) else {
                continue;
            };
            let rest = format!("{}{}", &line[..found.start()], &line[found.end()..]);
            let placeholder = self.placeholder(parent)?;
            let text = self.doc.create(NodeKind::text(rest));
            self.doc.append(placeholder, text)?;

            match rule.replace(self, placeholder, vec![text], &captures, true) {
                Ok(true) => {
                    tracing::trace!(transformer = rule.name(), line = index + 1, "block rule");
                    if self.doc.is_attached(text) {
                        self.scan_inline(text)?;
                    }
                    return Ok(());
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(transformer = rule.name(), line = index + 1, %err, "block rule failed; trying the next one");
                }
            }
            self.discard(placeholder);
        }

        let paragraph = self.placeholder(parent)?;
        let text = self.doc.create(NodeKind::text(line));
        self.doc.append(paragraph, text)?;
        self.sources.insert(
            paragraph,
            SourceLine {
                index,
                text: line.to_string(),
            },
        );
        self.scan_inline(text)
    }

    fn placeholder(&mut self, parent: NodeId) -> Result<NodeId> {
        let paragraph = self.doc.create(NodeKind::Paragraph);
        self.doc.append(parent, paragraph)?;
        Ok(paragraph)
    }

    fn discard(&mut self, placeholder: NodeId) {
        if self.doc.parent(placeholder).is_some() {
            // Only fails for the root, which is never a placeholder
            let _ = self.doc.remove(placeholder);
        }
    }

    /// Drop empty paragraphs, then merge paragraphs from consecutive lines
    fn finish(&mut self, parent: NodeId, before: usize) {
        let blocks = self.doc.children(parent)[before..].to_vec();
        for &block in &blocks {
            if self.doc.node_type(block) == NodeType::Paragraph && self.doc.children(block).is_empty() {
                self.discard(block);
            }
        }
        if self.config.merge_adjacent_lines {
            self.merge_lines(parent, before);
        }
    }

    fn merge_lines(&mut self, parent: NodeId, before: usize) {
        let blocks = self.doc.children(parent)[before..].to_vec();
        let mut previous: Option<(NodeId, usize)> = None;
        for block in blocks {
            let index = self.sources.get(&block).map(|source| source.index);
            match (previous, index) {
                (Some((into, last)), Some(index)) if index == last + 1 => {
                    match self.merge_into(into, block) {
                        Ok(()) => previous = Some((into, index)),
                        Err(err) => {
                            tracing::warn!(%err, "paragraph lines not merged");
                            previous = Some((block, index));
                        }
                    }
                }
                (_, Some(index)) => previous = Some((block, index)),
                (_, None) => previous = None,
            }
        }
    }

    fn merge_into(&mut self, into: NodeId, block: NodeId) -> Result<()> {
        let line_break = self.doc.create(NodeKind::LineBreak);
        self.doc.append(into, line_break)?;
        let moved = self.doc.children(block).to_vec();
        self.doc.append_all(into, moved)?;
        self.doc.remove(block)
    }
}

enum Close<'l> {
    Matched { line: usize, captures: Captures<'l> },
    Implicit { last: usize },
}

/// Locate the closing line of a block opened on line `index`
///
/// On the opening line only text after `offset` is searched.
fn find_close<'l>(
    end: Option<&EndPattern>,
    lines: &[&'l str],
    index: usize,
    offset: usize,
) -> Close<'l> {
    if let Some(end) = end {
        for (at, line) in lines.iter().copied().enumerate().skip(index) {
            let from = if at == index { offset } else { 0 };
            if let Some(captures) = end.regex.captures_at(line, from) {
                return Close::Matched { line: at, captures };
            }
        }
        if !end.optional {
            return Close::Implicit {
                last: lines.len() - 1,
            };
        }
    }
    let last = lines[index + 1..]
        .iter()
        .position(|line| line.trim().is_empty())
        .map_or(lines.len() - 1, |blank| index + blank);
    Close::Implicit { last }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{TextFormat, TreeNode};
    use crate::traits::{ElementTransformer, Transformer};
    use crate::markdown::ExportContext;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn import_with(text: &str, config: &ImportConfig) -> TreeNode {
        let mut doc = Document::new();
        import_document(text, &mut doc, &Registry::with_defaults(), config);
        doc.to_tree()
    }

    fn import(text: &str) -> TreeNode {
        import_with(text, &ImportConfig::default())
    }

    fn paragraph(text: &str) -> TreeNode {
        TreeNode::paragraph(vec![TreeNode::text(text)])
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            import("## Hello *there*\n\nplain"),
            TreeNode::root(vec![
                TreeNode::with_children(
                    NodeKind::Heading { level: 2 },
                    vec![
                        TreeNode::text("Hello "),
                        TreeNode::formatted("there", TextFormat::ITALIC),
                    ],
                ),
                paragraph("plain"),
            ])
        );
    }

    #[test]
    fn test_blank_lines_create_nothing() {
        assert_eq!(import(""), TreeNode::root(vec![]));
        assert_eq!(import("\n \n\t\n"), TreeNode::root(vec![]));
        assert_eq!(
            import("\n\na\n\n\n\nb\n"),
            TreeNode::root(vec![paragraph("a"), paragraph("b")])
        );
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        assert_eq!(
            import("# T\r\n\r\nbody\r\n"),
            TreeNode::root(vec![
                TreeNode::with_children(NodeKind::Heading { level: 1 }, vec![TreeNode::text("T")]),
                paragraph("body"),
            ])
        );
    }

    #[test]
    fn test_adjacent_lines_merge() {
        assert_eq!(
            import("one\ntwo\n\nthree"),
            TreeNode::root(vec![
                TreeNode::paragraph(vec![
                    TreeNode::text("one"),
                    TreeNode::new(NodeKind::LineBreak),
                    TreeNode::text("two"),
                ]),
                paragraph("three"),
            ])
        );
        let config = ImportConfig {
            merge_adjacent_lines: false,
            ..ImportConfig::default()
        };
        assert_eq!(
            import_with("one\ntwo", &config),
            TreeNode::root(vec![paragraph("one"), paragraph("two")])
        );
    }

    #[test]
    fn test_block_between_lines_stops_merge() {
        assert_eq!(
            import("one\n---\ntwo"),
            TreeNode::root(vec![
                paragraph("one"),
                TreeNode::new(NodeKind::HorizontalRule),
                paragraph("two"),
            ])
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            import("```rust\nfn main() {}\n\n```\nafter"),
            TreeNode::root(vec![
                TreeNode::new(NodeKind::CodeBlock {
                    language: Some("rust".into()),
                    code: "fn main() {}\n".into(),
                }),
                paragraph("after"),
            ])
        );
    }

    #[test]
    fn test_unterminated_code_runs_to_end() {
        assert_eq!(
            import("```\na\n\nb"),
            TreeNode::root(vec![TreeNode::new(NodeKind::CodeBlock {
                language: None,
                code: "a\n\nb".into(),
            })])
        );
    }

    #[test]
    fn test_equation_without_end_stops_at_blank_line() {
        assert_eq!(
            import("$$\nx\ny\n\nafter"),
            TreeNode::root(vec![
                TreeNode::new(NodeKind::BlockEquation {
                    source: "x\ny".into()
                }),
                paragraph("after"),
            ])
        );
    }

    #[test]
    fn test_single_line_equation() {
        assert_eq!(
            import("$$e=mc^2$$"),
            TreeNode::root(vec![TreeNode::new(NodeKind::BlockEquation {
                source: "e=mc^2".into()
            })])
        );
    }

    #[test]
    fn test_source_lines_are_recorded() {
        let mut doc = Document::new();
        let registry = Registry::with_defaults();
        let root = doc.root();
        let mut cx = ImportContext::new(&mut doc, &registry, ImportConfig::default());
        cx.import_lines(root, &["# heading", "plain $x$"]);
        let blocks = cx.doc().children(root).to_vec();
        assert_eq!(cx.source_line(blocks[0]), None);
        assert_eq!(cx.source_line(blocks[1]), Some("plain $x$"));
    }

    #[test]
    fn test_fragment_appends() {
        let registry = Registry::with_defaults();
        let config = ImportConfig::default();
        let mut doc = Document::new();
        import_document("first", &mut doc, &registry, &config);
        let root = doc.root();
        let created = import_fragment("# second", &mut doc, root, &registry, &config).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(doc.children(root).len(), 2);

        let heading = created[0];
        assert!(matches!(
            import_fragment("x", &mut doc, heading, &registry, &config),
            Err(EngineError::IllegalChild { .. })
        ));
    }

    struct Failing {
        pattern: Regex,
    }

    impl ElementTransformer for Failing {
        fn name(&self) -> &str {
            "FAILING"
        }

        fn dependencies(&self) -> &[NodeType] {
            &[]
        }

        fn export(&self, _node: NodeId, _cx: &ExportContext<'_>) -> Option<String> {
            None
        }

        fn pattern(&self) -> &Regex {
            &self.pattern
        }

        fn replace(
            &self,
            _cx: &mut ImportContext<'_>,
            _placeholder: NodeId,
            _children: Vec<NodeId>,
            _captures: &Captures<'_>,
            _is_import: bool,
        ) -> Result<bool> {
            Err(EngineError::InvalidTree("boom".into()))
        }
    }

    #[test]
    fn test_failing_rule_degrades_to_paragraph() {
        let registry = Registry::builder()
            .push(Transformer::Element(Box::new(Failing {
                pattern: Regex::new(r"^!!").unwrap(),
            })))
            .named("HEADING")
            .unwrap()
            .build()
            .unwrap();
        let mut doc = Document::new();
        import_document("!! loud\n# ok", &mut doc, &registry, &ImportConfig::default());
        assert_eq!(
            doc.to_tree(),
            TreeNode::root(vec![
                paragraph("!! loud"),
                TreeNode::with_children(NodeKind::Heading { level: 1 }, vec![TreeNode::text("ok")]),
            ])
        );
    }
}
