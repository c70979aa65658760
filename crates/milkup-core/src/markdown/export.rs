// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tree to Markdown
//!
//! Blocks go through the registry first and fall back to built-in renderers.
//! Inline runs are written with a format stack so adjacent text sharing a
//! format is wrapped once.

use crate::ast::{Document, ListKind, NodeId, NodeKind, NodeType, TextFormat};
use crate::registry::Registry;
use crate::traits::{ExportConfig, TextFormatTransformer, Transformer};

/// Render a whole document
pub fn export_document(doc: &Document, registry: &Registry, config: &ExportConfig) -> String {
    let cx = ExportContext::new(doc, registry, config);
    let out = cx.export_blocks(doc.root());
    tracing::debug!(bytes = out.len(), "document exported");
    out
}

/// Read-only view handed to transformer exporters
pub struct ExportContext<'a> {
    doc: &'a Document,
    registry: &'a Registry,
    config: &'a ExportConfig,
    escapes: Vec<char>,
}

impl<'a> ExportContext<'a> {
    pub fn new(doc: &'a Document, registry: &'a Registry, config: &'a ExportConfig) -> Self {
        let mut escapes = vec!['\\'];
        escapes.extend(registry.text_formats().filter_map(|t| t.tag.chars().next()));
        escapes.extend(registry.text_matches().filter_map(|t| t.escape_char()));
        escapes.sort_unstable();
        escapes.dedup();
        Self {
            doc,
            registry,
            config,
            escapes,
        }
    }

    pub fn doc(&self) -> &'a Document {
        self.doc
    }

    pub fn config(&self) -> &'a ExportConfig {
        self.config
    }

    /// Render the block children of `parent`, separated by blank lines
    pub fn export_blocks(&self, parent: NodeId) -> String {
        self.doc
            .children(parent)
            .iter()
            .map(|&child| self.export_block(child))
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render one block: first claiming transformer, else the built-in renderer
    pub fn export_block(&self, node: NodeId) -> String {
        for transformer in self.registry.iter() {
            let rendered = match transformer {
                Transformer::Element(t) => t.export(node, self),
                Transformer::MultilineElement(t) => t.export(node, self),
                _ => None,
            };
            if let Some(rendered) = rendered {
                tracing::trace!(transformer = transformer.name(), %node, "block claimed");
                return rendered;
            }
        }
        match self.doc.kind(node) {
            NodeKind::Paragraph => self.render_paragraph(node),
            NodeKind::Heading { level } => self.render_heading(node, *level),
            NodeKind::Quote => self.render_quote(node),
            NodeKind::List { .. } => self.render_list(node),
            NodeKind::Table => self.render_table(node),
            _ => {
                tracing::debug!(%node, kind = %self.doc.node_type(node), "no exporter; writing text content");
                self.doc.text_content(node)
            }
        }
    }

    /// Blank lines would end the paragraph on re-import, so they are dropped
    pub fn render_paragraph(&self, node: NodeId) -> String {
        self.export_children(node)
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.guard_block_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_heading(&self, node: NodeId, level: u8) -> String {
        format!(
            "{} {}",
            "#".repeat(usize::from(level.clamp(1, 6))),
            self.export_line(self.doc.children(node))
        )
    }

    pub fn render_quote(&self, node: NodeId) -> String {
        self.export_children(node)
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Items one per line, nested lists indented by depth
    pub fn render_list(&self, node: NodeId) -> String {
        let mut lines = Vec::new();
        self.list_lines(node, 0, &mut lines);
        lines.join("\n")
    }

    fn list_lines(&self, list: NodeId, depth: usize, lines: &mut Vec<String>) {
        let NodeKind::List { kind, start, .. } = self.doc.kind(list) else {
            return;
        };
        let indent = " ".repeat(depth * self.config.list_indent_size);
        let mut number = *start;
        for &item in self.doc.children(list) {
            let (nested, inline): (Vec<NodeId>, Vec<NodeId>) = self
                .doc
                .children(item)
                .iter()
                .copied()
                .partition(|&child| self.doc.node_type(child) == NodeType::List);
            if !inline.is_empty() || nested.is_empty() {
                let marker = match (kind, self.doc.kind(item)) {
                    (ListKind::Bullet, _) => "- ".to_string(),
                    (ListKind::Number, _) => format!("{number}. "),
                    (ListKind::Check, NodeKind::ListItem { checked: Some(true) }) => {
                        "- [x] ".to_string()
                    }
                    (ListKind::Check, _) => "- [ ] ".to_string(),
                };
                lines.push(format!("{indent}{marker}{}", self.export_line(&inline)));
                number = number.saturating_add(1);
            }
            for child in nested {
                self.list_lines(child, depth + 1, lines);
            }
        }
    }

    /// Pipe rows with a separator under every all-header row
    pub fn render_table(&self, node: NodeId) -> String {
        let mut lines = Vec::new();
        for &row in self.doc.children(node) {
            let cells = self.doc.children(row);
            let texts: Vec<String> = cells
                .iter()
                .map(|&cell| self.export_line(self.doc.children(cell)).replace('|', "\\|"))
                .collect();
            lines.push(format!("| {} |", texts.join(" | ")));
            let header = !cells.is_empty()
                && cells.iter().all(|&cell| {
                    matches!(self.doc.kind(cell), NodeKind::TableCell { header: true })
                });
            if header {
                lines.push(format!("| {} |", vec!["---"; cells.len()].join(" | ")));
            }
        }
        lines.join("\n")
    }

    /// Inline rendering of a node's children
    pub fn export_children(&self, node: NodeId) -> String {
        self.export_inline(self.doc.children(node))
    }

    /// Inline rendering for single-line blocks; line breaks become spaces
    pub fn export_line(&self, nodes: &[NodeId]) -> String {
        self.export_inline(nodes).replace('\n', " ")
    }

    /// Left-to-right inline rendering with a format stack
    pub fn export_inline(&self, nodes: &[NodeId]) -> String {
        let mut out = String::new();
        let mut stack = FormatStack::default();
        for run in self.runs(nodes) {
            match run {
                Run::Text { content, format } => {
                    let (lead, core, trail) = if format.code {
                        ("", content.as_str(), "")
                    } else {
                        split_edges(&content)
                    };
                    let format = if core.is_empty() {
                        TextFormat::PLAIN
                    } else {
                        format
                    };
                    let tags = self.tags_for(format);
                    stack.transition(&tags, &mut out);
                    out.push_str(lead);
                    stack.open_missing(&tags, &mut out);
                    if format.code {
                        out.push_str(core);
                    } else {
                        out.push_str(&self.escape(core));
                    }
                    stack.pending.push_str(trail);
                }
                Run::Node(node) => {
                    stack.close_all(&mut out);
                    match self.doc.kind(node) {
                        NodeKind::LineBreak => out.push('\n'),
                        _ => out.push_str(&self.export_text_match(node).unwrap_or_default()),
                    }
                }
            }
        }
        stack.close_all(&mut out);
        out
    }

    /// Wrap already-rendered `content` in the format markers of a text node
    pub fn export_format(&self, text: NodeId, content: &str) -> String {
        let NodeKind::Text { format, .. } = self.doc.kind(text) else {
            return content.to_string();
        };
        let tags = self.tags_for(*format);
        let mut out = String::new();
        for tag in &tags {
            out.push_str(tag.tag);
        }
        out.push_str(content);
        for tag in tags.iter().rev() {
            out.push_str(tag.tag);
        }
        out
    }

    /// Backslash every character that could start markup on re-import
    pub fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if self.escapes.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    fn export_text_match(&self, node: NodeId) -> Option<String> {
        let rendered = self
            .registry
            .text_matches()
            .find_map(|t| t.export(node, self));
        if rendered.is_none() {
            tracing::debug!(%node, kind = %self.doc.node_type(node), "inline node dropped; no exporter");
        }
        rendered
    }

    fn runs(&self, nodes: &[NodeId]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for &node in nodes {
            match self.doc.kind(node) {
                NodeKind::Text { content, format } => match runs.last_mut() {
                    Some(Run::Text {
                        content: merged,
                        format: last,
                    }) if last == format => merged.push_str(content),
                    _ => runs.push(Run::Text {
                        content: content.clone(),
                        format: *format,
                    }),
                },
                _ => runs.push(Run::Node(node)),
            }
        }
        runs
    }

    /// Markers covering `format`, code always innermost
    fn tags_for(&self, format: TextFormat) -> Vec<&'a TextFormatTransformer> {
        let mut remaining = format.difference(TextFormat::CODE);
        let mut tags = Vec::new();
        for rule in self.registry.text_formats() {
            if rule.is_code() || rule.format.is_plain() {
                continue;
            }
            if remaining.contains(rule.format) {
                remaining = remaining.difference(rule.format);
                tags.push(rule);
            }
        }
        if format.code {
            tags.extend(self.registry.text_formats().find(|rule| rule.is_code()));
        }
        tags
    }

    /// Would some block rule claim this paragraph line on re-import?
    fn claims_line(&self, line: &str) -> bool {
        self.registry
            .multiline_elements()
            .any(|t| t.pattern_start().is_match(line))
            || self.registry.elements().any(|t| t.pattern().is_match(line))
    }

    /// Escape leading punctuation until no block rule matches the line
    fn guard_block_line(&self, line: &str) -> String {
        let mut line = line.to_string();
        let mut from = 0;
        while self.claims_line(&line) {
            let Some(at) = line[from..]
                .char_indices()
                .find(|(_, c)| c.is_ascii_punctuation())
                .map(|(i, _)| from + i)
            else {
                break;
            };
            if line[at..].starts_with('\\') {
                let skipped = line[at + 1..].chars().next().map_or(0, char::len_utf8);
                from = at + 1 + skipped;
                continue;
            }
            line.insert(at, '\\');
            from = at + 2;
        }
        line
    }
}

enum Run {
    Text { content: String, format: TextFormat },
    Node(NodeId),
}

/// Open markers, outermost first, plus whitespace held back until the
/// next transition so it lands outside closing markers
#[derive(Default)]
struct FormatStack<'r> {
    open: Vec<&'r TextFormatTransformer>,
    pending: String,
}

impl<'r> FormatStack<'r> {
    /// Close what the next run does not share, then flush held whitespace
    fn transition(&mut self, tags: &[&'r TextFormatTransformer], out: &mut String) {
        let mut keep = self
            .open
            .iter()
            .take_while(|&&open| tags.contains(&open))
            .count();
        loop {
            let opening: Vec<&TextFormatTransformer> = tags
                .iter()
                .copied()
                .filter(|tag| !self.open[..keep].contains(tag))
                .collect();
            if opening.is_empty() {
                break;
            }
            let conflict = self.open[..keep].iter().position(|open| {
                open.is_code()
                    || opening
                        .iter()
                        .any(|tag| shares_marker(open.tag, tag.tag))
            });
            match conflict {
                Some(position) => keep = position,
                None => break,
            }
        }
        while self.open.len() > keep {
            if let Some(tag) = self.open.pop() {
                out.push_str(tag.tag);
            }
        }
        out.push_str(&std::mem::take(&mut self.pending));
    }

    fn open_missing(&mut self, tags: &[&'r TextFormatTransformer], out: &mut String) {
        for &tag in tags {
            if !self.open.contains(&tag) {
                out.push_str(tag.tag);
                self.open.push(tag);
            }
        }
    }

    fn close_all(&mut self, out: &mut String) {
        while let Some(tag) = self.open.pop() {
            out.push_str(tag.tag);
        }
        out.push_str(&std::mem::take(&mut self.pending));
    }
}

fn shares_marker(a: &str, b: &str) -> bool {
    a.chars().any(|c| b.contains(c))
}

/// Split off leading and trailing whitespace
fn split_edges(text: &str) -> (&str, &str, &str) {
    let core_start = text.len() - text.trim_start().len();
    let core_end = text.trim_end().len().max(core_start);
    (
        &text[..core_start],
        &text[core_start..core_end],
        &text[core_end..],
    )
}
