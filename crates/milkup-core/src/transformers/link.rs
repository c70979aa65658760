// SPDX-License-Identifier: AGPL-3.0-or-later
//! `[label](url "title")` links and `<url>` autolinks

use crate::ast::{Document, NodeId, NodeKind, NodeType, TextFormat};
use crate::markdown::{unescape, ExportContext};
use crate::traits::{Result, TextMatchTransformer};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static LINK_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\[\]]+)\]\(([^()\s]+)(?:\s"((?:[^"]*\\")*[^"]*)"\s*)?\)"#).unwrap()
});
static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\[\]]+)\]\(([^()\s]+)(?:\s"((?:[^"]*\\")*[^"]*)"\s*)?\)$"#).unwrap()
});
static AUTO_LINK_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?:([^()\s]+)(?:\s"((?:[^"]*\\")*[^"]*)"\s*)?)>"#).unwrap());
static AUTO_LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?:([^()\s]+)(?:\s"((?:[^"]*\\")*[^"]*)"\s*)?)>$"#).unwrap());

fn format_of(doc: &Document, text: NodeId) -> TextFormat {
    match doc.kind(text) {
        NodeKind::Text { format, .. } => *format,
        _ => TextFormat::PLAIN,
    }
}

fn title_of(captures: &Captures<'_>, group: usize) -> Option<String> {
    captures.get(group).map(|m| m.as_str().replace("\\\"", "\""))
}

/// Swap `text` for a link holding one text child
fn link_text(
    doc: &mut Document,
    text: NodeId,
    url: &str,
    title: Option<String>,
    label: String,
) -> Result<()> {
    let format = format_of(doc, text);
    let link = doc.create(NodeKind::Link {
        url: url.to_string(),
        title,
    });
    let child = doc.create_text(label, format);
    doc.append(link, child)?;
    doc.replace(text, link)
}

/// Render a link node, wrapped in the format of its only text child
fn render_link(node: NodeId, cx: &ExportContext<'_>, allow_short: bool) -> Option<String> {
    let doc = cx.doc();
    let NodeKind::Link { url, title } = doc.kind(node) else {
        return None;
    };
    let label = doc.text_content(node);
    let quoted = title
        .as_deref()
        .map(|title| format!(" \"{}\"", title.replace('"', "\\\"")))
        .unwrap_or_default();
    let content = if allow_short && label == *url {
        format!("<{url}{quoted}>")
    } else {
        format!("[{}]({url}{quoted})", cx.escape(&label))
    };
    Some(match doc.children(node) {
        [only] if doc.node_type(*only) == NodeType::Text => cx.export_format(*only, &content),
        _ => content,
    })
}

/// `[label](url "title")`, fired by `)`
pub struct Link;

impl TextMatchTransformer for Link {
    fn name(&self) -> &str {
        "LINK"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Link]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        render_link(node, cx, false)
    }

    fn import_pattern(&self) -> &Regex {
        &LINK_IMPORT
    }

    fn pattern(&self) -> &Regex {
        &LINK_PATTERN
    }

    fn trigger(&self) -> Option<char> {
        Some(')')
    }

    fn escape_char(&self) -> Option<char> {
        Some('[')
    }

    fn replace(&self, doc: &mut Document, text: NodeId, captures: &Captures<'_>) -> Result<()> {
        let label = unescape(captures.get(1).map_or("", |m| m.as_str()));
        let url = captures.get(2).map_or("", |m| m.as_str());
        link_text(doc, text, url, title_of(captures, 3), label)
    }
}

/// `<url>` or `<url "title">`, fired by `>`
pub struct AutoLink;

impl TextMatchTransformer for AutoLink {
    fn name(&self) -> &str {
        "AUTO_LINK"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Link]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        render_link(node, cx, true)
    }

    fn import_pattern(&self) -> &Regex {
        &AUTO_LINK_IMPORT
    }

    fn pattern(&self) -> &Regex {
        &AUTO_LINK_PATTERN
    }

    fn trigger(&self) -> Option<char> {
        Some('>')
    }

    fn escape_char(&self) -> Option<char> {
        Some('<')
    }

    fn replace(&self, doc: &mut Document, text: NodeId, captures: &Captures<'_>) -> Result<()> {
        let url = captures.get(1).map_or("", |m| m.as_str());
        link_text(doc, text, url, title_of(captures, 2), url.to_string())
    }
}
