// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transformer traits, configuration and the engine error type

use crate::ast::{Document, NodeId, NodeType, TextFormat};
use crate::markdown::{ExportContext, ImportContext};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Error type for tree mutation and registry construction
///
/// Import and export passes never surface these; they only come back from
/// direct use of the tree API or from building a registry.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("transformer `{transformer}` depends on node type `{node}`, which the host has not registered")]
    MissingDependency { transformer: String, node: NodeType },

    #[error("a `{parent}` node cannot contain a `{child}` node")]
    IllegalChild { parent: NodeType, child: NodeType },

    #[error("moving node {0} there would make it its own ancestor")]
    Cycle(NodeId),

    #[error("the root node cannot be moved or removed")]
    RootImmovable,

    #[error("node {0} has no parent")]
    Detached(NodeId),

    #[error("node {0} does not belong to this document")]
    UnknownNode(NodeId),

    #[error("node {0} is not a text node")]
    NotText(NodeId),

    #[error("offset {offset} is not a character boundary in text of {len} bytes")]
    InvalidOffset { offset: usize, len: usize },

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("unknown transformer `{0}`")]
    UnknownTransformer(String),

    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Configuration for importing Markdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Join consecutive paragraph lines into one paragraph with line breaks
    pub merge_adjacent_lines: bool,
    /// Number of leading spaces that make one list nesting level
    pub list_indent_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            merge_adjacent_lines: true,
            list_indent_size: 4,
        }
    }
}

/// Configuration for exporting Markdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Spaces written per list nesting level
    pub list_indent_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            list_indent_size: 4,
        }
    }
}

/// Rule mapping one block node to and from a single line
pub trait ElementTransformer: Send + Sync {
    fn name(&self) -> &str;

    /// Node types that must be registered by the host
    fn dependencies(&self) -> &[NodeType];

    /// Render `node`, or `None` when this rule does not apply to it
    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String>;

    /// Pattern tested against a whole line
    fn pattern(&self) -> &Regex;

    /// Build the node for a matched line
    ///
    /// `placeholder` is the paragraph created for the line (or typed into);
    /// `children` are the nodes left after the matched prefix was removed.
    /// Returns `Ok(false)` when the rule declines the line.
    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        children: Vec<NodeId>,
        captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool>;
}

/// Closing pattern of a multi-line block
#[derive(Debug, Clone)]
pub struct EndPattern {
    pub regex: Regex,
    /// Accept the block even if the closing line never shows up
    pub optional: bool,
}

/// Rule mapping one block node to and from a run of lines
pub trait MultilineElementTransformer: Send + Sync {
    fn name(&self) -> &str;

    fn dependencies(&self) -> &[NodeType];

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String>;

    fn pattern_start(&self) -> &Regex;

    /// `None` behaves like an optional end that never matches
    fn pattern_end(&self) -> Option<&EndPattern>;

    /// Build the node for an accumulated block
    ///
    /// On import `children` is `None` and `lines` holds the text between the
    /// start and end markers. While typing, `root` is the paragraph the
    /// start marker was typed into and `children` are its remaining nodes.
    #[allow(clippy::too_many_arguments)]
    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        root: NodeId,
        children: Option<Vec<NodeId>>,
        start: &Captures<'_>,
        end: Option<&Captures<'_>>,
        lines: Option<&[&str]>,
        is_import: bool,
    ) -> Result<bool>;
}

/// Rule mapping one inline node to and from a substring of a text run
pub trait TextMatchTransformer: Send + Sync {
    fn name(&self) -> &str;

    fn dependencies(&self) -> &[NodeType];

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String>;

    /// Unanchored pattern used by rules without a trigger
    fn import_pattern(&self) -> &Regex;

    /// Pattern anchored at the end of the scanned window
    fn pattern(&self) -> &Regex;

    /// Character whose appearance makes the scanner test [`Self::pattern`]
    fn trigger(&self) -> Option<char>;

    /// Character escaped in plain text so it cannot start this construct
    fn escape_char(&self) -> Option<char> {
        self.trigger()
    }

    /// Swap the matched text node for the inline node it describes
    ///
    /// During import `text` is the only child of a detached node of the
    /// same kind as its final parent.
    fn replace(&self, doc: &mut Document, text: NodeId, captures: &Captures<'_>) -> Result<()>;
}

/// Emphasis marker such as `**` or `~~`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFormatTransformer {
    pub name: &'static str,
    pub tag: &'static str,
    pub format: TextFormat,
    /// Whether the marker may sit between two alphanumeric characters
    pub intraword: bool,
}

impl TextFormatTransformer {
    pub const fn new(name: &'static str, tag: &'static str, format: TextFormat) -> Self {
        Self {
            name,
            tag,
            format,
            intraword: true,
        }
    }

    pub const fn word_bound(mut self) -> Self {
        self.intraword = false;
        self
    }

    /// Inline code spans are opaque and take no nested markers
    pub fn is_code(&self) -> bool {
        self.format.code
    }

    const DEPENDENCIES: [NodeType; 1] = [NodeType::Text];
}

/// Discriminant of [`Transformer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformerKind {
    Element,
    MultilineElement,
    TextMatch,
    TextFormat,
}

impl TransformerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransformerKind::Element => "element",
            TransformerKind::MultilineElement => "multiline-element",
            TransformerKind::TextMatch => "text-match",
            TransformerKind::TextFormat => "text-format",
        }
    }
}

/// One entry of the ordered registry
pub enum Transformer {
    Element(Box<dyn ElementTransformer>),
    MultilineElement(Box<dyn MultilineElementTransformer>),
    TextMatch(Box<dyn TextMatchTransformer>),
    TextFormat(TextFormatTransformer),
}

impl Transformer {
    pub fn name(&self) -> &str {
        match self {
            Transformer::Element(t) => t.name(),
            Transformer::MultilineElement(t) => t.name(),
            Transformer::TextMatch(t) => t.name(),
            Transformer::TextFormat(t) => t.name,
        }
    }

    pub fn kind(&self) -> TransformerKind {
        match self {
            Transformer::Element(_) => TransformerKind::Element,
            Transformer::MultilineElement(_) => TransformerKind::MultilineElement,
            Transformer::TextMatch(_) => TransformerKind::TextMatch,
            Transformer::TextFormat(_) => TransformerKind::TextFormat,
        }
    }

    pub fn dependencies(&self) -> &[NodeType] {
        match self {
            Transformer::Element(t) => t.dependencies(),
            Transformer::MultilineElement(t) => t.dependencies(),
            Transformer::TextMatch(t) => t.dependencies(),
            Transformer::TextFormat(_) => &TextFormatTransformer::DEPENDENCIES,
        }
    }

    /// Trigger character of a text-match rule
    pub fn trigger(&self) -> Option<char> {
        match self {
            Transformer::TextMatch(t) => t.trigger(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
