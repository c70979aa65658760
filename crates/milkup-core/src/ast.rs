// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document tree shared by the importer and the exporter
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Every node has at most one parent; children lists are the
//! only owning edges, parent links are back-pointers used for traversal.
//! Placement legality is checked by every mutation, so a `Table` can only
//! ever hold `TableRow`s and so on.

use crate::traits::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its document's arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inline formatting flags carried by text nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFormat {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl TextFormat {
    pub const PLAIN: Self = Self {
        bold: false,
        italic: false,
        strikethrough: false,
        code: false,
    };
    pub const BOLD: Self = Self {
        bold: true,
        ..Self::PLAIN
    };
    pub const ITALIC: Self = Self {
        italic: true,
        ..Self::PLAIN
    };
    pub const BOLD_ITALIC: Self = Self {
        bold: true,
        italic: true,
        ..Self::PLAIN
    };
    pub const STRIKETHROUGH: Self = Self {
        strikethrough: true,
        ..Self::PLAIN
    };
    pub const CODE: Self = Self {
        code: true,
        ..Self::PLAIN
    };

    /// Flags set in either operand
    pub const fn union(self, other: Self) -> Self {
        Self {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
        }
    }

    /// Flags set here but not in `other`
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bold: self.bold && !other.bold,
            italic: self.italic && !other.italic,
            strikethrough: self.strikethrough && !other.strikethrough,
            code: self.code && !other.code,
        }
    }

    /// True when every flag set in `other` is also set here
    pub const fn contains(self, other: Self) -> bool {
        (!other.bold || self.bold)
            && (!other.italic || self.italic)
            && (!other.strikethrough || self.strikethrough)
            && (!other.code || self.code)
    }

    pub const fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.strikethrough || self.code)
    }
}

/// Marker style of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Number,
    Check,
}

/// Provider of an embedded media block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedKind {
    /// Payload is the 11-character video id
    Youtube,
    /// Payload is the session id
    Panopto,
    /// Payload is the audio source URL
    Audio,
}

/// Explicit display size of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

fn default_list_start() -> u32 {
    1
}

/// A node and its attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Paragraph,
    /// Heading with level 1-6
    Heading {
        level: u8,
    },
    Quote,
    List {
        kind: ListKind,
        #[serde(default)]
        depth: usize,
        #[serde(default = "default_list_start")]
        start: u32,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    Table,
    TableRow,
    TableCell {
        #[serde(default)]
        header: bool,
    },
    HorizontalRule,
    Embed {
        kind: EmbedKind,
        payload: String,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<ImageSize>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    BlockEquation {
        source: String,
    },
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "TextFormat::is_plain")]
        format: TextFormat,
    },
    LineBreak,
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    InlineEquation {
        source: String,
    },
}

impl NodeKind {
    /// Plain text node with no formatting
    pub fn text(content: impl Into<String>) -> Self {
        NodeKind::Text {
            content: content.into(),
            format: TextFormat::PLAIN,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Root => NodeType::Root,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::Quote => NodeType::Quote,
            NodeKind::List { .. } => NodeType::List,
            NodeKind::ListItem { .. } => NodeType::ListItem,
            NodeKind::Table => NodeType::Table,
            NodeKind::TableRow => NodeType::TableRow,
            NodeKind::TableCell { .. } => NodeType::TableCell,
            NodeKind::HorizontalRule => NodeType::HorizontalRule,
            NodeKind::Embed { .. } => NodeType::Embed,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::BlockEquation { .. } => NodeType::BlockEquation,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::LineBreak => NodeType::LineBreak,
            NodeKind::Link { .. } => NodeType::Link,
            NodeKind::InlineEquation { .. } => NodeType::InlineEquation,
        }
    }
}

/// Attribute-free discriminant of [`NodeKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Paragraph,
    Heading,
    Quote,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    HorizontalRule,
    Embed,
    Image,
    CodeBlock,
    BlockEquation,
    Text,
    LineBreak,
    Link,
    InlineEquation,
}

impl NodeType {
    pub const ALL: [NodeType; 18] = [
        NodeType::Root,
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Quote,
        NodeType::List,
        NodeType::ListItem,
        NodeType::Table,
        NodeType::TableRow,
        NodeType::TableCell,
        NodeType::HorizontalRule,
        NodeType::Embed,
        NodeType::Image,
        NodeType::CodeBlock,
        NodeType::BlockEquation,
        NodeType::Text,
        NodeType::LineBreak,
        NodeType::Link,
        NodeType::InlineEquation,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Quote => "quote",
            NodeType::List => "list",
            NodeType::ListItem => "list_item",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableCell => "table_cell",
            NodeType::HorizontalRule => "horizontal_rule",
            NodeType::Embed => "embed",
            NodeType::Image => "image",
            NodeType::CodeBlock => "code_block",
            NodeType::BlockEquation => "block_equation",
            NodeType::Text => "text",
            NodeType::LineBreak => "line_break",
            NodeType::Link => "link",
            NodeType::InlineEquation => "inline_equation",
        }
    }

    pub const fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::Text | NodeType::LineBreak | NodeType::Link | NodeType::InlineEquation
        )
    }

    /// Nodes that may appear directly under the root
    pub const fn is_top_level(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::Quote
                | NodeType::List
                | NodeType::Table
                | NodeType::HorizontalRule
                | NodeType::Embed
                | NodeType::Image
                | NodeType::CodeBlock
                | NodeType::BlockEquation
        )
    }

    /// Placement rules enforced by every tree mutation
    pub const fn can_contain(self, child: NodeType) -> bool {
        match self {
            NodeType::Root => child.is_top_level(),
            NodeType::Paragraph | NodeType::Heading | NodeType::Quote | NodeType::TableCell => {
                child.is_inline()
            }
            NodeType::List => matches!(child, NodeType::ListItem),
            NodeType::ListItem => child.is_inline() || matches!(child, NodeType::List),
            NodeType::Table => matches!(child, NodeType::TableRow),
            NodeType::TableRow => matches!(child, NodeType::TableCell),
            NodeType::Link => matches!(child, NodeType::Text | NodeType::LineBreak),
            _ => false,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        NodeType::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| EngineError::UnknownNodeType(s.to_string()))
    }
}

/// Advisory cursor position; the engine never reads it back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub node: NodeId,
    /// Byte offset inside a text node, child index inside an element
    pub offset: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree
///
/// Accessors taking a [`NodeId`] panic when handed an id minted by a
/// different document.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    root: NodeId,
    selection: Option<Selection>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only a root
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            selection: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, content: impl Into<String>, format: TextFormat) -> NodeId {
        self.create(NodeKind::Text {
            content: content.into(),
            format,
        })
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slots[id.0].kind
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.kind(id).node_type()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .map(|prev| self.children(parent)[prev])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// True when the node can be reached from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn check_exists(&self, id: NodeId) -> Result<()> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            Err(EngineError::UnknownNode(id))
        }
    }

    fn check_placement(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_exists(parent)?;
        self.check_exists(child)?;
        if child == self.root {
            return Err(EngineError::RootImmovable);
        }
        let (parent_type, child_type) = (self.node_type(parent), self.node_type(child));
        if !parent_type.can_contain(child_type) {
            return Err(EngineError::IllegalChild {
                parent: parent_type,
                child: child_type,
            });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(EngineError::Cycle(child));
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id.0].parent.take() {
            self.slots[parent.0].children.retain(|&child| child != id);
        }
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, node: NodeId) {
        self.slots[parent.0].children.insert(index, node);
        self.slots[node.0].parent = Some(parent);
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_placement(parent, child)?;
        self.detach(child);
        let end = self.children(parent).len();
        self.insert_at(parent, end, child);
        Ok(())
    }

    pub fn append_all(
        &mut self,
        parent: NodeId,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<()> {
        children
            .into_iter()
            .try_for_each(|child| self.append(parent, child))
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> Result<()> {
        let parent = self.parent(sibling).ok_or(EngineError::Detached(sibling))?;
        self.check_placement(parent, node)?;
        self.detach(node);
        let index = self.index_in_parent(sibling).unwrap_or(0);
        self.insert_at(parent, index, node);
        Ok(())
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<()> {
        let parent = self.parent(sibling).ok_or(EngineError::Detached(sibling))?;
        self.check_placement(parent, node)?;
        self.detach(node);
        let index = self.index_in_parent(sibling).map_or(0, |i| i + 1);
        self.insert_at(parent, index, node);
        Ok(())
    }

    /// Put `new` where `old` is; `old` ends up detached with its subtree intact
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let parent = self.parent(old).ok_or(EngineError::Detached(old))?;
        self.check_placement(parent, new)?;
        self.detach(new);
        let index = self
            .index_in_parent(old)
            .ok_or(EngineError::Detached(old))?;
        self.slots[parent.0].children[index] = new;
        self.slots[new.0].parent = Some(parent);
        self.slots[old.0].parent = None;
        Ok(())
    }

    /// Put `nodes` where `old` is, in order; `old` ends up detached
    ///
    /// Every placement is checked before anything moves.
    pub fn replace_with(&mut self, old: NodeId, nodes: Vec<NodeId>) -> Result<()> {
        let parent = self.parent(old).ok_or(EngineError::Detached(old))?;
        if nodes.contains(&old) {
            return Err(EngineError::InvalidTree(format!("{old} cannot replace itself")));
        }
        for &node in &nodes {
            self.check_placement(parent, node)?;
        }
        for &node in &nodes {
            self.detach(node);
            self.slots[node.0].parent = Some(parent);
        }
        let index = self
            .index_in_parent(old)
            .ok_or(EngineError::Detached(old))?;
        self.slots[old.0].parent = None;
        let children = &mut self.slots[parent.0].children;
        let tail = children.split_off(index + 1);
        children.pop();
        children.extend(nodes);
        children.extend(tail);
        Ok(())
    }

    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        self.check_exists(node)?;
        if node == self.root {
            return Err(EngineError::RootImmovable);
        }
        self.detach(node);
        Ok(())
    }

    /// Detach every child of `node`
    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.slots[node.0].children);
        for child in children {
            self.slots[child.0].parent = None;
        }
    }

    /// Split a text node at a byte offset
    ///
    /// The original node keeps the text before `offset`; a new node with the
    /// same format holds the rest and is inserted right after it when the
    /// original is attached.
    pub fn split_text(&mut self, text: NodeId, offset: usize) -> Result<(NodeId, NodeId)> {
        self.check_exists(text)?;
        let (content, format) = match self.kind(text) {
            NodeKind::Text { content, format } => (content.clone(), *format),
            _ => return Err(EngineError::NotText(text)),
        };
        if offset > content.len() || !content.is_char_boundary(offset) {
            return Err(EngineError::InvalidOffset {
                offset,
                len: content.len(),
            });
        }
        let after = self.create_text(&content[offset..], format);
        self.set_text(text, &content[..offset])?;
        if self.parent(text).is_some() {
            self.insert_after(text, after)?;
        }
        Ok((text, after))
    }

    pub fn set_text(&mut self, text: NodeId, value: impl Into<String>) -> Result<()> {
        self.check_exists(text)?;
        match &mut self.slots[text.0].kind {
            NodeKind::Text { content, .. } => {
                *content = value.into();
                Ok(())
            }
            _ => Err(EngineError::NotText(text)),
        }
    }

    pub fn set_format(&mut self, text: NodeId, value: TextFormat) -> Result<()> {
        self.check_exists(text)?;
        match &mut self.slots[text.0].kind {
            NodeKind::Text { format, .. } => {
                *format = value;
                Ok(())
            }
            _ => Err(EngineError::NotText(text)),
        }
    }

    /// Text of a subtree; block children are separated by newlines
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text { content, .. } => out.push_str(content),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::InlineEquation { source } | NodeKind::BlockEquation { source } => {
                out.push_str(source)
            }
            NodeKind::CodeBlock { code, .. } => out.push_str(code),
            _ => {
                for &child in self.children(id) {
                    if !self.node_type(child).is_inline() && !out.is_empty() {
                        out.push('\n');
                    }
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Preorder walk of a subtree, including `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Count words in the document
    pub fn word_count(&self) -> usize {
        self.text_content(self.root).unicode_words().count()
    }

    /// Count user-perceived characters, line breaks excluded
    pub fn char_count(&self) -> usize {
        self.text_content(self.root)
            .graphemes(true)
            .filter(|g| *g != "\n")
            .count()
    }

    /// Owned copy of a subtree without node identities
    pub fn snapshot(&self, id: NodeId) -> TreeNode {
        TreeNode {
            kind: self.kind(id).clone(),
            children: self
                .children(id)
                .iter()
                .map(|&child| self.snapshot(child))
                .collect(),
        }
    }

    pub fn to_tree(&self) -> TreeNode {
        self.snapshot(self.root)
    }

    /// Build a document from a snapshot whose top node is a root
    pub fn from_tree(tree: &TreeNode) -> Result<Self> {
        if tree.kind != NodeKind::Root {
            return Err(EngineError::InvalidTree(format!(
                "top node must be a root, found {}",
                tree.kind.node_type()
            )));
        }
        let mut doc = Self::new();
        let root = doc.root;
        for child in &tree.children {
            let id = doc.build(child)?;
            doc.append(root, id)?;
        }
        Ok(doc)
    }

    /// Materialize a snapshot as a detached subtree
    pub fn build(&mut self, tree: &TreeNode) -> Result<NodeId> {
        if tree.kind == NodeKind::Root {
            return Err(EngineError::RootImmovable);
        }
        let id = self.create(tree.kind.clone());
        for child in &tree.children {
            let child_id = self.build(child)?;
            self.append(id, child_id)?;
        }
        Ok(id)
    }
}

/// Owned, identity-free tree used for comparison and serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<TreeNode>) -> Self {
        Self { kind, children }
    }

    pub fn root(children: Vec<TreeNode>) -> Self {
        Self::with_children(NodeKind::Root, children)
    }

    pub fn paragraph(children: Vec<TreeNode>) -> Self {
        Self::with_children(NodeKind::Paragraph, children)
    }

    pub fn text(content: &str) -> Self {
        Self::new(NodeKind::text(content))
    }

    pub fn formatted(content: &str, format: TextFormat) -> Self {
        Self::new(NodeKind::Text {
            content: content.to_string(),
            format,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn format_strategy() -> impl Strategy<Value = TextFormat> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(bold, italic, strikethrough, code)| TextFormat {
                bold,
                italic,
                strikethrough,
                code,
            },
        )
    }

    fn inline_strategy() -> impl Strategy<Value = TreeNode> {
        prop_oneof![
            ("[a-zA-Z0-9 ]{1,20}", format_strategy())
                .prop_map(|(content, format)| TreeNode::formatted(&content, format)),
            Just(TreeNode::new(NodeKind::LineBreak)),
            "[a-z+=^]{1,10}".prop_map(|source| TreeNode::new(NodeKind::InlineEquation { source })),
        ]
    }

    fn block_strategy() -> impl Strategy<Value = TreeNode> {
        prop_oneof![
            prop::collection::vec(inline_strategy(), 0..5).prop_map(TreeNode::paragraph),
            (1u8..=6, prop::collection::vec(inline_strategy(), 0..3)).prop_map(
                |(level, children)| TreeNode::with_children(NodeKind::Heading { level }, children)
            ),
            Just(TreeNode::new(NodeKind::HorizontalRule)),
            "[a-z]{0,12}".prop_map(|code| TreeNode::new(NodeKind::CodeBlock {
                language: None,
                code
            })),
        ]
    }

    proptest! {
        #[test]
        fn snapshot_roundtrip(blocks in prop::collection::vec(block_strategy(), 0..8)) {
            let tree = TreeNode::root(blocks);
            let doc = Document::from_tree(&tree).unwrap();
            prop_assert_eq!(doc.to_tree(), tree);
        }

        #[test]
        fn tree_json_roundtrip(blocks in prop::collection::vec(block_strategy(), 0..8)) {
            let tree = TreeNode::root(blocks);
            let json = serde_json::to_string(&tree).unwrap();
            let back: TreeNode = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, tree);
        }

        #[test]
        fn every_node_has_one_parent(blocks in prop::collection::vec(block_strategy(), 0..8)) {
            let doc = Document::from_tree(&TreeNode::root(blocks)).unwrap();
            for id in doc.descendants(doc.root()) {
                for &child in doc.children(id) {
                    prop_assert_eq!(doc.parent(child), Some(id));
                }
            }
        }
    }
}
