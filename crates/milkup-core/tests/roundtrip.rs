// SPDX-License-Identifier: AGPL-3.0-or-later
//! Import/export round trips through the public API

use milkup_core::markdown::{ExportContext, ImportContext};
use milkup_core::{
    Document, ElementTransformer, ListKind, Markdown, NodeId, NodeKind, NodeType, Registry,
    TextFormat, Transformer, TreeNode,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use regex::{Captures, Regex};

const SAMPLE: &str = r#"# Milkup

Plain text with **bold**, *italic*, ~~gone~~ and `code`.
Second line with a [link](https://e.com "Title") and $x^2$.

> quoted
> lines

- one
    - nested
- two

3. third
4. fourth

- [ ] todo
- [x] done

| a | b |
| --- | --- |
| c | d |

---

```rust
fn main() {}
```

$$
e=mc^2
$$

![cat](https://e.com/cat.png =10x20)

[YOUTUBE_EMBED](https://www.youtube.com/watch?v=dQw4w9WgXcQ)"#;

#[test]
fn test_sample_document_is_canonical() {
    let md = Markdown::default();
    let doc = md.parse(SAMPLE);
    let types: Vec<_> = doc
        .children(doc.root())
        .iter()
        .map(|&node| doc.node_type(node))
        .collect();
    assert_eq!(
        types,
        [
            NodeType::Heading,
            NodeType::Paragraph,
            NodeType::Quote,
            NodeType::List,
            NodeType::List,
            NodeType::List,
            NodeType::Table,
            NodeType::HorizontalRule,
            NodeType::CodeBlock,
            NodeType::BlockEquation,
            NodeType::Image,
            NodeType::Embed,
        ]
    );
    assert_eq!(md.export(&doc), SAMPLE);
}

#[test]
fn test_tree_survives_json() {
    let md = Markdown::default();
    let tree = md.parse(SAMPLE).to_tree();
    let json = serde_json::to_string(&tree).unwrap();
    let back: TreeNode = serde_json::from_str(&json).unwrap();
    let doc = Document::from_tree(&back).unwrap();
    assert_eq!(md.export(&doc), SAMPLE);
}

#[test]
fn test_unterminated_equation_runs_to_end() {
    let md = Markdown::default();
    assert_eq!(
        md.parse("$$\nx\ny").to_tree(),
        TreeNode::root(vec![TreeNode::new(NodeKind::BlockEquation {
            source: "x\ny".into()
        })])
    );
}

#[test]
fn test_lone_dollar_is_literal() {
    let md = Markdown::default();
    let doc = md.parse("costs $5");
    assert_eq!(
        doc.to_tree(),
        TreeNode::root(vec![TreeNode::paragraph(vec![TreeNode::text("costs $5")])])
    );
    let exported = md.export(&doc);
    assert_eq!(exported, r"costs \$5");
    assert_eq!(md.parse(&exported).to_tree(), doc.to_tree());
}

/// Turns a run of three or more dashes into a horizontal rule
struct DashRun {
    pattern: Regex,
}

impl ElementTransformer for DashRun {
    fn name(&self) -> &str {
        "DASH_RUN"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::HorizontalRule]
    }

    fn export(&self, _node: NodeId, _cx: &ExportContext<'_>) -> Option<String> {
        None
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        _captures: &Captures<'_>,
        _is_import: bool,
    ) -> milkup_core::Result<bool> {
        let doc = cx.doc_mut();
        let rule = doc.create(NodeKind::HorizontalRule);
        doc.replace(placeholder, rule)?;
        Ok(true)
    }
}

fn dash_registry(dash_first: bool) -> Registry {
    let dash = Transformer::Element(Box::new(DashRun {
        pattern: Regex::new(r"^(?:-\s?){3,}$").unwrap(),
    }));
    let builder = Registry::builder();
    let builder = if dash_first {
        builder.push(dash).named("UNORDERED_LIST").unwrap()
    } else {
        builder.named("UNORDERED_LIST").unwrap().push(dash)
    };
    builder.build().unwrap()
}

#[test]
fn test_registration_order_decides_the_winner() {
    let text = "- - -";

    let dash_first = Markdown::new(dash_registry(true)).parse(text);
    assert_eq!(
        dash_first.to_tree(),
        TreeNode::root(vec![TreeNode::new(NodeKind::HorizontalRule)])
    );

    let list_first = Markdown::new(dash_registry(false)).parse(text);
    assert_eq!(
        list_first.to_tree(),
        TreeNode::root(vec![TreeNode::with_children(
            NodeKind::List {
                kind: ListKind::Bullet,
                depth: 0,
                start: 1
            },
            vec![TreeNode::with_children(
                NodeKind::ListItem { checked: None },
                vec![TreeNode::text("- -")]
            )]
        )])
    );
}

#[test]
fn test_canonical_form_renders_like_the_source() {
    let options = comrak::Options::default();
    let md = Markdown::default();
    let source = "Some __strong__ and _em_ text\n\n* one\n* two\n\n___";
    let exported = md.export(&md.parse(source));
    assert_eq!(exported, "Some **strong** and *em* text\n\n- one\n- two\n\n---");
    assert_eq!(
        comrak::markdown_to_html(&exported, &options),
        comrak::markdown_to_html(source, &options)
    );
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn format() -> impl Strategy<Value = TextFormat> {
    prop_oneof![
        Just(TextFormat::PLAIN),
        Just(TextFormat::BOLD),
        Just(TextFormat::ITALIC),
        Just(TextFormat::STRIKETHROUGH),
        Just(TextFormat::CODE),
    ]
}

/// Space-separated words, each with a single format
fn inline() -> impl Strategy<Value = Vec<TreeNode>> {
    prop::collection::vec((word(), format()), 1..5).prop_map(|words| {
        let mut nodes = Vec::new();
        for (index, (word, format)) in words.into_iter().enumerate() {
            if index > 0 {
                nodes.push(TreeNode::text(" "));
            }
            nodes.push(TreeNode::formatted(&word, format));
        }
        nodes
    })
}

/// Lines of inline content joined by line breaks
fn paragraph() -> impl Strategy<Value = TreeNode> {
    prop::collection::vec(inline(), 1..4).prop_map(|lines| {
        let mut nodes = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            if index > 0 {
                nodes.push(TreeNode::new(NodeKind::LineBreak));
            }
            nodes.extend(line);
        }
        TreeNode::paragraph(nodes)
    })
}

fn list() -> impl Strategy<Value = TreeNode> {
    let kind = prop_oneof![
        Just(ListKind::Bullet),
        Just(ListKind::Number),
        Just(ListKind::Check)
    ];
    let items = prop::collection::vec((inline(), any::<bool>()), 1..4);
    (kind, 1u32..10, items).prop_map(|(kind, start, items)| {
        let start = if kind == ListKind::Number { start } else { 1 };
        let children = items
            .into_iter()
            .map(|(children, done)| {
                let checked = (kind == ListKind::Check).then_some(done);
                TreeNode::with_children(NodeKind::ListItem { checked }, children)
            })
            .collect();
        TreeNode::with_children(
            NodeKind::List {
                kind,
                depth: 0,
                start,
            },
            children,
        )
    })
}

fn block() -> impl Strategy<Value = TreeNode> {
    prop_oneof![
        paragraph(),
        (1u8..=6, inline()).prop_map(|(level, children)| {
            TreeNode::with_children(NodeKind::Heading { level }, children)
        }),
        inline().prop_map(|children| TreeNode::with_children(NodeKind::Quote, children)),
        Just(TreeNode::new(NodeKind::HorizontalRule)),
        (
            prop::option::of("[a-z]{1,5}"),
            prop::collection::vec("[a-z]{1,10}", 1..4)
        )
            .prop_map(|(language, lines)| TreeNode::new(NodeKind::CodeBlock {
                language,
                code: lines.join("\n"),
            })),
        "[a-z+=]{1,10}".prop_map(|source| TreeNode::new(NodeKind::BlockEquation { source })),
        list(),
    ]
}

fn document() -> impl Strategy<Value = TreeNode> {
    prop::collection::vec(block(), 1..6).prop_map(TreeNode::root)
}

/// Merge adjacent text nodes that share a format
fn normalize(tree: TreeNode) -> TreeNode {
    let mut children: Vec<TreeNode> = Vec::new();
    for child in tree.children.into_iter().map(normalize) {
        if let Some(last) = children.last_mut() {
            if let (
                NodeKind::Text { content, format },
                NodeKind::Text {
                    content: next,
                    format: next_format,
                },
            ) = (&mut last.kind, &child.kind)
            {
                if *format == *next_format {
                    content.push_str(next);
                    continue;
                }
            }
        }
        children.push(child);
    }
    TreeNode::with_children(tree.kind, children)
}

#[test]
fn test_table_lookback_with_aligned_separator() {
    let md = Markdown::default();
    let doc = md.parse("| a | b |\n| c | d |\n| :--- | :--- |");
    let cell = |text: &str, header: bool| {
        TreeNode::with_children(NodeKind::TableCell { header }, vec![TreeNode::text(text)])
    };
    assert_eq!(
        doc.to_tree(),
        TreeNode::root(vec![TreeNode::with_children(
            NodeKind::Table,
            vec![
                TreeNode::with_children(NodeKind::TableRow, vec![cell("a", true), cell("b", true)]),
                TreeNode::with_children(NodeKind::TableRow, vec![cell("c", false), cell("d", false)]),
            ]
        )])
    );
    assert_eq!(md.export(&doc), "| a | b |\n| --- | --- |\n| c | d |");
}

proptest! {
    #[test]
    fn import_restores_the_exported_tree(tree in document()) {
        let md = Markdown::default();
        let exported = md.export(&Document::from_tree(&tree).unwrap());
        let imported = md.parse(&exported).to_tree();
        prop_assert_eq!(normalize(imported), normalize(tree));
    }

    #[test]
    fn export_is_stable_under_reimport(tree in document()) {
        let md = Markdown::default();
        let doc = Document::from_tree(&tree).unwrap();
        let first = md.export(&doc);
        let reparsed = md.parse(&first);
        prop_assert_eq!(md.export(&reparsed), first.clone());
        prop_assert_eq!(reparsed.children(reparsed.root()).len(), tree.children.len());
    }

    #[test]
    fn import_is_idempotent_after_one_pass(tree in document()) {
        let md = Markdown::default();
        let once = md.parse(&md.export(&Document::from_tree(&tree).unwrap()));
        let twice = md.parse(&md.export(&once));
        prop_assert_eq!(twice.to_tree(), once.to_tree());
    }

    #[test]
    fn arbitrary_ascii_never_panics(text in "[ -~\n]{0,120}") {
        let md = Markdown::default();
        let doc = md.parse(&text);
        let _ = md.export(&doc);
    }
}
