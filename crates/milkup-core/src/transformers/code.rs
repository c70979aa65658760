// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fenced code blocks

use crate::ast::{NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{EndPattern, MultilineElementTransformer, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static START_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*```([\w+-]*)").unwrap());
static END_PATTERN: Lazy<EndPattern> = Lazy::new(|| EndPattern {
    regex: Regex::new(r"[ \t]*```$").unwrap(),
    optional: false,
});

pub struct Code;

impl MultilineElementTransformer for Code {
    fn name(&self) -> &str {
        "CODE"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::CodeBlock]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        match cx.doc().kind(node) {
            NodeKind::CodeBlock { language, code } => Some(format!(
                "```{}\n{}\n```",
                language.as_deref().unwrap_or_default(),
                code
            )),
            _ => None,
        }
    }

    fn pattern_start(&self) -> &Regex {
        &START_PATTERN
    }

    fn pattern_end(&self) -> Option<&EndPattern> {
        Some(&*END_PATTERN)
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        root: NodeId,
        children: Option<Vec<NodeId>>,
        start: &Captures<'_>,
        _end: Option<&Captures<'_>>,
        lines: Option<&[&str]>,
        _is_import: bool,
    ) -> Result<bool> {
        let language = start
            .get(1)
            .map(|m| m.as_str())
            .filter(|language| !language.is_empty())
            .map(str::to_string);
        let doc = cx.doc_mut();
        let code = match (lines, children) {
            (Some(lines), _) => code_body(lines),
            (None, Some(children)) => children
                .iter()
                .map(|&child| doc.text_content(child))
                .collect(),
            (None, None) => String::new(),
        };
        let block = doc.create(NodeKind::CodeBlock { language, code });
        doc.replace(root, block)?;
        Ok(true)
    }
}

/// Join the fenced lines, dropping the blank line the fences leave at each end
fn code_body(lines: &[&str]) -> String {
    let mut lines = lines;
    if lines.len() >= 2 {
        if lines[0].trim().is_empty() {
            lines = &lines[1..];
        }
        if lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines = &lines[..lines.len() - 1];
        }
    } else if lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines = &[];
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TreeNode;
    use crate::markdown::Markdown;
    use pretty_assertions::assert_eq;

    fn code(language: Option<&str>, code: &str) -> TreeNode {
        TreeNode::new(NodeKind::CodeBlock {
            language: language.map(str::to_string),
            code: code.to_string(),
        })
    }

    #[test]
    fn test_code_body() {
        assert_eq!(code_body(&["", "a", "b", ""]), "a\nb");
        assert_eq!(code_body(&["", "", "a", ""]), "\na");
        assert_eq!(code_body(&["  "]), "");
        assert_eq!(code_body(&[" x"]), " x");
    }

    #[test]
    fn test_fenced_block_is_opaque() {
        let md = Markdown::default();
        let text = "```c++\n# not a heading\n**raw** $x$\n```";
        let doc = md.parse(text);
        assert_eq!(
            doc.to_tree(),
            TreeNode::root(vec![code(Some("c++"), "# not a heading\n**raw** $x$")])
        );
        assert_eq!(md.export(&doc), text);
    }

    #[test]
    fn test_empty_block() {
        let md = Markdown::default();
        let doc = md.parse("```\n```");
        assert_eq!(doc.to_tree(), TreeNode::root(vec![code(None, "")]));
        assert_eq!(md.export(&md.parse(&md.export(&doc))), md.export(&doc));
    }
}
