// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inline scanner
//!
//! A text run is tokenized first: backslash escapes, code spans and
//! trigger-anchored text-match atoms become opaque tokens. An atom's raw text
//! keeps its escapes; the transformer decides how to decode them. Emphasis markers
//! are then paired over the remaining characters, and the resulting pieces
//! replace the original text node in the tree. Text-match atoms are handed
//! to their transformer's `replace` as text nodes inside a detached node of
//! the same kind as the scanned node's parent.

use crate::ast::{Document, NodeId, NodeKind, TextFormat};
use crate::registry::Registry;
use crate::traits::{EngineError, Result, TextFormatTransformer, TextMatchTransformer};
use std::collections::HashMap;

/// Emphasis nesting deeper than this is left as literal markers
const MAX_NESTING: usize = 32;

/// Drop the backslash from `\` + ASCII punctuation pairs
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek().filter(|next| next.is_ascii_punctuation()) {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Scan an attached text node and splice the resulting inline nodes in its place
pub(crate) fn scan_text_node(doc: &mut Document, registry: &Registry, text: NodeId) -> Result<()> {
    let (raw, base) = match doc.kind(text) {
        NodeKind::Text { content, format } => (content.clone(), *format),
        _ => return Err(EngineError::NotText(text)),
    };
    let Some(parent) = doc.parent(text) else {
        return Err(EngineError::Detached(text));
    };
    if base.code {
        return Ok(());
    }

    let tokens = tokenize(&raw, registry);
    let mut pieces = Vec::new();
    Pairing::new(&tokens, registry).parse(0, tokens.len(), base, 0, &mut pieces);

    // Atoms are resolved in a detached copy of the parent so each edit only
    // touches a one-child list; the results are spliced in with one call
    let mut created = Vec::with_capacity(pieces.len());
    let mut plain = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text { text, format } => {
                let id = doc.create_text(text, format);
                plain.push(id);
                created.push(id);
            }
            Piece::Code { text, format } => {
                created.push(doc.create_text(text, format.union(TextFormat::CODE)));
            }
            Piece::Atom { rule, raw, format } => {
                let id = doc.create_text(raw, format);
                let container = doc.kind(parent).clone();
                let scratch = doc.create(container);
                doc.append(scratch, id)?;
                resolve_atom(doc, rule, id);
                created.extend_from_slice(doc.children(scratch));
            }
        }
    }
    doc.replace_with(text, created)?;

    for node in plain {
        apply_untriggered(doc, registry, node)?;
    }
    Ok(())
}

/// Hand an atom's text node to the rule that matched it
fn resolve_atom(doc: &mut Document, rule: &dyn TextMatchTransformer, node: NodeId) {
    let NodeKind::Text { content, .. } = doc.kind(node) else {
        return;
    };
    let content = content.clone();
    let Some(captures) = rule.pattern().captures(&content) else {
        return;
    };
    match rule.replace(doc, node, &captures) {
        Ok(()) => tracing::trace!(transformer = rule.name(), "inline match"),
        Err(err) => {
            tracing::warn!(transformer = rule.name(), %err, "inline rule failed; keeping text")
        }
    }
}

/// Split `[start, end)` of a text node into its own node
///
/// Returns the isolated node and the node holding the rest of the text, if
/// any was left after `end`.
pub(crate) fn isolate(
    doc: &mut Document,
    text: NodeId,
    start: usize,
    end: usize,
) -> Result<(NodeId, Option<NodeId>)> {
    let len = match doc.kind(text) {
        NodeKind::Text { content, .. } => content.len(),
        _ => return Err(EngineError::NotText(text)),
    };
    let matched = if start > 0 {
        doc.split_text(text, start)?.1
    } else {
        text
    };
    let after = if end < len {
        Some(doc.split_text(matched, end - start)?.1)
    } else {
        None
    };
    Ok((matched, after))
}

/// Text-match rules without a trigger, searched with their import pattern
fn apply_untriggered(doc: &mut Document, registry: &Registry, node: NodeId) -> Result<()> {
    let mut current = node;
    'scan: loop {
        let content = match doc.kind(current) {
            NodeKind::Text { content, format } if !format.code => content.clone(),
            _ => return Ok(()),
        };
        for rule in registry.text_matches().filter(|rule| rule.trigger().is_none()) {
            let Some(captures) = rule.import_pattern().captures(&content) else {
                continue;
            };
            let Some(found) = captures.get(0).filter(|m| !m.is_empty()) else {
                continue;
            };
            let (matched, after) = isolate(doc, current, found.start(), found.end())?;
            if let Err(err) = rule.replace(doc, matched, &captures) {
                tracing::warn!(transformer = rule.name(), %err, "inline rule failed; keeping text");
                return Ok(());
            }
            match after {
                Some(after) => {
                    current = after;
                    continue 'scan;
                }
                None => return Ok(()),
            }
        }
        return Ok(());
    }
}

enum Token<'s, 'r> {
    Char { ch: char, at: usize, escaped: bool },
    Code { content: &'s str },
    Atom {
        rule: &'r dyn TextMatchTransformer,
        raw: &'s str,
    },
}

impl Token<'_, '_> {
    fn marker(&self) -> Option<char> {
        match self {
            Token::Char {
                ch, escaped: false, ..
            } => Some(*ch),
            _ => None,
        }
    }
}

/// Edges of the run count as whitespace
fn is_space(token: Option<&Token<'_, '_>>) -> bool {
    match token {
        None => true,
        Some(Token::Char { ch, .. }) => ch.is_whitespace(),
        Some(_) => false,
    }
}

fn is_alphanumeric(token: Option<&Token<'_, '_>>) -> bool {
    matches!(token, Some(Token::Char { ch, .. }) if ch.is_alphanumeric())
}

fn tokenize<'s, 'r>(raw: &'s str, registry: &'r Registry) -> Vec<Token<'s, 'r>> {
    let code_tags: Vec<&'static str> = registry
        .text_formats()
        .filter(|rule| rule.is_code())
        .map(|rule| rule.tag)
        .collect();
    let mut tokens = Vec::new();
    // Trigger patterns only see text after the last atom or code span
    let mut window = 0;
    let mut window_token = 0;
    let mut i = 0;
    while let Some(c) = raw[i..].chars().next() {
        if c == '\\' {
            if let Some(next) = raw[i + 1..]
                .chars()
                .next()
                .filter(char::is_ascii_punctuation)
            {
                tokens.push(Token::Char {
                    ch: next,
                    at: i,
                    escaped: true,
                });
                i += 1 + next.len_utf8();
                continue;
            }
        }
        if let Some((tag, content)) = code_span(&raw[i..], &code_tags) {
            tokens.push(Token::Code { content });
            i += 2 * tag.len() + content.len();
            window = i;
            window_token = tokens.len();
            continue;
        }
        tokens.push(Token::Char {
            ch: c,
            at: i,
            escaped: false,
        });
        i += c.len_utf8();
        if !registry.is_trigger(c) {
            continue;
        }
        let text = &raw[window..i];
        let window_tokens = &tokens[window_token..];
        let hit = registry.for_trigger(c).find_map(|rule| {
            rule.pattern()
                .find(text)
                .filter(|m| m.end() == text.len())
                .map(|m| window + m.start())
                .filter(|&start| !opens_escaped(window_tokens, start))
                .map(|start| (rule, start))
        });
        if let Some((rule, start)) = hit {
            let first = tokens[window_token..]
                .iter()
                .position(|token| matches!(token, Token::Char { at, .. } if *at >= start))
                .map_or(tokens.len(), |p| window_token + p);
            tokens.truncate(first);
            tokens.push(Token::Atom {
                rule,
                raw: &raw[start..i],
            });
            window = i;
            window_token = tokens.len();
        }
    }
    tokens
}

/// True when the character at byte `start` was written as an escape
fn opens_escaped(tokens: &[Token<'_, '_>], start: usize) -> bool {
    tokens
        .iter()
        .any(|token| matches!(token, Token::Char { at, escaped: true, .. } if *at + 1 == start))
}

fn code_span<'s>(rest: &'s str, tags: &[&'static str]) -> Option<(&'static str, &'s str)> {
    tags.iter().find_map(|&tag| {
        let after = rest.strip_prefix(tag)?;
        let close = after.find(tag).filter(|&close| close > 0)?;
        Some((tag, &after[..close]))
    })
}

enum Piece<'s, 'r> {
    Text {
        text: String,
        format: TextFormat,
    },
    Code {
        text: &'s str,
        format: TextFormat,
    },
    Atom {
        rule: &'r dyn TextMatchTransformer,
        raw: &'s str,
        format: TextFormat,
    },
}

fn push_token<'s, 'r>(out: &mut Vec<Piece<'s, 'r>>, token: &Token<'s, 'r>, format: TextFormat) {
    match *token {
        Token::Char { ch, .. } => match out.last_mut() {
            Some(Piece::Text { text, format: last }) if *last == format => text.push(ch),
            _ => out.push(Piece::Text {
                text: ch.to_string(),
                format,
            }),
        },
        Token::Code { content } => out.push(Piece::Code {
            text: content,
            format,
        }),
        Token::Atom { rule, raw } => out.push(Piece::Atom { rule, raw, format }),
    }
}

/// Emphasis pairing over a token stream
struct Pairing<'t, 's, 'r> {
    tokens: &'t [Token<'s, 'r>],
    rules: Vec<&'r TextFormatTransformer>,
    /// (rule, range end) -> smallest start already known to have no closer
    dead_ends: HashMap<(usize, usize), usize>,
}

impl<'t, 's, 'r> Pairing<'t, 's, 'r> {
    fn new(tokens: &'t [Token<'s, 'r>], registry: &'r Registry) -> Self {
        Self {
            tokens,
            rules: registry
                .text_formats()
                .filter(|rule| !rule.is_code())
                .collect(),
            dead_ends: HashMap::new(),
        }
    }

    fn tag_at(&self, at: usize, end: usize, tag: &str) -> bool {
        let mut index = at;
        for expected in tag.chars() {
            if index >= end || self.tokens[index].marker() != Some(expected) {
                return false;
            }
            index += 1;
        }
        true
    }

    fn can_open(&self, at: usize, end: usize, rule: &TextFormatTransformer) -> bool {
        let after = at + rule.tag.chars().count();
        let next = (after < end).then(|| &self.tokens[after]);
        let prev = at.checked_sub(1).map(|p| &self.tokens[p]);
        !is_space(next) && (rule.intraword || !is_alphanumeric(prev))
    }

    fn can_close(&self, at: usize, rule: &TextFormatTransformer) -> bool {
        let prev = at.checked_sub(1).map(|p| &self.tokens[p]);
        let next = self.tokens.get(at + rule.tag.chars().count());
        !is_space(prev) && (rule.intraword || !is_alphanumeric(next))
    }

    fn find_closer(&mut self, from: usize, end: usize, rule_index: usize) -> Option<usize> {
        let key = (rule_index, end);
        if self.dead_ends.get(&key).is_some_and(|&dead| from >= dead) {
            return None;
        }
        let rule = self.rules[rule_index];
        let found = (from + 1..end).find(|&at| self.tag_at(at, end, rule.tag) && self.can_close(at, rule));
        if found.is_none() {
            let dead = self.dead_ends.entry(key).or_insert(from);
            *dead = (*dead).min(from);
        }
        found
    }

    /// First rule, in registry order, that opens at `at` and has a closer
    fn opener_at(&mut self, at: usize, end: usize) -> Option<(usize, usize)> {
        for index in 0..self.rules.len() {
            let rule = self.rules[index];
            if !self.tag_at(at, end, rule.tag) || !self.can_open(at, end, rule) {
                continue;
            }
            let content = at + rule.tag.chars().count();
            if let Some(close) = self.find_closer(content, end, index) {
                return Some((index, close));
            }
        }
        None
    }

    fn parse(
        &mut self,
        start: usize,
        end: usize,
        format: TextFormat,
        depth: usize,
        out: &mut Vec<Piece<'s, 'r>>,
    ) {
        let tokens = self.tokens;
        let mut at = start;
        while at < end {
            if depth < MAX_NESTING {
                if let Some((index, close)) = self.opener_at(at, end) {
                    let rule = self.rules[index];
                    let len = rule.tag.chars().count();
                    self.parse(at + len, close, format.union(rule.format), depth + 1, out);
                    at = close + len;
                    continue;
                }
            }
            push_token(out, &tokens[at], format);
            at += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TreeNode;
    use pretty_assertions::assert_eq;

    fn scan(raw: &str) -> Vec<TreeNode> {
        scan_with(raw, &Registry::with_defaults())
    }

    fn scan_with(raw: &str, registry: &Registry) -> Vec<TreeNode> {
        let mut doc = Document::new();
        let paragraph = doc.create(NodeKind::Paragraph);
        let text = doc.create(NodeKind::text(raw));
        doc.append(paragraph, text).unwrap();
        doc.append(doc.root(), paragraph).unwrap();
        scan_text_node(&mut doc, registry, text).unwrap();
        doc.snapshot(paragraph).children
    }

    fn equation(source: &str) -> TreeNode {
        TreeNode::new(NodeKind::InlineEquation {
            source: source.into(),
        })
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(scan("just words"), vec![TreeNode::text("just words")]);
    }

    #[test]
    fn test_lone_trigger_stays_literal() {
        assert_eq!(scan("costs $5 today"), vec![TreeNode::text("costs $5 today")]);
        assert_eq!(scan("a ) b >"), vec![TreeNode::text("a ) b >")]);
    }

    #[test]
    fn test_inline_equation() {
        assert_eq!(
            scan("a $x^2$ b"),
            vec![TreeNode::text("a "), equation("x^2"), TreeNode::text(" b")]
        );
    }

    #[test]
    fn test_long_run_of_atoms() {
        let nodes = scan(&"$a$b".repeat(10_000));
        assert_eq!(nodes.len(), 20_000);
        assert_eq!(nodes[0], equation("a"));
        assert_eq!(nodes[1], TreeNode::text("b"));
        assert_eq!(nodes[19_998], equation("a"));
    }

    #[test]
    fn test_escaped_trigger_is_literal() {
        assert_eq!(scan(r"\$x\$ and \*y\*"), vec![TreeNode::text("$x$ and *y*")]);
    }

    #[test]
    fn test_nested_emphasis() {
        assert_eq!(
            scan("**a *b* c**"),
            vec![
                TreeNode::formatted("a ", TextFormat::BOLD),
                TreeNode::formatted("b", TextFormat::BOLD_ITALIC),
                TreeNode::formatted(" c", TextFormat::BOLD),
            ]
        );
    }

    #[test]
    fn test_adjacent_emphasis_runs() {
        assert_eq!(
            scan("**a***b*"),
            vec![
                TreeNode::formatted("a", TextFormat::BOLD),
                TreeNode::formatted("b", TextFormat::ITALIC),
            ]
        );
        assert_eq!(
            scan("***a***"),
            vec![TreeNode::formatted("a", TextFormat::BOLD_ITALIC)]
        );
    }

    #[test]
    fn test_underscore_needs_word_boundary() {
        assert_eq!(scan("snake_case_name"), vec![TreeNode::text("snake_case_name")]);
        assert_eq!(
            scan("an _em_ word"),
            vec![
                TreeNode::text("an "),
                TreeNode::formatted("em", TextFormat::ITALIC),
                TreeNode::text(" word"),
            ]
        );
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        assert_eq!(scan("**open"), vec![TreeNode::text("**open")]);
        assert_eq!(scan("a * b * c"), vec![TreeNode::text("a * b * c")]);
    }

    #[test]
    fn test_code_span_is_opaque() {
        assert_eq!(
            scan("run `a *b* $c$` now"),
            vec![
                TreeNode::text("run "),
                TreeNode::formatted("a *b* $c$", TextFormat::CODE),
                TreeNode::text(" now"),
            ]
        );
    }

    #[test]
    fn test_link_inside_bold() {
        assert_eq!(
            scan("see **[x](http://e.com \"T\")**"),
            vec![
                TreeNode::text("see "),
                TreeNode::with_children(
                    NodeKind::Link {
                        url: "http://e.com".into(),
                        title: Some("T".into()),
                    },
                    vec![TreeNode::formatted("x", TextFormat::BOLD)],
                ),
            ]
        );
    }

    #[test]
    fn test_autolink() {
        assert_eq!(
            scan("<https://e.com>"),
            vec![TreeNode::with_children(
                NodeKind::Link {
                    url: "https://e.com".into(),
                    title: None,
                },
                vec![TreeNode::text("https://e.com")],
            )]
        );
    }

    #[test]
    fn test_markers_stay_literal_without_format_rules() {
        let registry = Registry::builder()
            .named("INLINE_EQUATION")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            scan_with("**$a$**", &registry),
            vec![TreeNode::text("**"), equation("a"), TreeNode::text("**")]
        );
    }

    #[test]
    fn test_empty_text_is_removed() {
        assert_eq!(scan(""), Vec::<TreeNode>::new());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\*b\\c\d"), r"a*b\c\d");
    }
}
