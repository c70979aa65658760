// SPDX-License-Identifier: AGPL-3.0-or-later
//! Built-in transformers
//!
//! Each rule is constructible by name so hosts can assemble a registry from
//! configuration. [`DEFAULT_ORDER`] is the order [`defaults`] uses; position
//! in that list decides which rule wins when several match.

mod block;
mod code;
mod embed;
mod equation;
pub mod format;
mod image;
mod link;
mod list;
mod table;

pub use block::{DashSpace, Heading, HorizontalRule, Quote};
pub use code::Code;
pub use embed::Embed;
pub use equation::{BlockEquation, EquationBlockShortcut, InlineEquation};
pub use image::Image;
pub use link::{AutoLink, Link};
pub use list::List;
pub use table::Table;

use crate::ast::{EmbedKind, ListKind, NodeId};
use crate::markdown::ImportContext;
use crate::traits::{Result, Transformer};

/// Names of the built-in rules in their default registry order
pub const DEFAULT_ORDER: [&str; 25] = [
    "HR",
    "BLOCK_EQUATION",
    "CODE",
    "EQUATION_BLOCK_SHORTCUT",
    "IMAGE",
    "YOUTUBE",
    "PANOPTO",
    "AUDIO",
    "TABLE",
    "HEADING",
    "QUOTE",
    "CHECK_LIST",
    "UNORDERED_LIST",
    "ORDERED_LIST",
    "INLINE_EQUATION",
    "AUTO_LINK",
    "LINK",
    "BOLD_ITALIC_STAR",
    "BOLD_ITALIC_UNDERSCORE",
    "BOLD_STAR",
    "BOLD_UNDERSCORE",
    "INLINE_CODE",
    "ITALIC_STAR",
    "ITALIC_UNDERSCORE",
    "STRIKETHROUGH",
];

/// Rules that exist but are not part of the default set
pub const EXTRA: [&str; 1] = ["DASH_SPACE"];

/// Construct a built-in rule
pub fn by_name(name: &str) -> Option<Transformer> {
    let transformer = match name {
        "HR" => Transformer::Element(Box::new(HorizontalRule)),
        "BLOCK_EQUATION" => Transformer::MultilineElement(Box::new(BlockEquation)),
        "CODE" => Transformer::MultilineElement(Box::new(Code)),
        "EQUATION_BLOCK_SHORTCUT" => Transformer::Element(Box::new(EquationBlockShortcut)),
        "IMAGE" => Transformer::Element(Box::new(Image)),
        "YOUTUBE" => Transformer::Element(Box::new(Embed::new(EmbedKind::Youtube))),
        "PANOPTO" => Transformer::Element(Box::new(Embed::new(EmbedKind::Panopto))),
        "AUDIO" => Transformer::Element(Box::new(Embed::new(EmbedKind::Audio))),
        "TABLE" => Transformer::Element(Box::new(Table)),
        "HEADING" => Transformer::Element(Box::new(Heading)),
        "QUOTE" => Transformer::Element(Box::new(Quote)),
        "CHECK_LIST" => Transformer::Element(Box::new(List::new(ListKind::Check))),
        "UNORDERED_LIST" => Transformer::Element(Box::new(List::new(ListKind::Bullet))),
        "ORDERED_LIST" => Transformer::Element(Box::new(List::new(ListKind::Number))),
        "INLINE_EQUATION" => Transformer::TextMatch(Box::new(InlineEquation)),
        "AUTO_LINK" => Transformer::TextMatch(Box::new(AutoLink)),
        "LINK" => Transformer::TextMatch(Box::new(Link)),
        "DASH_SPACE" => Transformer::TextMatch(Box::new(DashSpace)),
        _ => return format::by_name(name).map(Transformer::TextFormat),
    };
    Some(transformer)
}

/// Every default rule in [`DEFAULT_ORDER`]
pub fn defaults() -> Vec<Transformer> {
    DEFAULT_ORDER.iter().filter_map(|name| by_name(name)).collect()
}

/// Put a leaf block in place of the paragraph a line was matched in
///
/// While typing into the last paragraph the block goes before it instead,
/// leaving a line to keep typing into.
fn place_block(
    cx: &mut ImportContext<'_>,
    placeholder: NodeId,
    block: NodeId,
    is_import: bool,
) -> Result<()> {
    let doc = cx.doc_mut();
    if is_import || doc.next_sibling(placeholder).is_some() {
        doc.replace(placeholder, block)
    } else {
        doc.insert_before(placeholder, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in DEFAULT_ORDER.iter().chain(EXTRA.iter()) {
            let transformer = by_name(name).unwrap_or_else(|| panic!("{name} missing"));
            assert_eq!(transformer.name(), *name);
        }
        assert!(by_name("NOPE").is_none());
    }

    #[test]
    fn test_defaults_follow_order() {
        let names: Vec<String> = defaults().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, DEFAULT_ORDER);
    }
}
