// SPDX-License-Identifier: AGPL-3.0-or-later
//! Images with an optional `=WxH` size suffix

use super::place_block;
use crate::ast::{ImageSize, NodeId, NodeKind, NodeType};
use crate::markdown::{unescape, ExportContext, ImportContext};
use crate::traits::{ElementTransformer, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static IMAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^!\[((?:[^\]\\]|\\.)*)\]\(((?:https?://|data:)[^\s)]+)(?:\s*=\s*(\d+)x(\d+))?\)\s*$")
        .unwrap()
});

pub struct Image;

impl ElementTransformer for Image {
    fn name(&self) -> &str {
        "IMAGE"
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Image]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        let NodeKind::Image { url, alt, size } = cx.doc().kind(node) else {
            return None;
        };
        let alt = alt.replace('\\', "\\\\").replace(']', "\\]");
        Some(match size {
            Some(ImageSize { width, height }) => format!("![{alt}]({url} ={width}x{height})"),
            None => format!("![{alt}]({url})"),
        })
    }

    fn pattern(&self) -> &Regex {
        &IMAGE_PATTERN
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        let group = |index| captures.get(index).map_or("", |m| m.as_str());
        let size = match (group(3).parse(), group(4).parse()) {
            (Ok(width), Ok(height)) => Some(ImageSize { width, height }),
            _ => None,
        };
        let image = cx.doc_mut().create(NodeKind::Image {
            url: group(2).to_string(),
            alt: unescape(group(1)),
            size,
        });
        place_block(cx, placeholder, image, is_import)?;
        Ok(true)
    }
}
