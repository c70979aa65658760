// SPDX-License-Identifier: AGPL-3.0-or-later
//! YouTube, Panopto and audio embeds

use super::place_block;
use crate::ast::{EmbedKind, NodeId, NodeKind, NodeType};
use crate::markdown::{ExportContext, ImportContext};
use crate::traits::{ElementTransformer, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static YOUTUBE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[YOUTUBE_EMBED\]\(https://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})\)\s*$",
    )
    .unwrap()
});
static PANOPTO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\[PANOPTO_EMBED\]\((\S+)\)|((?:https?://)?(?:www\.)?[a-z0-9.]+[-.]panopto\.[a-z]{2,5}(?::[0-9]{1,5})?(?:/\S*)?))\s*$",
    )
    .unwrap()
});
static PANOPTO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]id=([^&)\s]+)").unwrap());
static AUDIO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\[AUDIO_EMBED\]\((\S+)\)|(https?://\S+\.(?:mp3|wav|flac|aac|ogg|m4a|wma)))\s*$",
    )
    .unwrap()
});

const PANOPTO_VIEWER: &str = "https://imperial.cloud.panopto.eu/Panopto/Pages/Viewer.aspx?id=";

/// Embedded media block; one rule per provider
pub struct Embed {
    kind: EmbedKind,
}

impl Embed {
    pub fn new(kind: EmbedKind) -> Self {
        Self { kind }
    }

    /// Payload for a matched line, `None` when the line carries none
    fn payload(&self, captures: &Captures<'_>) -> Option<String> {
        let either = || captures.get(1).or_else(|| captures.get(2));
        match self.kind {
            EmbedKind::Youtube => captures.get(1).map(|m| m.as_str().to_string()),
            EmbedKind::Panopto => {
                let url = either()?.as_str();
                PANOPTO_ID
                    .captures(url)
                    .and_then(|id| id.get(1))
                    .map(|id| id.as_str().to_string())
            }
            EmbedKind::Audio => either().map(|m| m.as_str().to_string()),
        }
    }
}

impl ElementTransformer for Embed {
    fn name(&self) -> &str {
        match self.kind {
            EmbedKind::Youtube => "YOUTUBE",
            EmbedKind::Panopto => "PANOPTO",
            EmbedKind::Audio => "AUDIO",
        }
    }

    fn dependencies(&self) -> &[NodeType] {
        &[NodeType::Embed]
    }

    fn export(&self, node: NodeId, cx: &ExportContext<'_>) -> Option<String> {
        let NodeKind::Embed { kind, payload } = cx.doc().kind(node) else {
            return None;
        };
        if *kind != self.kind {
            return None;
        }
        Some(match kind {
            EmbedKind::Youtube => {
                format!("[YOUTUBE_EMBED](https://www.youtube.com/watch?v={payload})")
            }
            EmbedKind::Panopto => format!("[PANOPTO_EMBED]({PANOPTO_VIEWER}{payload})"),
            EmbedKind::Audio => format!("[AUDIO_EMBED]({payload})"),
        })
    }

    fn pattern(&self) -> &Regex {
        match self.kind {
            EmbedKind::Youtube => &YOUTUBE_PATTERN,
            EmbedKind::Panopto => &PANOPTO_PATTERN,
            EmbedKind::Audio => &AUDIO_PATTERN,
        }
    }

    fn replace(
        &self,
        cx: &mut ImportContext<'_>,
        placeholder: NodeId,
        _children: Vec<NodeId>,
        captures: &Captures<'_>,
        is_import: bool,
    ) -> Result<bool> {
        let Some(payload) = self.payload(captures) else {
            return Ok(false);
        };
        let embed = cx.doc_mut().create(NodeKind::Embed {
            kind: self.kind,
            payload,
        });
        place_block(cx, placeholder, embed, is_import)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TreeNode;
    use crate::markdown::Markdown;
    use pretty_assertions::assert_eq;

    fn embed(kind: EmbedKind, payload: &str) -> TreeNode {
        TreeNode::new(NodeKind::Embed {
            kind,
            payload: payload.into(),
        })
    }

    fn blocks(text: &str) -> Vec<TreeNode> {
        Markdown::default().parse(text).to_tree().children
    }

    #[test]
    fn test_youtube() {
        assert_eq!(
            blocks("[YOUTUBE_EMBED](https://www.youtube.com/watch?v=dQw4w9WgXcQ)"),
            [embed(EmbedKind::Youtube, "dQw4w9WgXcQ")]
        );
        assert_eq!(
            blocks("[YOUTUBE_EMBED](https://youtu.be/dQw4w9WgXcQ)"),
            [embed(EmbedKind::Youtube, "dQw4w9WgXcQ")]
        );
        // Ten characters is not a video id
        assert_eq!(
            blocks("[YOUTUBE_EMBED](https://youtu.be/dQw4w9WgXc)")[0].kind,
            NodeKind::Paragraph
        );
    }

    #[test]
    fn test_panopto() {
        let canonical = format!("[PANOPTO_EMBED]({PANOPTO_VIEWER}abc-123)");
        assert_eq!(blocks(&canonical), [embed(EmbedKind::Panopto, "abc-123")]);
        assert_eq!(
            blocks("https://uni.cloud.panopto.eu/Panopto/Pages/Viewer.aspx?foo=1&id=xyz"),
            [embed(EmbedKind::Panopto, "xyz")]
        );
        let md = Markdown::default();
        assert_eq!(md.export(&md.parse(&canonical)), canonical);
    }

    #[test]
    fn test_panopto_without_id_stays_text() {
        assert_eq!(
            blocks("https://uni.cloud.panopto.eu/Panopto/Pages/Home.aspx")[0].kind,
            NodeKind::Paragraph
        );
    }

    #[test]
    fn test_audio() {
        assert_eq!(
            blocks("[AUDIO_EMBED](https://cdn.example.com/talk.ogg)\nhttp://x.org/a.mp3"),
            [
                embed(EmbedKind::Audio, "https://cdn.example.com/talk.ogg"),
                embed(EmbedKind::Audio, "http://x.org/a.mp3"),
            ]
        );
        let md = Markdown::default();
        assert_eq!(
            md.export(&md.parse("http://x.org/a.mp3")),
            "[AUDIO_EMBED](http://x.org/a.mp3)"
        );
    }
}
