// SPDX-License-Identifier: AGPL-3.0-or-later
//! Emphasis markers
//!
//! Longer tags come before their prefixes so `***` is tried before `**` and
//! `*`. Underscore tags do not apply inside words.

use crate::ast::TextFormat;
use crate::traits::TextFormatTransformer;

pub const BOLD_ITALIC_STAR: TextFormatTransformer =
    TextFormatTransformer::new("BOLD_ITALIC_STAR", "***", TextFormat::BOLD_ITALIC);
pub const BOLD_ITALIC_UNDERSCORE: TextFormatTransformer =
    TextFormatTransformer::new("BOLD_ITALIC_UNDERSCORE", "___", TextFormat::BOLD_ITALIC)
        .word_bound();
pub const BOLD_STAR: TextFormatTransformer =
    TextFormatTransformer::new("BOLD_STAR", "**", TextFormat::BOLD);
pub const BOLD_UNDERSCORE: TextFormatTransformer =
    TextFormatTransformer::new("BOLD_UNDERSCORE", "__", TextFormat::BOLD).word_bound();
pub const INLINE_CODE: TextFormatTransformer =
    TextFormatTransformer::new("INLINE_CODE", "`", TextFormat::CODE);
pub const ITALIC_STAR: TextFormatTransformer =
    TextFormatTransformer::new("ITALIC_STAR", "*", TextFormat::ITALIC);
pub const ITALIC_UNDERSCORE: TextFormatTransformer =
    TextFormatTransformer::new("ITALIC_UNDERSCORE", "_", TextFormat::ITALIC).word_bound();
pub const STRIKETHROUGH: TextFormatTransformer =
    TextFormatTransformer::new("STRIKETHROUGH", "~~", TextFormat::STRIKETHROUGH);

pub const ALL: [TextFormatTransformer; 8] = [
    BOLD_ITALIC_STAR,
    BOLD_ITALIC_UNDERSCORE,
    BOLD_STAR,
    BOLD_UNDERSCORE,
    INLINE_CODE,
    ITALIC_STAR,
    ITALIC_UNDERSCORE,
    STRIKETHROUGH,
];

pub fn by_name(name: &str) -> Option<TextFormatTransformer> {
    ALL.iter().find(|rule| rule.name == name).cloned()
}
