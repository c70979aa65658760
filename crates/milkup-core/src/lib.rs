// SPDX-License-Identifier: AGPL-3.0-or-later
//! Milkup Core - Document tree and Markdown transformer engine
//!
//! This crate provides:
//! - An arena document tree with validated mutation
//! - An ordered registry of Markdown transformers
//! - Markdown import and export driven by that registry
//! - Shortcut handling for text typed into the tree

pub mod ast;
pub mod markdown;
pub mod registry;
pub mod shortcuts;
pub mod traits;
pub mod transformers;

pub use ast::{
    Document, EmbedKind, ImageSize, ListKind, NodeId, NodeKind, NodeType, Selection, TextFormat,
    TreeNode,
};
pub use markdown::{export_document, import_document, import_fragment, Markdown};
pub use registry::{NodeCatalog, Registry, RegistryBuilder};
pub use shortcuts::apply_shortcuts;
pub use traits::{
    ElementTransformer, EndPattern, EngineError, ExportConfig, ImportConfig,
    MultilineElementTransformer, Result, TextFormatTransformer, TextMatchTransformer,
    Transformer, TransformerKind,
};
