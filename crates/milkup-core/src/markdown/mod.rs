// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown import and export driven by a [`Registry`]

mod export;
mod import;
mod inline;

pub use export::{export_document, ExportContext};
pub use import::{import_document, import_fragment, ImportContext};
pub use inline::unescape;
pub(crate) use inline::isolate;

use crate::ast::{Document, NodeId};
use crate::registry::Registry;
use crate::traits::{ExportConfig, ImportConfig};

/// A registry bundled with import and export settings
#[derive(Debug, Default)]
pub struct Markdown {
    registry: Registry,
    import: ImportConfig,
    export: ExportConfig,
}

impl Markdown {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            import: ImportConfig::default(),
            export: ExportConfig::default(),
        }
    }

    pub fn with_import_config(mut self, config: ImportConfig) -> Self {
        self.import = config;
        self
    }

    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        self.export = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the whole document
    pub fn export(&self, doc: &Document) -> String {
        export_document(doc, &self.registry, &self.export)
    }

    /// Replace the document's content with `text`, returning the new top-level nodes
    pub fn import(&self, text: &str, doc: &mut Document) -> Vec<NodeId> {
        import_document(text, doc, &self.registry, &self.import)
    }

    /// Import into a fresh document
    pub fn parse(&self, text: &str) -> Document {
        let mut doc = Document::new();
        self.import(text, &mut doc);
        doc
    }
}
