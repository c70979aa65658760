// SPDX-License-Identifier: AGPL-3.0-or-later
//! TOML configuration for the command-line host

use anyhow::{Context, Result};
use milkup_core::transformers::DEFAULT_ORDER;
use milkup_core::{ExportConfig, ImportConfig, Markdown, NodeCatalog, NodeType, Registry};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub import: ImportConfig,
    pub export: ExportConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Transformer names in registration order; the built-in order when empty
    pub order: Vec<String>,
    /// Names dropped from `order`
    pub disabled: Vec<String>,
    /// Node types the host supports; every type when unset
    pub nodes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    fn catalog(&self) -> Result<NodeCatalog> {
        let Some(names) = &self.registry.nodes else {
            return Ok(NodeCatalog::all());
        };
        names
            .iter()
            .map(|name| name.parse::<NodeType>())
            .collect::<milkup_core::Result<NodeCatalog>>()
            .context("invalid [registry] nodes")
    }

    /// Assemble the registry, failing on unknown names or missing node types
    pub fn registry(&self) -> Result<Registry> {
        let order: Vec<&str> = if self.registry.order.is_empty() {
            DEFAULT_ORDER.to_vec()
        } else {
            self.registry.order.iter().map(String::as_str).collect()
        };
        let mut builder = Registry::builder().catalog(self.catalog()?);
        for name in order {
            if self.registry.disabled.iter().any(|disabled| disabled == name) {
                continue;
            }
            builder = builder
                .named(name)
                .with_context(|| format!("invalid [registry] order entry `{name}`"))?;
        }
        builder
            .build()
            .context("failed to assemble the transformer registry")
    }

    pub fn markdown(&self) -> Result<Markdown> {
        Ok(Markdown::new(self.registry()?)
            .with_import_config(self.import.clone())
            .with_export_config(self.export.clone()))
    }
}
