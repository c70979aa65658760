// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ordered transformer registry
//!
//! Position in the list is the tie-break between rules that match the same
//! input: the first exporter returning text wins, and the first block rule
//! whose pattern matches a line wins.

use crate::ast::NodeType;
use crate::traits::{
    ElementTransformer, EngineError, MultilineElementTransformer, Result, TextFormatTransformer,
    TextMatchTransformer, Transformer,
};
use crate::transformers;
use std::collections::{BTreeSet, HashMap};

/// Node types a host has registered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCatalog {
    types: BTreeSet<NodeType>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every node type
    pub fn all() -> Self {
        NodeType::ALL.into_iter().collect()
    }

    pub fn register(&mut self, node: NodeType) -> &mut Self {
        self.types.insert(node);
        self
    }

    pub fn with(mut self, node: NodeType) -> Self {
        self.types.insert(node);
        self
    }

    pub fn contains(&self, node: NodeType) -> bool {
        self.types.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeType> + '_ {
        self.types.iter().copied()
    }
}

impl FromIterator<NodeType> for NodeCatalog {
    fn from_iter<I: IntoIterator<Item = NodeType>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

/// Read-only, ordered set of transformers
///
/// Built once at startup and shared; passes never mutate it.
pub struct Registry {
    transformers: Vec<Transformer>,
    by_trigger: HashMap<char, Vec<usize>>,
    by_node_type: HashMap<NodeType, Vec<usize>>,
}

impl Registry {
    /// Validate dependencies against the host catalog and index the rules
    pub fn new(transformers: Vec<Transformer>, catalog: &NodeCatalog) -> Result<Self> {
        for transformer in &transformers {
            if let Some(&node) = transformer
                .dependencies()
                .iter()
                .find(|&&node| !catalog.contains(node))
            {
                return Err(EngineError::MissingDependency {
                    transformer: transformer.name().to_string(),
                    node,
                });
            }
        }
        Ok(Self::index(transformers))
    }

    /// Built-in rule set in its default order
    pub fn with_defaults() -> Self {
        Self::index(transformers::defaults())
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    fn index(transformers: Vec<Transformer>) -> Self {
        let mut by_trigger: HashMap<char, Vec<usize>> = HashMap::new();
        let mut by_node_type: HashMap<NodeType, Vec<usize>> = HashMap::new();
        for (position, transformer) in transformers.iter().enumerate() {
            if let Some(trigger) = transformer.trigger() {
                by_trigger.entry(trigger).or_default().push(position);
            }
            for &node in transformer.dependencies() {
                by_node_type.entry(node).or_default().push(position);
            }
        }
        tracing::debug!(
            transformers = transformers.len(),
            triggers = by_trigger.len(),
            "transformer registry ready"
        );
        Self {
            transformers,
            by_trigger,
            by_node_type,
        }
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// All transformers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Transformer> {
        self.transformers.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Transformer> {
        self.transformers.iter().find(|t| t.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.transformers.iter().position(|t| t.name() == name)
    }

    pub fn elements(&self) -> impl Iterator<Item = &dyn ElementTransformer> {
        self.transformers.iter().filter_map(|t| match t {
            Transformer::Element(t) => Some(t.as_ref()),
            _ => None,
        })
    }

    pub fn multiline_elements(&self) -> impl Iterator<Item = &dyn MultilineElementTransformer> {
        self.transformers.iter().filter_map(|t| match t {
            Transformer::MultilineElement(t) => Some(t.as_ref()),
            _ => None,
        })
    }

    pub fn text_matches(&self) -> impl Iterator<Item = &dyn TextMatchTransformer> {
        self.transformers.iter().filter_map(|t| match t {
            Transformer::TextMatch(t) => Some(t.as_ref()),
            _ => None,
        })
    }

    pub fn text_formats(&self) -> impl Iterator<Item = &TextFormatTransformer> {
        self.transformers.iter().filter_map(|t| match t {
            Transformer::TextFormat(t) => Some(t),
            _ => None,
        })
    }

    /// Text-match rules fired by `trigger`, in registration order
    pub fn for_trigger(&self, trigger: char) -> impl Iterator<Item = &dyn TextMatchTransformer> {
        self.by_trigger
            .get(&trigger)
            .into_iter()
            .flatten()
            .filter_map(|&position| match &self.transformers[position] {
                Transformer::TextMatch(t) => Some(t.as_ref()),
                _ => None,
            })
    }

    pub fn is_trigger(&self, c: char) -> bool {
        self.by_trigger.contains_key(&c)
    }

    /// Transformers declaring a dependency on `node`
    pub fn depending_on(&self, node: NodeType) -> impl Iterator<Item = &Transformer> {
        self.by_node_type
            .get(&node)
            .into_iter()
            .flatten()
            .map(|&position| &self.transformers[position])
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.transformers.iter().map(|t| t.name()))
            .finish()
    }
}

/// Assembles a registry from built-in names and custom transformers
#[derive(Default)]
pub struct RegistryBuilder {
    transformers: Vec<Transformer>,
    catalog: Option<NodeCatalog>,
}

impl RegistryBuilder {
    pub fn push(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Append a built-in transformer by name
    pub fn named(self, name: &str) -> Result<Self> {
        let transformer = transformers::by_name(name)
            .ok_or_else(|| EngineError::UnknownTransformer(name.to_string()))?;
        Ok(self.push(transformer))
    }

    /// Append every built-in transformer in default order
    pub fn defaults(mut self) -> Self {
        self.transformers.extend(transformers::defaults());
        self
    }

    /// Host catalog to validate against; every node type when unset
    pub fn catalog(mut self, catalog: NodeCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> Result<Registry> {
        let catalog = self.catalog.unwrap_or_else(NodeCatalog::all);
        Registry::new(self.transformers, &catalog)
    }
}
