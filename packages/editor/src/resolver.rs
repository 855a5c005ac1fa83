//! # Resolver Registry
//!
//! Maps a widget type tag to its capability bundle.
//!
//! The tree itself is generic: nodes only carry a tag. Whenever the engine
//! needs to know what a tag *means* (can it hold children, what are its
//! default props, how is it drawn or edited) it goes through the registry.
//!
//! A registry is filled once at process start and then frozen behind an
//! `Arc`, so any number of edit sessions can read it without locking.

use crate::document::{Node, Props};
use crate::errors::ResolverError;
use crate::widgets::{PropertyPanel, RenderOutput, WidgetKind};
use std::collections::HashMap;

/// Capability bundle registered for a tag
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverEntry {
    pub kind: WidgetKind,
    pub default_props: Props,
}

impl ResolverEntry {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            default_props: kind.default_props(),
        }
    }

    /// Override the default props (e.g. a "callout" container with a tinted background)
    pub fn with_default_props(mut self, props: Props) -> Self {
        self.default_props = props;
        self
    }

    pub fn accepts_children(&self) -> bool {
        self.kind.accepts_children()
    }

    pub fn render(&self, node: &Node) -> RenderOutput {
        self.kind.render(node)
    }

    pub fn property_editor(&self, node: &Node) -> PropertyPanel {
        self.kind.property_editor(node)
    }
}

/// Tag → entry table
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<String, ResolverEntry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with every builtin widget under its standard tag
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in WidgetKind::ALL {
            registry
                .entries
                .insert(kind.tag().to_string(), ResolverEntry::new(kind));
        }
        registry
    }

    /// Register a tag.
    ///
    /// Registering the same entry twice is a no-op. Registering a different
    /// entry under a tag that is already taken fails instead of shadowing it.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        entry: ResolverEntry,
    ) -> Result<(), ResolverError> {
        let tag = tag.into();

        match self.entries.get(&tag) {
            Some(existing) if *existing == entry => Ok(()),
            Some(_) => Err(ResolverError::ConflictingRegistration(tag)),
            None => {
                self.entries.insert(tag, entry);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, tag: &str) -> Result<&ResolverEntry, ResolverError> {
        self.entries
            .get(tag)
            .ok_or_else(|| ResolverError::UnknownType(tag.to_string()))
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn default_props(&self, tag: &str) -> Result<Props, ResolverError> {
        self.resolve(tag).map(|entry| entry.default_props.clone())
    }

    /// Whether nodes with this tag can hold children. Unknown tags cannot.
    pub fn accepts_children(&self, tag: &str) -> bool {
        self.entries
            .get(tag)
            .map(ResolverEntry::accepts_children)
            .unwrap_or(false)
    }

    /// Render a node, falling back to an opaque placeholder for unknown tags
    pub fn render(&self, node: &Node) -> RenderOutput {
        match self.entries.get(&node.widget) {
            Some(entry) => entry.render(node),
            None => RenderOutput::placeholder(node),
        }
    }

    /// Property panel for a node; unknown tags expose no fields
    pub fn property_editor(&self, node: &Node) -> PropertyPanel {
        match self.entries.get(&node.widget) {
            Some(entry) => entry.property_editor(node),
            None => PropertyPanel::empty(node.id.clone()),
        }
    }

    /// Registered tags in sorted order
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
