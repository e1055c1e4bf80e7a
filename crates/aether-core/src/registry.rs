//! Plugin roles and the name-unique registry.
//!
//! Three independent roles, three independent maps: sources produce
//! documents for a query, transforms rewrite normalized documents, and
//! displays render them to bytes. Registration is strict: a plugin must
//! carry a non-empty name, and a duplicate name within a role is rejected
//! without disturbing the first registration.

use crate::fetcher::Fetcher;
use crate::types::{Document, SearchDocument};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// A retrieval source consulted by the search pipeline.
///
/// Implementations must go through the supplied [`Fetcher`] for any network
/// access; raw HTTP would bypass robots checks and pacing.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique plugin name within the source role.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Attempts to produce a document for the query. `Ok(None)` means the
    /// source has nothing to offer and the pipeline moves on.
    async fn fetch(
        &self,
        ctx: &CancellationToken,
        fetcher: &Fetcher,
        query: &str,
    ) -> Result<Option<SearchDocument>>;
}

/// A post-normalization document rewriter.
#[async_trait]
pub trait TransformPlugin: Send + Sync {
    /// Unique plugin name within the transform role.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Applies the transform, returning the rewritten document.
    async fn apply(&self, ctx: &CancellationToken, doc: Document) -> Result<Document>;
}

/// A renderer from canonical documents to output bytes.
pub trait DisplayPlugin: Send + Sync {
    /// Unique plugin name within the display role.
    fn name(&self) -> &str;

    /// Format tag this plugin answers to, matched case-insensitively.
    fn format(&self) -> &str;

    /// Renders the document.
    fn render(&self, ctx: &CancellationToken, doc: &Document) -> Result<Vec<u8>>;
}

/// Name-unique registry for the three plugin roles.
#[derive(Default)]
pub struct PluginRegistry {
    sources: RwLock<BTreeMap<String, Arc<dyn SourcePlugin>>>,
    transforms: RwLock<BTreeMap<String, Arc<dyn TransformPlugin>>>,
    displays: RwLock<BTreeMap<String, Arc<dyn DisplayPlugin>>>,
}

fn validated_name(name: &str, role: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Config(format!("{role} plugin has an empty name")));
    }
    Ok(name.to_string())
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source plugin. Duplicate names are rejected and the
    /// existing registration is kept.
    pub fn register_source(&self, plugin: Arc<dyn SourcePlugin>) -> Result<()> {
        let name = validated_name(plugin.name(), "source")?;
        let mut sources = self
            .sources
            .write()
            .map_err(|_| Error::Unknown("plugin registry lock poisoned".into()))?;
        if sources.contains_key(&name) {
            return Err(Error::Config(format!(
                "source plugin {name:?} is already registered"
            )));
        }
        sources.insert(name, plugin);
        Ok(())
    }

    /// Registers a transform plugin, with the same uniqueness rules.
    pub fn register_transform(&self, plugin: Arc<dyn TransformPlugin>) -> Result<()> {
        let name = validated_name(plugin.name(), "transform")?;
        let mut transforms = self
            .transforms
            .write()
            .map_err(|_| Error::Unknown("plugin registry lock poisoned".into()))?;
        if transforms.contains_key(&name) {
            return Err(Error::Config(format!(
                "transform plugin {name:?} is already registered"
            )));
        }
        transforms.insert(name, plugin);
        Ok(())
    }

    /// Registers a display plugin, with the same uniqueness rules.
    pub fn register_display(&self, plugin: Arc<dyn DisplayPlugin>) -> Result<()> {
        let name = validated_name(plugin.name(), "display")?;
        let mut displays = self
            .displays
            .write()
            .map_err(|_| Error::Unknown("plugin registry lock poisoned".into()))?;
        if displays.contains_key(&name) {
            return Err(Error::Config(format!(
                "display plugin {name:?} is already registered"
            )));
        }
        displays.insert(name, plugin);
        Ok(())
    }

    /// Source plugins in stable (lexicographic) order.
    #[must_use]
    pub fn sources(&self) -> Vec<Arc<dyn SourcePlugin>> {
        self.sources
            .read()
            .map(|sources| sources.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Transform plugins in stable (lexicographic) order.
    #[must_use]
    pub fn transforms(&self) -> Vec<Arc<dyn TransformPlugin>> {
        self.transforms
            .read()
            .map(|transforms| transforms.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Looks up a display plugin by format tag, case-insensitively.
    #[must_use]
    pub fn display_for(&self, format: &str) -> Option<Arc<dyn DisplayPlugin>> {
        let displays = self.displays.read().ok()?;
        displays
            .values()
            .find(|plugin| plugin.format().eq_ignore_ascii_case(format))
            .cloned()
    }

    /// Registered source plugin names, lexicographically.
    #[must_use]
    pub fn list_sources(&self) -> Vec<String> {
        self.sources
            .read()
            .map(|sources| sources.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registered transform plugin names, lexicographically.
    #[must_use]
    pub fn list_transforms(&self) -> Vec<String> {
        self.transforms
            .read()
            .map(|transforms| transforms.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registered display plugin names, lexicographically.
    #[must_use]
    pub fn list_displays(&self) -> Vec<String> {
        self.displays
            .read()
            .map(|displays| displays.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Runs every transform plugin over a normalized document, in stable
    /// order. A failing transform leaves the document as it was and the
    /// chain continues.
    pub async fn apply_transforms(
        &self,
        ctx: &CancellationToken,
        mut doc: Document,
    ) -> Document {
        for transform in self.transforms() {
            match transform.apply(ctx, doc.clone()).await {
                Ok(rewritten) => doc = rewritten,
                Err(e) => {
                    tracing::warn!(plugin = transform.name(), error = %e, "transform failed, skipping");
                },
            }
        }
        doc
    }
}
