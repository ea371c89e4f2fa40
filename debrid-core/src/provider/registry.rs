// Source Registry
//
// Factory-based registry building one adapter per configured source

use std::collections::BTreeMap;

use super::{
    AllDebridSource, DebridSource, OffCloudSource, PremiumizeSource, RealDebridSource, SourceConfig, SourceContext,
    TorBoxSource,
};
use crate::config::ProvidersConfig;
use crate::error::{DebridError, Result};
use crate::models::SourceId;

/// Adapter factory function type
pub type SourceFactory = Box<dyn Fn(&SourceContext, SourceConfig) -> Box<dyn DebridSource> + Send + Sync>;

/// Wrap an adapter constructor into a factory
pub fn factory<S>(make: fn(&SourceContext, SourceConfig) -> S) -> SourceFactory
where
    S: DebridSource + 'static,
{
    Box::new(move |ctx: &SourceContext, config: SourceConfig| -> Box<dyn DebridSource> { Box::new(make(ctx, config)) })
}

/// Source registry
///
/// Each source id registers a factory; `build_enabled` creates the adapters
/// in display order.
pub struct SourceRegistry {
    factories: BTreeMap<SourceId, SourceFactory>,
}

impl SourceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the five built-in adapters
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_factory(SourceId::RealDebrid, factory(RealDebridSource::new));
        registry.register_factory(SourceId::AllDebrid, factory(AllDebridSource::new));
        registry.register_factory(SourceId::Premiumize, factory(PremiumizeSource::new));
        registry.register_factory(SourceId::TorBox, factory(TorBoxSource::new));
        registry.register_factory(SourceId::OffCloud, factory(OffCloudSource::new));
        registry
    }

    /// Register (or replace) the factory of a source
    pub fn register_factory(&mut self, id: SourceId, factory: SourceFactory) {
        self.factories.insert(id, factory);
    }

    /// Build one adapter
    pub fn create(&self, id: SourceId, ctx: &SourceContext, config: SourceConfig) -> Result<Box<dyn DebridSource>> {
        let factory = self.factories.get(&id).ok_or(DebridError::NotImplemented)?;
        Ok(factory(ctx, config))
    }

    /// Build every enabled source that has a factory
    #[must_use]
    pub fn build_enabled(&self, providers: &ProvidersConfig, ctx: &SourceContext) -> Vec<Box<dyn DebridSource>> {
        SourceId::ALL
            .into_iter()
            .filter(|id| providers.get(*id).enabled)
            .filter_map(|id| {
                let factory = self.factories.get(&id)?;
                tracing::debug!(source = %id, "Building debrid source");
                Some(factory(ctx, providers.get(id).clone()))
            })
            .collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
