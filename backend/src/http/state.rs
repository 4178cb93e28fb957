//! Application state for the HTTP server.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{PlannerConfig, VisibilitySettings};
use crate::error::PlannerResult;
use crate::models::{SiteRegistry, TargetCatalog};
use crate::resolver::CoordinateResolver;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session target catalog
    pub catalog: Arc<RwLock<TargetCatalog>>,
    /// Name resolution backend
    pub resolver: CoordinateResolver,
    /// Known observing sites
    pub sites: Arc<SiteRegistry>,
    /// Sampling defaults for visibility queries
    pub visibility: Arc<VisibilitySettings>,
}

impl AppState {
    /// Build state from configuration, using the configured resolver.
    pub fn new(config: &PlannerConfig) -> PlannerResult<Self> {
        let resolver = CoordinateResolver::from_settings(&config.resolver)?;
        Self::with_resolver(config, resolver)
    }

    /// Build state around an explicit resolver.
    pub fn with_resolver(config: &PlannerConfig, resolver: CoordinateResolver) -> PlannerResult<Self> {
        Ok(Self {
            catalog: Arc::new(RwLock::new(TargetCatalog::new())),
            resolver,
            sites: Arc::new(config.site_registry()?),
            visibility: Arc::new(config.visibility.clone()),
        })
    }
}
