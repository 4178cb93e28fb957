//! Coordinate resolution.
//!
//! Explicit coordinates are parsed offline by [`parser`]. Bare names go
//! through a [`NameResolver`] backend (the in-memory [`LocalNameResolver`] or,
//! with the `sesame` feature, the CDS Sesame service), wrapped by
//! [`CoordinateResolver`] which adds timeouts, retries and caching.

pub mod local;
pub mod parser;
#[cfg(feature = "sesame")]
pub mod sesame;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ResolverService, ResolverSettings};
use crate::error::{PlannerError, PlannerResult};
use crate::models::{CoordUnits, Coordinate, Frame, Target};

pub use local::LocalNameResolver;
pub use parser::{parse_coordinate, parse_coordinate_str, CoordinateInput};
#[cfg(feature = "sesame")]
pub use sesame::SesameNameResolver;

/// Backend that turns an object name into a coordinate.
///
/// Implementations report a definitive miss as
/// [`PlannerError::NameNotResolved`] and transport problems as
/// [`PlannerError::Network`]; only the latter is retried.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup(&self, identifier: &str) -> PlannerResult<Coordinate>;

    /// Short backend name for logs.
    fn service_name(&self) -> &'static str;
}

/// Input to [`CoordinateResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Object name, used for lookup when no coordinates are given.
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<CoordinateInput>,
    #[serde(default)]
    pub units: Option<CoordUnits>,
    #[serde(default)]
    pub frame: Frame,
    #[serde(default = "default_allow_name_lookup")]
    pub allow_name_lookup: bool,
}

fn default_allow_name_lookup() -> bool {
    true
}

impl ResolveRequest {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: None,
            units: None,
            frame: Frame::default(),
            allow_name_lookup: true,
        }
    }

    pub fn with_coordinates(mut self, coordinates: impl Into<CoordinateInput>) -> Self {
        self.coordinates = Some(coordinates.into());
        self
    }

    pub fn units(mut self, units: CoordUnits) -> Self {
        self.units = Some(units);
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn name_lookup(mut self, allow: bool) -> Self {
        self.allow_name_lookup = allow;
        self
    }
}

type CacheKey = (String, Frame, Option<CoordUnits>);

/// Name resolution with per-attempt timeout, bounded retries and a cache.
#[derive(Clone)]
pub struct CoordinateResolver {
    backend: Arc<dyn NameResolver>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    cache: Option<Arc<RwLock<HashMap<CacheKey, Coordinate>>>>,
}

impl std::fmt::Debug for CoordinateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateResolver")
            .field("backend", &self.backend.service_name())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("cached", &self.cache_len())
            .finish()
    }
}

impl CoordinateResolver {
    pub fn new(backend: Arc<dyn NameResolver>) -> Self {
        Self::with_settings(backend, &ResolverSettings::default())
    }

    pub fn with_settings(backend: Arc<dyn NameResolver>, settings: &ResolverSettings) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            cache: settings
                .cache
                .then(|| Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// Resolver for the configured backend.
    pub fn from_settings(settings: &ResolverSettings) -> PlannerResult<Self> {
        let backend: Arc<dyn NameResolver> = match settings.service {
            ResolverService::Local => Arc::new(LocalNameResolver::from_table(&settings.names)?),
            #[cfg(feature = "sesame")]
            ResolverService::Sesame => Arc::new(SesameNameResolver::new(
                &settings.sesame_url,
                Duration::from_secs(settings.timeout_secs),
            )?),
            #[cfg(not(feature = "sesame"))]
            ResolverService::Sesame => {
                return Err(PlannerError::Configuration(
                    "the sesame resolver needs the `sesame` feature".to_string(),
                ))
            }
        };
        log::info!("Using {} name resolver", backend.service_name());
        Ok(Self::with_settings(backend, settings))
    }

    pub fn service_name(&self) -> &'static str {
        self.backend.service_name()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.read().len())
    }

    /// Resolve the coordinate a request describes.
    ///
    /// Explicit coordinates win and never touch the network. A name that
    /// parses as a coordinate under explicit units is treated the same way.
    /// Otherwise the name is looked up when allowed, and `Ok(None)` is
    /// returned when it is not.
    pub async fn resolve(&self, request: &ResolveRequest) -> PlannerResult<Option<Coordinate>> {
        if let Some(input) = &request.coordinates {
            return parse_coordinate(input, request.units, request.frame).map(Some);
        }
        if request.units.is_some() {
            if let Ok(c) = parse_coordinate_str(&request.name, request.units, request.frame) {
                return Ok(Some(c));
            }
        }
        if !request.allow_name_lookup {
            return Ok(None);
        }
        self.lookup(&request.name, request.frame, request.units)
            .await
            .map(Some)
    }

    /// Build a target from a request; without a coordinate the target is
    /// still created.
    pub async fn resolve_target(&self, request: &ResolveRequest) -> PlannerResult<Target> {
        let coordinate = self.resolve(request).await?;
        let mut target = Target::new(request.name.clone());
        target.set_coordinate(coordinate);
        Ok(target)
    }

    /// Look a name up through the backend.
    pub async fn lookup(
        &self,
        identifier: &str,
        frame: Frame,
        units: Option<CoordUnits>,
    ) -> PlannerResult<Coordinate> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(PlannerError::NameNotResolved(
                "empty identifier".to_string(),
            ));
        }

        let key = (identifier.to_string(), frame, units);
        let cached = self.cache.as_ref().and_then(|c| c.read().get(&key).copied());
        if let Some(hit) = cached {
            log::debug!("Resolver cache hit for '{}'", identifier);
            return Ok(hit);
        }

        let coordinate = self.lookup_with_retry(identifier).await?;
        log::info!(
            "Resolved '{}' via {}: {}",
            identifier,
            self.backend.service_name(),
            coordinate
        );

        if let Some(cache) = &self.cache {
            cache.write().insert(key, coordinate);
        }
        Ok(coordinate)
    }

    async fn lookup_with_retry(&self, identifier: &str) -> PlannerResult<Coordinate> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!(
                    "Retrying lookup of '{}' (attempt {}/{})",
                    identifier,
                    attempt + 1,
                    self.max_retries + 1
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            let result = match tokio::time::timeout(self.timeout, self.backend.lookup(identifier)).await
            {
                Ok(result) => result,
                Err(_) => Err(PlannerError::Network(format!(
                    "{} did not answer within {:?}",
                    self.backend.service_name(),
                    self.timeout
                ))),
            };

            match result {
                Ok(coordinate) => return Ok(coordinate),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PlannerError::Network("max retries exceeded with no error captured".to_string())
        }))
    }
}
