//! EngineBuilder for configuring and constructing RiskEngine instances
//!
//! ## Table of Contents
//! - **EngineBuilder**: Builder pattern for engine configuration
//! - **EngineConfig**: Run-level configuration

use crate::engine::RiskEngine;
use crate::error::{Result, RiskError};
use crate::event::{EventKind, EventSource};
use crate::filter::{Filter, ScenarioCache};
use crate::geo::Region;
use tracing::info;

/// Run-level engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run name used in log output
    pub run_name: String,
    /// Abort the whole scan on the first per-site fault instead of
    /// recording it and continuing
    pub abort_on_site_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_name: "risk-scan".to_string(),
            abort_on_site_error: false,
        }
    }
}

/// Builder for constructing RiskEngine instances
pub struct EngineBuilder {
    config: EngineConfig,
    region: Option<Region>,
    chain: Vec<Box<dyn Filter>>,
    cache: Option<ScenarioCache>,
}

impl EngineBuilder {
    /// Create a builder with default configuration and an empty chain
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            region: None,
            chain: Vec::new(),
            cache: None,
        }
    }

    /// Set the region to scan
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Append a stage to the filter chain
    ///
    /// Stages run in the order they were added; validators with their
    /// listeners already registered are added the same way.
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.chain.push(Box::new(filter));
        self
    }

    /// Inject a pre-populated scenario cache
    ///
    /// The cache is always an explicit collaborator; sharing one across
    /// several engines shares their memoized scenarios.
    pub fn with_cache(mut self, cache: ScenarioCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the run name used in logs
    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.config.run_name = name.into();
        self
    }

    /// Abort the scan on the first per-site fault
    pub fn abort_on_site_error(mut self, abort: bool) -> Self {
        self.config.abort_on_site_error = abort;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<RiskEngine> {
        let region = self
            .region
            .ok_or_else(|| RiskError::config("engine needs a region"))?;

        info!(
            run = %self.config.run_name,
            cells = region.number_of_cells(),
            stages = self.chain.len(),
            "building risk engine"
        );

        Ok(RiskEngine {
            region,
            chain: self.chain,
            cache: self.cache.unwrap_or_default(),
            events: EventSource::with_vocabulary([EventKind::Start, EventKind::Stop]),
            run_name: self.config.run_name,
            abort_on_site_error: self.config.abort_on_site_error,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Site;

    fn region() -> Region {
        Region::single_cell_region(Site::new(1.0, 1.0).unwrap())
    }

    #[test]
    fn test_builder_requires_a_region() {
        assert!(EngineBuilder::new().build().is_err());
        assert!(EngineBuilder::new().with_region(region()).build().is_ok());
    }

    #[test]
    fn test_builder_with_injected_cache() {
        let cache = ScenarioCache::new();
        let engine = EngineBuilder::new()
            .with_region(region())
            .with_cache(cache)
            .build()
            .unwrap();
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_builder_config() {
        let engine = EngineBuilder::new()
            .with_region(region())
            .with_run_name("calabria-scenario")
            .abort_on_site_error(true)
            .build()
            .unwrap();
        // the run still covers the single cell
        assert_eq!(engine.region().number_of_cells(), 1);
    }
}
