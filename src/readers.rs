//! Reader interfaces and in-memory data sources
//!
//! ## Table of Contents
//! - **Asset**: Exposed value at a site, with an empty sentinel for no-data cells
//! - **AssetReader / HazardReader / ExposureReader**: Per-site reader capabilities
//! - **MemoryAssetReader / MemoryHazardReader**: In-memory sources for tests and fixtures
//! - **ExposureAssetAdapter**: Turns raw exposure amounts into assets
//!
//! File-format-specific adapters (binary grids, ASCII curve files) live
//! outside this crate; the engine only requires these per-site contracts:
//! no shared state, a deterministic result per site, and a typed fault on
//! malformed input.

use crate::error::{Result, RiskError};
use crate::function::HazardCurve;
use crate::geo::Site;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The exposed value at a site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    value: f64,
    site: Site,
    empty: bool,
}

impl Asset {
    /// An asset with the given exposed value
    pub fn new(value: f64, site: Site) -> Self {
        Self {
            value,
            site,
            empty: false,
        }
    }

    /// Sentinel asset for a cell with no exposure data
    pub fn empty(site: Site) -> Self {
        Self {
            value: 0.0,
            site,
            empty: true,
        }
    }

    /// Exposed value (zero for the empty sentinel)
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Site the asset sits on
    pub fn site(&self) -> Site {
        self.site
    }

    /// Whether this is the no-data sentinel
    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

/// Per-site asset source
pub trait AssetReader: Send + Sync {
    /// Asset at the given site
    fn read_at(&self, site: Site) -> Result<Asset>;
}

/// Per-site hazard data source
pub trait HazardReader<T>: Send + Sync {
    /// Hazard data at the given site
    fn read_at(&self, site: Site) -> Result<T>;
}

/// Per-site raw exposure source (amounts, pre-asset)
pub trait ExposureReader: Send + Sync {
    /// Raw exposed amount at the given site
    fn read_at(&self, site: Site) -> Result<f64>;
}

fn load_fixture<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&contents)?)
}

/// In-memory asset source
///
/// Lookup uses the tolerant site equality, so cell centers produced by grid
/// traversal match the seeded coordinates.
#[derive(Debug, Default)]
pub struct MemoryAssetReader {
    assets: Vec<(Site, Asset)>,
}

impl MemoryAssetReader {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an asset at a site
    pub fn insert(&mut self, site: Site, asset: Asset) {
        self.assets.push((site, asset));
    }

    /// Load `[(site, asset)]` pairs from a JSON fixture
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            assets: load_fixture(path)?,
        })
    }
}

impl AssetReader for MemoryAssetReader {
    fn read_at(&self, site: Site) -> Result<Asset> {
        self.assets
            .iter()
            .find(|(s, _)| *s == site)
            .map(|(_, a)| *a)
            .ok_or_else(|| RiskError::reader(format!("no asset data at {}", site)))
    }
}

/// In-memory hazard curve source
#[derive(Debug, Default)]
pub struct MemoryHazardReader {
    curves: Vec<(Site, HazardCurve)>,
}

impl MemoryHazardReader {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a hazard curve at a site
    pub fn insert(&mut self, site: Site, curve: HazardCurve) {
        self.curves.push((site, curve));
    }

    /// Load `[(site, curve)]` pairs from a JSON fixture
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            curves: load_fixture(path)?,
        })
    }
}

impl HazardReader<HazardCurve> for MemoryHazardReader {
    fn read_at(&self, site: Site) -> Result<HazardCurve> {
        self.curves
            .iter()
            .find(|(s, _)| *s == site)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| RiskError::reader(format!("no hazard data at {}", site)))
    }
}

/// Adapter turning raw exposure amounts into assets
///
/// Amounts equal to the source's no-data marker become the empty-asset
/// sentinel rather than a zero-valued asset.
pub struct ExposureAssetAdapter<E> {
    exposure: E,
    no_data: f64,
}

impl<E: ExposureReader> ExposureAssetAdapter<E> {
    /// Wrap an exposure reader whose no-data cells carry `no_data`
    pub fn new(exposure: E, no_data: f64) -> Self {
        Self { exposure, no_data }
    }
}

impl<E: ExposureReader> AssetReader for ExposureAssetAdapter<E> {
    fn read_at(&self, site: Site) -> Result<Asset> {
        let amount = self.exposure.read_at(site)?;
        if amount == self.no_data {
            Ok(Asset::empty(site))
        } else {
            Ok(Asset::new(amount, site))
        }
    }
}
