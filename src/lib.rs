//! # gridrisk
//!
//! A grid-based seismic risk computation engine: scans a gridded region of
//! sites and, for each cell center, drives a chain of pipeline stages that
//! load per-site hazard and exposure data and turn them into loss-ratio
//! exceedance curves, scenario loss statistics, and conditional losses.
//!
//! ## Features
//!
//! - **Region scans**: Deterministic, restartable enumeration of cell centers
//! - **Filter pipeline**: Independently testable stages over a typed per-site context
//! - **Events**: Declared-vocabulary lifecycle and validation events
//! - **Memoization**: Scenario-equivalence cache for the expensive stages
//! - **Loss engine**: LREM × PO, curve summation, second-moment std dev,
//!   conditional loss lookup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridrisk::{EngineBuilder, Region, Site};
//! use gridrisk::stages::{LoadAsset, ScenarioLossRatio, SeedVulnerability};
//! # use gridrisk::function::{DistributionKind, VulnerabilityFunction};
//! # use gridrisk::readers::MemoryAssetReader;
//! # use std::sync::Arc;
//!
//! fn main() -> gridrisk::Result<()> {
//!     let region = Region::new(
//!         Site::new(1.0, 2.0)?,
//!         Site::new(2.0, 1.0)?,
//!         0.5,
//!     )?;
//!
//!     # let vulnerability = Arc::new(VulnerabilityFunction::new(
//!     #     "RC", DistributionKind::LogNormal,
//!     #     vec![0.1, 0.2], vec![0.05, 0.1], vec![0.3, 0.3])?);
//!     # let assets = Arc::new(MemoryAssetReader::new());
//!     let engine = EngineBuilder::new()
//!         .with_region(region)
//!         .with_filter(LoadAsset::new(assets))
//!         .with_filter(SeedVulnerability::new(vulnerability))
//!         .with_filter(ScenarioLossRatio::new(0.3, 0.2))
//!         .build()?;
//!
//!     let report = engine.run()?;
//!     for (site, pipe) in report.completed() {
//!         println!("{}: loss ratio {:?}", site, pipe.loss_ratio());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod cache;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod function;
pub mod geo;
pub mod instrument;
pub mod loss;
pub mod pipe;
pub mod readers;
pub mod stages;

// Re-exports for ergonomic API
pub use builder::{EngineBuilder, EngineConfig};
pub use cache::{Cache, ScenarioKey};
pub use distribution::{Distribution, LogNormal};
pub use engine::{RiskEngine, RunReport, SiteOutcome, SiteResult};
pub use error::{Result, RiskError};
pub use event::{DispatchListener, EventKind, EventSource, Listener};
pub use filter::{Control, Filter, ScenarioCache, Specification, Validator};
pub use function::{DiscreteFunction, HazardCurve, Lrem, VulnerabilityFunction};
pub use geo::{Region, Site};
pub use loss::ScenarioLoss;
pub use pipe::Pipe;
pub use readers::{Asset, AssetReader, ExposureReader, HazardReader};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::EngineBuilder;
    pub use crate::error::Result;
    pub use crate::event::{EventKind, Listener};
    pub use crate::filter::{Control, Filter, Specification, Validator};
    pub use crate::geo::{Region, Site};
    pub use crate::pipe::Pipe;
    pub use crate::readers::{Asset, AssetReader, HazardReader};
}
