//! Per-site computation context shared by pipeline stages
//!
//! ## Table of Contents
//! - **Pipe**: Strongly-typed context, progressively populated by filters
//!
//! The pipe holds named, typed slots rather than an untyped key→value map.
//! Inputs written by earlier stages are read back through `Result`-returning
//! accessors, so a stage running before its inputs are ready surfaces a typed
//! `MissingInput` fault instead of an unchecked cast.

use crate::distribution::BoxedDistribution;
use crate::error::{Result, RiskError};
use crate::function::{DiscreteFunction, HazardCurve, Lrem, VulnerabilityFunction};
use crate::geo::{Region, Site};
use crate::readers::Asset;
use std::sync::Arc;

/// Per-site computation context
///
/// Created once per site by the engine, populated by the filter chain, and
/// either discarded with the site or handed back to the caller to read the
/// result slots. Not shared across sites.
#[derive(Clone)]
pub struct Pipe {
    site: Site,
    region: Region,

    // Inputs loaded by the chain
    asset: Option<Asset>,
    hazard_curve: Option<HazardCurve>,
    vulnerability: Option<Arc<VulnerabilityFunction>>,
    distribution: Option<BoxedDistribution>,
    lrem: Option<Arc<Lrem>>,

    // Result slots read by the caller
    loss_ratio: Option<f64>,
    loss_ratio_std_dev: Option<f64>,
    loss: Option<f64>,
    loss_std_dev: Option<f64>,
    loss_ratio_curve: Option<DiscreteFunction>,
    loss_curve: Option<DiscreteFunction>,
    conditional_loss: Option<f64>,
}

impl Pipe {
    /// Create a pipe seeded with the current site and its region
    pub fn new(site: Site, region: Region) -> Self {
        Self {
            site,
            region,
            asset: None,
            hazard_curve: None,
            vulnerability: None,
            distribution: None,
            lrem: None,
            loss_ratio: None,
            loss_ratio_std_dev: None,
            loss: None,
            loss_std_dev: None,
            loss_ratio_curve: None,
            loss_curve: None,
            conditional_loss: None,
        }
    }

    /// The site this pipe computes
    pub fn site(&self) -> Site {
        self.site
    }

    /// The region the scan is running over
    pub fn region(&self) -> &Region {
        &self.region
    }

    // Inputs

    /// Store the asset for this site
    pub fn set_asset(&mut self, asset: Asset) {
        self.asset = Some(asset);
    }

    /// Asset loaded by an earlier stage
    pub fn asset(&self) -> Result<&Asset> {
        self.asset.as_ref().ok_or(RiskError::MissingInput("asset"))
    }

    /// Store the hazard curve for this site
    pub fn set_hazard_curve(&mut self, curve: HazardCurve) {
        self.hazard_curve = Some(curve);
    }

    /// Hazard curve loaded by an earlier stage
    pub fn hazard_curve(&self) -> Result<&HazardCurve> {
        self.hazard_curve
            .as_ref()
            .ok_or(RiskError::MissingInput("hazard curve"))
    }

    /// Store the vulnerability function in play
    pub fn set_vulnerability(&mut self, function: Arc<VulnerabilityFunction>) {
        self.vulnerability = Some(function);
    }

    /// Vulnerability function seeded by an earlier stage
    pub fn vulnerability(&self) -> Result<&Arc<VulnerabilityFunction>> {
        self.vulnerability
            .as_ref()
            .ok_or(RiskError::MissingInput("vulnerability function"))
    }

    /// Store the distribution built for this scenario
    pub fn set_distribution(&mut self, distribution: BoxedDistribution) {
        self.distribution = Some(distribution);
    }

    /// Distribution built by an earlier stage
    pub fn distribution(&self) -> Result<&BoxedDistribution> {
        self.distribution
            .as_ref()
            .ok_or(RiskError::MissingInput("distribution"))
    }

    /// Store the loss-ratio exceedance matrix
    pub fn set_lrem(&mut self, lrem: Arc<Lrem>) {
        self.lrem = Some(lrem);
    }

    /// LREM seeded by an earlier stage
    pub fn lrem(&self) -> Result<&Arc<Lrem>> {
        self.lrem.as_ref().ok_or(RiskError::MissingInput("LREM"))
    }

    // Results

    /// Record the mean loss ratio
    pub fn set_loss_ratio(&mut self, value: f64) {
        self.loss_ratio = Some(value);
    }

    /// Mean loss ratio, if computed
    pub fn loss_ratio(&self) -> Option<f64> {
        self.loss_ratio
    }

    /// Record the loss-ratio standard deviation
    pub fn set_loss_ratio_std_dev(&mut self, value: f64) {
        self.loss_ratio_std_dev = Some(value);
    }

    /// Loss-ratio standard deviation, if computed
    pub fn loss_ratio_std_dev(&self) -> Option<f64> {
        self.loss_ratio_std_dev
    }

    /// Record the absolute loss
    pub fn set_loss(&mut self, value: f64) {
        self.loss = Some(value);
    }

    /// Absolute loss, if computed
    pub fn loss(&self) -> Option<f64> {
        self.loss
    }

    /// Record the absolute-loss standard deviation
    pub fn set_loss_std_dev(&mut self, value: f64) {
        self.loss_std_dev = Some(value);
    }

    /// Absolute-loss standard deviation, if computed
    pub fn loss_std_dev(&self) -> Option<f64> {
        self.loss_std_dev
    }

    /// Record the loss-ratio curve
    pub fn set_loss_ratio_curve(&mut self, curve: DiscreteFunction) {
        self.loss_ratio_curve = Some(curve);
    }

    /// Loss-ratio curve, if computed
    pub fn loss_ratio_curve(&self) -> Option<&DiscreteFunction> {
        self.loss_ratio_curve.as_ref()
    }

    /// Record the loss curve
    pub fn set_loss_curve(&mut self, curve: DiscreteFunction) {
        self.loss_curve = Some(curve);
    }

    /// Loss curve, if computed
    pub fn loss_curve(&self) -> Option<&DiscreteFunction> {
        self.loss_curve.as_ref()
    }

    /// Record the conditional loss
    pub fn set_conditional_loss(&mut self, value: f64) {
        self.conditional_loss = Some(value);
    }

    /// Conditional loss, if computed
    pub fn conditional_loss(&self) -> Option<f64> {
        self.conditional_loss
    }
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("site", &self.site)
            .field("asset", &self.asset)
            .field("loss_ratio", &self.loss_ratio)
            .field("loss", &self.loss)
            .field("conditional_loss", &self.conditional_loss)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Region, Site};

    fn pipe() -> Pipe {
        let site = Site::new(1.0, 1.0).unwrap();
        Pipe::new(site, Region::single_cell_region(site))
    }

    #[test]
    fn test_missing_inputs_are_typed_faults() {
        let p = pipe();
        assert!(matches!(p.asset(), Err(RiskError::MissingInput("asset"))));
        assert!(matches!(
            p.hazard_curve(),
            Err(RiskError::MissingInput("hazard curve"))
        ));
        assert!(p.vulnerability().is_err());
        assert!(p.distribution().is_err());
        assert!(p.lrem().is_err());
    }

    #[test]
    fn test_result_slots_start_empty() {
        let p = pipe();
        assert!(p.loss_ratio().is_none());
        assert!(p.loss_ratio_curve().is_none());
        assert!(p.conditional_loss().is_none());
    }

    #[test]
    fn test_populated_slots_read_back() {
        let mut p = pipe();
        p.set_asset(Asset::new(1000.0, p.site()));
        p.set_loss_ratio(0.25);
        assert_eq!(p.asset().unwrap().value(), 1000.0);
        assert_eq!(p.loss_ratio(), Some(0.25));
    }
}
