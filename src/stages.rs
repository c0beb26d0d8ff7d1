//! Concrete pipeline stages for the risk computation chain
//!
//! ## Table of Contents
//! - **LoadAsset / LoadHazardCurve**: Reader-backed input stages
//! - **SeedVulnerability**: Seeds the vulnerability function and LREM
//! - **ScenarioLossRatio**: Cached deterministic-scenario mean and std dev
//! - **AbsoluteLoss**: Scales ratio results by the asset value
//! - **ClassicalLossRatioCurve**: LREM × PO and row summation
//! - **LossCurve**: Ratio curve scaled to absolute losses
//! - **ConditionalLoss**: Loss at a target exceedance probability
//! - **NonEmptyAsset**: Specification skipping no-data cells

use crate::distribution;
use crate::error::{Result, RiskError};
use crate::filter::{Control, Filter, ScenarioCache, Specification, Validator};
use crate::function::{HazardCurve, Lrem, VulnerabilityFunction};
use crate::loss;
use crate::cache::ScenarioKey;
use crate::pipe::Pipe;
use crate::readers::{AssetReader, HazardReader};
use std::sync::Arc;
use tracing::debug;

/// Loads the asset for the current site
pub struct LoadAsset {
    reader: Arc<dyn AssetReader>,
}

impl LoadAsset {
    /// Create the stage over an asset reader
    pub fn new(reader: Arc<dyn AssetReader>) -> Self {
        Self { reader }
    }
}

impl Filter for LoadAsset {
    fn name(&self) -> &str {
        "load-asset"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let asset = self.reader.read_at(pipe.site())?;
        debug!(site = %pipe.site(), value = asset.value(), empty = asset.is_empty(), "asset loaded");
        pipe.set_asset(asset);
        Ok(Control::Continue)
    }
}

/// Loads the hazard curve for the current site
pub struct LoadHazardCurve {
    reader: Arc<dyn HazardReader<HazardCurve>>,
}

impl LoadHazardCurve {
    /// Create the stage over a hazard reader
    pub fn new(reader: Arc<dyn HazardReader<HazardCurve>>) -> Self {
        Self { reader }
    }
}

impl Filter for LoadHazardCurve {
    fn name(&self) -> &str {
        "load-hazard-curve"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let curve = self.reader.read_at(pipe.site())?;
        debug!(site = %pipe.site(), points = curve.function().len(), "hazard curve loaded");
        pipe.set_hazard_curve(curve);
        Ok(Control::Continue)
    }
}

/// Seeds the vulnerability function (and optionally its LREM) into the pipe
pub struct SeedVulnerability {
    function: Arc<VulnerabilityFunction>,
    lrem: Option<Arc<Lrem>>,
}

impl SeedVulnerability {
    /// Seed the given vulnerability function
    pub fn new(function: Arc<VulnerabilityFunction>) -> Self {
        Self {
            function,
            lrem: None,
        }
    }

    /// Also seed the externally supplied LREM
    pub fn with_lrem(mut self, lrem: Arc<Lrem>) -> Self {
        self.lrem = Some(lrem);
        self
    }
}

impl Filter for SeedVulnerability {
    fn name(&self) -> &str {
        "seed-vulnerability"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        pipe.set_vulnerability(self.function.clone());
        if let Some(lrem) = &self.lrem {
            pipe.set_lrem(lrem.clone());
        }
        Ok(Control::Continue)
    }
}

/// Deterministic-scenario mean loss ratio and standard deviation
///
/// The expensive second-moment integration runs at most once per distinct
/// `(vulnerability, mean, cov)` triple; subsequent sites hit the cache.
pub struct ScenarioLossRatio {
    mean: f64,
    cov: f64,
}

impl ScenarioLossRatio {
    /// Create the stage for scenario moments parsed from the input model
    pub fn new(mean: f64, cov: f64) -> Self {
        Self { mean, cov }
    }
}

impl Filter for ScenarioLossRatio {
    fn name(&self) -> &str {
        "scenario-loss-ratio"
    }

    fn apply(&self, cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let function = pipe.vulnerability()?.clone();
        let dist = distribution::for_kind(function.distribution_kind(), self.mean, self.cov)?;

        let key = ScenarioKey::new(&function, self.mean, self.cov);
        let result =
            cache.get_or_compute(key, || loss::scenario_loss_ratio(&function, dist.as_ref()))?;

        debug!(
            site = %pipe.site(),
            mean = result.mean,
            std_dev = result.std_dev,
            "scenario loss ratio"
        );
        pipe.set_distribution(dist);
        pipe.set_loss_ratio(result.mean);
        pipe.set_loss_ratio_std_dev(result.std_dev);
        Ok(Control::Continue)
    }
}

/// Scales the ratio results by the asset value into absolute losses
pub struct AbsoluteLoss;

impl Filter for AbsoluteLoss {
    fn name(&self) -> &str {
        "absolute-loss"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let value = pipe.asset()?.value();
        let ratio = pipe
            .loss_ratio()
            .ok_or(RiskError::MissingInput("loss ratio result"))?;
        let std_dev = pipe
            .loss_ratio_std_dev()
            .ok_or(RiskError::MissingInput("loss ratio std dev result"))?;
        pipe.set_loss(ratio * value);
        pipe.set_loss_std_dev(std_dev * value);
        Ok(Control::Continue)
    }
}

/// Classical loss-ratio curve: LREM × PO, then row summation
pub struct ClassicalLossRatioCurve {
    ratios: Arc<Vec<f64>>,
}

impl ClassicalLossRatioCurve {
    /// Create the stage with the externally supplied loss-ratio bins
    pub fn new(ratios: Vec<f64>) -> Self {
        Self {
            ratios: Arc::new(ratios),
        }
    }
}

impl Filter for ClassicalLossRatioCurve {
    fn name(&self) -> &str {
        "classical-loss-ratio-curve"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let lrem = pipe.lrem()?.clone();
        let imls = pipe.vulnerability()?.imls().to_vec();
        let scaled = loss::lrem_times_po(&lrem, pipe.hazard_curve()?, &imls)?;
        let curve = loss::loss_ratio_curve(&scaled, &self.ratios)?;
        debug!(site = %pipe.site(), points = curve.len(), "loss ratio curve computed");
        pipe.set_loss_ratio_curve(curve);
        Ok(Control::Continue)
    }
}

/// Scales the loss-ratio curve into an absolute-loss curve
pub struct LossCurve;

impl Filter for LossCurve {
    fn name(&self) -> &str {
        "loss-curve"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let value = pipe.asset()?.value();
        let ratio_curve = pipe
            .loss_ratio_curve()
            .ok_or(RiskError::MissingInput("loss ratio curve result"))?;
        pipe.set_loss_curve(loss::scale_abscissae(ratio_curve, value));
        Ok(Control::Continue)
    }
}

/// Conditional loss at a target probability of exceedance
///
/// Uses the loss curve when present, falling back to the loss-ratio curve.
pub struct ConditionalLoss {
    probability: f64,
}

impl ConditionalLoss {
    /// Create the stage for the given target probability
    pub fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl Filter for ConditionalLoss {
    fn name(&self) -> &str {
        "conditional-loss"
    }

    fn apply(&self, _cache: &ScenarioCache, pipe: &mut Pipe) -> Result<Control> {
        let curve = pipe
            .loss_curve()
            .or_else(|| pipe.loss_ratio_curve())
            .ok_or(RiskError::MissingInput("loss curve result"))?;
        let value = loss::conditional_loss(curve, self.probability)?;
        pipe.set_conditional_loss(value);
        Ok(Control::Continue)
    }
}

/// Specification satisfied when the site holds a non-empty asset
pub struct NonEmptyAsset;

impl Specification for NonEmptyAsset {
    fn is_satisfied_by(&self, pipe: &Pipe) -> bool {
        pipe.asset().map(|a| !a.is_empty()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        "non-empty-asset"
    }
}

/// Validator skipping sites whose cells carry no exposure data
pub fn non_empty_asset_validator() -> Validator {
    Validator::new(NonEmptyAsset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::DistributionKind;
    use crate::geo::{Region, Site};
    use crate::readers::{Asset, MemoryAssetReader, MemoryHazardReader};

    fn site() -> Site {
        Site::new(1.0, 2.0).unwrap()
    }

    fn pipe() -> Pipe {
        Pipe::new(site(), Region::single_cell_region(site()))
    }

    fn vulnerability() -> Arc<VulnerabilityFunction> {
        Arc::new(
            VulnerabilityFunction::new(
                "RC/DMRF-D/LR",
                DistributionKind::LogNormal,
                vec![0.1, 0.2],
                vec![0.05, 0.1],
                vec![0.3, 0.3],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_load_stages_populate_the_pipe() {
        let mut assets = MemoryAssetReader::new();
        assets.insert(site(), Asset::new(1000.0, site()));
        let mut hazards = MemoryHazardReader::new();
        hazards.insert(site(), HazardCurve::from_pairs([(0.1, 0.5), (0.2, 0.25)]));

        let cache = ScenarioCache::new();
        let mut p = pipe();
        LoadAsset::new(Arc::new(assets)).apply(&cache, &mut p).unwrap();
        LoadHazardCurve::new(Arc::new(hazards))
            .apply(&cache, &mut p)
            .unwrap();

        assert_eq!(p.asset().unwrap().value(), 1000.0);
        assert!(p.hazard_curve().unwrap().is_computable());
    }

    #[test]
    fn test_reader_miss_is_a_reader_fault() {
        let cache = ScenarioCache::new();
        let mut p = pipe();
        let stage = LoadAsset::new(Arc::new(MemoryAssetReader::new()));
        assert!(matches!(
            stage.apply(&cache, &mut p),
            Err(RiskError::Reader(_))
        ));
    }

    #[test]
    fn test_scenario_stage_hits_cache_on_second_site() {
        let cache = ScenarioCache::new();
        let stage = ScenarioLossRatio::new(0.3, 0.2);
        let seed = SeedVulnerability::new(vulnerability());

        let mut first = pipe();
        seed.apply(&cache, &mut first).unwrap();
        stage.apply(&cache, &mut first).unwrap();
        assert_eq!(cache.len(), 1);

        let mut second = pipe();
        seed.apply(&cache, &mut second).unwrap();
        stage.apply(&cache, &mut second).unwrap();
        assert_eq!(cache.len(), 1);

        assert_eq!(first.loss_ratio(), second.loss_ratio());
        assert_eq!(first.loss_ratio_std_dev(), second.loss_ratio_std_dev());
    }

    #[test]
    fn test_absolute_loss_scales_by_asset_value() {
        let cache = ScenarioCache::new();
        let mut p = pipe();
        p.set_asset(Asset::new(2000.0, site()));
        p.set_loss_ratio(0.25);
        p.set_loss_ratio_std_dev(0.1);

        AbsoluteLoss.apply(&cache, &mut p).unwrap();
        assert_eq!(p.loss(), Some(500.0));
        assert_eq!(p.loss_std_dev(), Some(200.0));
    }

    #[test]
    fn test_classical_chain_through_conditional_loss() {
        let cache = ScenarioCache::new();
        let mut p = pipe();
        p.set_asset(Asset::new(1000.0, site()));
        p.set_hazard_curve(HazardCurve::from_pairs([(0.1, 0.5), (0.2, 0.25)]));
        SeedVulnerability::new(vulnerability())
            .with_lrem(Arc::new(
                Lrem::from_rows(vec![vec![6.0, 8.0], vec![2.0, 4.0]]).unwrap(),
            ))
            .apply(&cache, &mut p)
            .unwrap();

        ClassicalLossRatioCurve::new(vec![0.1, 0.2])
            .apply(&cache, &mut p)
            .unwrap();
        let ratio_curve = p.loss_ratio_curve().unwrap();
        assert_eq!(ratio_curve.value_at(0.1).unwrap(), 5.0);
        assert_eq!(ratio_curve.value_at(0.2).unwrap(), 2.0);

        LossCurve.apply(&cache, &mut p).unwrap();
        let loss_curve = p.loss_curve().unwrap();
        assert_eq!(loss_curve.value_at(100.0).unwrap(), 5.0);

        ConditionalLoss::new(3.5).apply(&cache, &mut p).unwrap();
        // halfway between the PoEs 5.0 (loss 100) and 2.0 (loss 200)
        assert_eq!(p.conditional_loss(), Some(150.0));
    }

    #[test]
    fn test_missing_lrem_is_a_typed_fault() {
        let cache = ScenarioCache::new();
        let mut p = pipe();
        p.set_hazard_curve(HazardCurve::from_pairs([(0.1, 0.5)]));
        SeedVulnerability::new(vulnerability())
            .apply(&cache, &mut p)
            .unwrap();
        assert!(matches!(
            ClassicalLossRatioCurve::new(vec![0.1]).apply(&cache, &mut p),
            Err(RiskError::MissingInput("LREM"))
        ));
    }

    #[test]
    fn test_non_empty_asset_specification() {
        let spec = NonEmptyAsset;
        let mut p = pipe();
        assert!(!spec.is_satisfied_by(&p));
        p.set_asset(Asset::empty(site()));
        assert!(!spec.is_satisfied_by(&p));
        p.set_asset(Asset::new(10.0, site()));
        assert!(spec.is_satisfied_by(&p));
    }
}
