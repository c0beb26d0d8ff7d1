//! Probability distributions over intensity measure levels
//!
//! ## Table of Contents
//! - **Distribution**: Trait exposing cumulative probability over an interval
//! - **LogNormal**: Log-normal distribution parameterized by (mean, cov)

use crate::error::{Result, RiskError};
use crate::function::DistributionKind;
use statrs::distribution::ContinuousCDF;
use std::sync::Arc;

/// Trait for probability distributions used by the loss-ratio engine
///
/// Implementations are stateless and safe to share across sites once
/// constructed for a given (mean, cov, kind) triple, which is exactly what
/// the scenario cache memoizes.
pub trait Distribution: Send + Sync {
    /// `P(lower ≤ X ≤ upper)` for the configured distribution
    fn cumulative_probability(&self, lower: f64, upper: f64) -> f64;

    /// Distribution name for logging
    fn name(&self) -> &str {
        "custom"
    }
}

/// Type alias for a shared distribution
pub type BoxedDistribution = Arc<dyn Distribution>;

/// Log-normal distribution built from a mean and coefficient of variation
#[derive(Debug, Clone)]
pub struct LogNormal {
    inner: statrs::distribution::LogNormal,
}

impl LogNormal {
    /// Build from the arithmetic mean and coefficient of variation
    ///
    /// Uses the moment-matching parameterization
    /// `sigma^2 = ln(1 + cov^2)`, `mu = ln(mean) - sigma^2 / 2`.
    /// Both moments must be positive for the parameterization to exist.
    pub fn from_moments(mean: f64, cov: f64) -> Result<Self> {
        if !(mean > 0.0) || !(cov > 0.0) {
            return Err(RiskError::numeric(format!(
                "log-normal needs positive moments, got mean {} cov {}",
                mean, cov
            )));
        }
        let sigma_sq = (1.0 + cov * cov).ln();
        let mu = mean.ln() - sigma_sq / 2.0;
        let inner = statrs::distribution::LogNormal::new(mu, sigma_sq.sqrt())
            .map_err(|e| RiskError::numeric(format!("log-normal parameters: {}", e)))?;
        Ok(Self { inner })
    }
}

impl Distribution for LogNormal {
    fn cumulative_probability(&self, lower: f64, upper: f64) -> f64 {
        if upper <= lower {
            return 0.0;
        }
        // The support is (0, inf); cdf handles non-positive bounds as 0
        let lo = if lower > 0.0 { self.inner.cdf(lower) } else { 0.0 };
        (self.inner.cdf(upper) - lo).max(0.0)
    }

    fn name(&self) -> &str {
        "log-normal"
    }
}

/// Build the distribution a vulnerability function declares
pub fn for_kind(kind: DistributionKind, mean: f64, cov: f64) -> Result<BoxedDistribution> {
    match kind {
        DistributionKind::LogNormal => Ok(Arc::new(LogNormal::from_moments(mean, cov)?)),
    }
}
