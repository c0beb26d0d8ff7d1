//! Loss-ratio computation engine
//!
//! ## Table of Contents
//! - **lrem_times_po**: Scale an LREM by per-IML probabilities of occurrence
//! - **loss_ratio_curve**: Row-sum a scaled matrix into an exceedance curve
//! - **scenario_loss_ratio**: Discretized second-moment mean and std dev
//! - **conditional_loss**: Loss at a target exceedance probability
//! - **scale_abscissae**: Turn a ratio curve into an absolute-loss curve

use crate::distribution::Distribution;
use crate::error::{Result, RiskError};
use crate::function::{DiscreteFunction, HazardCurve, Lrem, VulnerabilityFunction};
use serde::{Deserialize, Serialize};

/// Deterministic-scenario result: mean loss ratio and its standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioLoss {
    /// Expected loss ratio, `E[LR]`
    pub mean: f64,
    /// Standard deviation of the loss ratio
    pub std_dev: f64,
}

/// Multiply each LREM column by the hazard curve's probability at its IML
///
/// `out[r][c] = lrem[r][c] * hazard(imls[c])`. The per-column probability of
/// occurrence comes straight from the hazard curve; no interpolation happens
/// beyond what the curve itself performs.
pub fn lrem_times_po(lrem: &Lrem, hazard: &HazardCurve, imls: &[f64]) -> Result<Lrem> {
    if imls.len() != lrem.columns() {
        return Err(RiskError::config(format!(
            "LREM has {} columns but the IML domain has {} values",
            lrem.columns(),
            imls.len()
        )));
    }
    let probabilities: Vec<f64> = imls
        .iter()
        .map(|&iml| hazard.probability_at(iml))
        .collect::<Result<_>>()?;

    let rows = (0..lrem.rows())
        .map(|r| {
            lrem.row(r)
                .iter()
                .zip(&probabilities)
                .map(|(v, p)| v * p)
                .collect()
        })
        .collect();
    Lrem::from_rows(rows)
}

/// Sum a scaled matrix across columns into a loss-ratio exceedance curve
///
/// Each row is one loss-ratio bin; `ratios` supplies the bin values, indexed
/// by row. The output maps loss ratio to its summed probability of exceedance.
pub fn loss_ratio_curve(scaled: &Lrem, ratios: &[f64]) -> Result<DiscreteFunction> {
    if ratios.len() != scaled.rows() {
        return Err(RiskError::config(format!(
            "scaled matrix has {} rows but {} ratios were supplied",
            scaled.rows(),
            ratios.len()
        )));
    }
    Ok(ratios
        .iter()
        .enumerate()
        .map(|(r, &ratio)| (ratio, scaled.row(r).iter().sum()))
        .collect())
}

/// Half-open bin bounds around each IML: midpoints to the neighbors, with the
/// first and last bins extending half the adjacent gap outward
fn bin_bounds(imls: &[f64], i: usize) -> (f64, f64) {
    let lower = if i == 0 {
        imls[0] - (imls[1] - imls[0]) / 2.0
    } else {
        (imls[i - 1] + imls[i]) / 2.0
    };
    let upper = if i == imls.len() - 1 {
        imls[i] + (imls[i] - imls[i - 1]) / 2.0
    } else {
        (imls[i] + imls[i + 1]) / 2.0
    };
    (lower, upper)
}

/// Discretized second-moment mean and standard deviation of the loss ratio
///
/// For each IML bin, `P(iml)` is the distribution's mass over the bin and
/// `sigma(iml) = mean(iml) * cov(iml)`. Then
/// `E[LR] = sum mean(iml) * P(iml)` and
/// `E[LR^2] = sum (sigma(iml)^2 + mean(iml)^2) * P(iml)`, and the standard
/// deviation is `sqrt(E[LR^2] - E[LR]^2)`. A negative radicand means the
/// mean/cov/distribution combination is inconsistent and is reported as a
/// numeric fault, never returned as NaN.
pub fn scenario_loss_ratio(
    function: &VulnerabilityFunction,
    distribution: &dyn Distribution,
) -> Result<ScenarioLoss> {
    let imls = function.imls();
    if imls.len() < 2 {
        return Err(RiskError::numeric(format!(
            "vulnerability domain needs at least two IMLs, got {}",
            imls.len()
        )));
    }

    let mut first_moment = 0.0;
    let mut second_moment = 0.0;
    for i in 0..imls.len() {
        let (lower, upper) = bin_bounds(imls, i);
        let p = distribution.cumulative_probability(lower, upper);
        let mean = function.mean_loss_ratios()[i];
        let std_dev = mean * function.covs()[i];
        first_moment += mean * p;
        second_moment += (std_dev * std_dev + mean * mean) * p;
    }

    let radicand = second_moment - first_moment * first_moment;
    if radicand < 0.0 {
        return Err(RiskError::numeric(format!(
            "negative variance {} from inconsistent scenario moments",
            radicand
        )));
    }
    Ok(ScenarioLoss {
        mean: first_moment,
        std_dev: radicand.sqrt(),
    })
}

/// Loss (or loss ratio) at the given probability of exceedance
///
/// The curve maps ascending losses to decreasing probabilities. A target
/// below the lowest defined probability returns the maximum loss; above the
/// highest, zero; in between, linear interpolation.
pub fn conditional_loss(curve: &DiscreteFunction, probability: f64) -> Result<f64> {
    let pairs = curve.pairs();
    let (first, last) = match (pairs.first(), pairs.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(RiskError::numeric("conditional loss on an empty curve")),
    };

    if probability < last.1 {
        return Ok(last.0);
    }
    if probability > first.1 {
        return Ok(0.0);
    }
    for w in pairs.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if (y1..=y0).contains(&probability) {
            if (y0 - y1).abs() == 0.0 {
                return Ok(x0);
            }
            return Ok(x0 + (probability - y0) * (x1 - x0) / (y1 - y0));
        }
    }
    Err(RiskError::numeric(format!(
        "loss curve is not decreasing around probability {}",
        probability
    )))
}

/// Scale a curve's abscissae, e.g. ratio curve × asset value → loss curve
pub fn scale_abscissae(curve: &DiscreteFunction, factor: f64) -> DiscreteFunction {
    curve.pairs().iter().map(|&(x, y)| (x * factor, y)).collect()
}
