//! Discrete functions, hazard curves, and vulnerability functions
//!
//! ## Table of Contents
//! - **DiscreteFunction**: Ordered IML → value mapping with interpolating lookup
//! - **HazardCurve**: IML → probability-of-exceedance function plus metadata
//! - **VulnerabilityFunction**: Mean loss ratio and CoV over a shared IML domain
//! - **Lrem**: Loss-ratio exceedance matrix (rows = loss-ratio bins, columns = IML bins)

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// An ordered mapping from an intensity measure level to a value
///
/// Abscissae (the domain) are kept in ascending order; lookups between
/// domain points interpolate linearly and lookups outside the domain clamp
/// to the end ordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscreteFunction {
    points: Vec<(f64, f64)>,
}

impl DiscreteFunction {
    /// Create an empty function
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a function from (abscissa, ordinate) pairs, sorting by abscissa
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<(f64, f64)> = pairs.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Insert a point, keeping the domain ordered; an exact abscissa match
    /// replaces the existing ordinate
    pub fn insert(&mut self, abscissa: f64, ordinate: f64) {
        match self
            .points
            .binary_search_by(|p| p.0.total_cmp(&abscissa))
        {
            Ok(i) => self.points[i].1 = ordinate,
            Err(i) => self.points.insert(i, (abscissa, ordinate)),
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the function holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Domain values in ascending order
    pub fn domain(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.0)
    }

    /// Ordinates in domain order
    pub fn ordinates(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.1)
    }

    /// (abscissa, ordinate) pairs in domain order
    pub fn pairs(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Interpolating lookup, clamped to the end ordinates outside the domain
    pub fn value_at(&self, abscissa: f64) -> Result<f64> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(RiskError::numeric("lookup on an empty function")),
        };
        if abscissa <= first.0 {
            return Ok(first.1);
        }
        if abscissa >= last.0 {
            return Ok(last.1);
        }
        let i = self
            .points
            .partition_point(|p| p.0 < abscissa);
        let (x0, y0) = self.points[i - 1];
        let (x1, y1) = self.points[i];
        if (x1 - x0).abs() == 0.0 {
            return Ok(y0);
        }
        Ok(y0 + (y1 - y0) * (abscissa - x0) / (x1 - x0))
    }
}

impl FromIterator<(f64, f64)> for DiscreteFunction {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// Descriptive metadata attached to a hazard curve
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardMetadata {
    /// Investigation time span in years
    pub time_span: Option<f64>,
    /// Intensity measure type, e.g. "PGA"
    pub imt: Option<String>,
    /// Name of the earthquake rupture forecast the curve came from
    pub erf_name: Option<String>,
    /// Curve kind, e.g. "mean" or a quantile label
    pub curve_kind: Option<String>,
}

/// A hazard curve: IML → annual probability of exceedance, plus metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardCurve {
    function: DiscreteFunction,
    metadata: HazardMetadata,
}

impl HazardCurve {
    /// Build a hazard curve from (IML, PoE) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            function: DiscreteFunction::from_pairs(pairs),
            metadata: HazardMetadata::default(),
        }
    }

    /// Set the investigation time span
    pub fn with_time_span(mut self, years: f64) -> Self {
        self.metadata.time_span = Some(years);
        self
    }

    /// Set the intensity measure type
    pub fn with_imt(mut self, imt: impl Into<String>) -> Self {
        self.metadata.imt = Some(imt.into());
        self
    }

    /// Set the earthquake rupture forecast name
    pub fn with_erf_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.erf_name = Some(name.into());
        self
    }

    /// Set the curve kind
    pub fn with_curve_kind(mut self, kind: impl Into<String>) -> Self {
        self.metadata.curve_kind = Some(kind.into());
        self
    }

    /// Curve metadata
    pub fn metadata(&self) -> &HazardMetadata {
        &self.metadata
    }

    /// Underlying discrete function
    pub fn function(&self) -> &DiscreteFunction {
        &self.function
    }

    /// A curve is computable once it holds at least one probability pair
    pub fn is_computable(&self) -> bool {
        !self.function.is_empty()
    }

    /// Probability of exceedance at the given IML
    pub fn probability_at(&self, iml: f64) -> Result<f64> {
        if !self.is_computable() {
            return Err(RiskError::numeric("hazard curve holds no probability pairs"));
        }
        self.function.value_at(iml)
    }
}

/// Probability distribution family declared by a vulnerability function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionKind {
    /// Log-normal over loss ratio
    LogNormal,
}

/// A discrete vulnerability function: mean loss ratio and coefficient of
/// variation per IML, over a shared ascending domain
///
/// Identity is the function code; equality additionally requires the point
/// data to match bit-for-bit, since the data is parsed verbatim from files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityFunction {
    code: String,
    distribution_kind: DistributionKind,
    imls: Vec<f64>,
    mean_loss_ratios: Vec<f64>,
    covs: Vec<f64>,
}

impl VulnerabilityFunction {
    /// Create a vulnerability function, validating domain shape
    pub fn new(
        code: impl Into<String>,
        distribution_kind: DistributionKind,
        imls: Vec<f64>,
        mean_loss_ratios: Vec<f64>,
        covs: Vec<f64>,
    ) -> Result<Self> {
        if imls.len() != mean_loss_ratios.len() || imls.len() != covs.len() {
            return Err(RiskError::config(format!(
                "vulnerability domains disagree: {} imls, {} means, {} covs",
                imls.len(),
                mean_loss_ratios.len(),
                covs.len()
            )));
        }
        if imls.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RiskError::config(
                "vulnerability IMLs must be strictly ascending",
            ));
        }
        Ok(Self {
            code: code.into(),
            distribution_kind,
            imls,
            mean_loss_ratios,
            covs,
        })
    }

    /// Function code, the identity vulnerability functions carry in data files
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Declared distribution family
    pub fn distribution_kind(&self) -> DistributionKind {
        self.distribution_kind
    }

    /// IML domain, ascending
    pub fn imls(&self) -> &[f64] {
        &self.imls
    }

    /// Mean loss ratio per IML
    pub fn mean_loss_ratios(&self) -> &[f64] {
        &self.mean_loss_ratios
    }

    /// Coefficient of variation per IML
    pub fn covs(&self) -> &[f64] {
        &self.covs
    }

    /// Number of IMLs in the domain
    pub fn len(&self) -> usize {
        self.imls.len()
    }

    /// Whether the domain is empty
    pub fn is_empty(&self) -> bool {
        self.imls.is_empty()
    }
}

/// Loss-ratio exceedance matrix
///
/// Rows are loss-ratio bins, columns are IML bins indexed by a vulnerability
/// function's domain. The matrix is externally supplied, not built here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lrem {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

impl Lrem {
    /// Build a matrix from row vectors, rejecting ragged input
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != columns) {
            return Err(RiskError::config("LREM rows have unequal lengths"));
        }
        Ok(Self {
            rows: rows.len(),
            columns,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of loss-ratio bins
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of IML bins
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Value at (row, column), 0-based
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.columns + column]
    }

    /// One row as a slice
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.columns..(row + 1) * self.columns]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_function_keeps_domain_ordered() {
        let mut f = DiscreteFunction::new();
        f.insert(0.3, 3.0);
        f.insert(0.1, 1.0);
        f.insert(0.2, 2.0);
        let domain: Vec<f64> = f.domain().collect();
        assert_eq!(domain, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_discrete_function_replaces_exact_abscissa() {
        let mut f = DiscreteFunction::from_pairs([(0.1, 1.0)]);
        f.insert(0.1, 5.0);
        assert_eq!(f.len(), 1);
        assert_eq!(f.value_at(0.1).unwrap(), 5.0);
    }

    #[test]
    fn test_discrete_function_interpolates_and_clamps() {
        let f = DiscreteFunction::from_pairs([(1.0, 10.0), (2.0, 20.0)]);
        assert_eq!(f.value_at(1.5).unwrap(), 15.0);
        assert_eq!(f.value_at(0.5).unwrap(), 10.0);
        assert_eq!(f.value_at(3.0).unwrap(), 20.0);
    }

    #[test]
    fn test_empty_function_lookup_is_an_error() {
        let f = DiscreteFunction::new();
        assert!(f.value_at(1.0).is_err());
    }

    #[test]
    fn test_hazard_curve_computability() {
        let empty = HazardCurve::from_pairs([]);
        assert!(!empty.is_computable());
        assert!(empty.probability_at(0.1).is_err());

        let curve = HazardCurve::from_pairs([(0.1, 0.5)]).with_imt("PGA");
        assert!(curve.is_computable());
        assert_eq!(curve.metadata().imt.as_deref(), Some("PGA"));
        assert_eq!(curve.probability_at(0.1).unwrap(), 0.5);
    }

    #[test]
    fn test_vulnerability_function_validates_shape() {
        assert!(VulnerabilityFunction::new(
            "RC/DMRF-D/LR",
            DistributionKind::LogNormal,
            vec![0.1, 0.2],
            vec![0.05],
            vec![0.3, 0.3],
        )
        .is_err());

        assert!(VulnerabilityFunction::new(
            "RC/DMRF-D/LR",
            DistributionKind::LogNormal,
            vec![0.2, 0.1],
            vec![0.05, 0.1],
            vec![0.3, 0.3],
        )
        .is_err());
    }

    #[test]
    fn test_vulnerability_equality_is_exact() {
        let make = |cov: f64| {
            VulnerabilityFunction::new(
                "RC/DMRF-D/LR",
                DistributionKind::LogNormal,
                vec![0.1, 0.2],
                vec![0.05, 0.1],
                vec![0.3, cov],
            )
            .unwrap()
        };
        assert_eq!(make(0.3), make(0.3));
        assert_ne!(make(0.3), make(0.30000001));
    }

    #[test]
    fn test_lrem_shape_and_access() {
        let lrem = Lrem::from_rows(vec![vec![2.0, 4.0], vec![6.0, 8.0]]).unwrap();
        assert_eq!(lrem.rows(), 2);
        assert_eq!(lrem.columns(), 2);
        assert_eq!(lrem.get(1, 0), 6.0);
        assert_eq!(lrem.row(0), &[2.0, 4.0]);

        assert!(Lrem::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
