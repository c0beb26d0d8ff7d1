//! Geographic primitives: sites and gridded regions
//!
//! ## Table of Contents
//! - **Site**: Immutable geographic point with validated ranges
//! - **Region**: Rectangular grid of cells between two corner sites
//! - **SiteIter**: Restartable row-major iterator over cell centers

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance applied to coordinate equality.
///
/// Two sites are considered the same location when both coordinates differ
/// by less than this amount.
pub const COORDINATE_TOLERANCE: f64 = 1e-11;

/// An immutable geographic point (longitude, latitude)
///
/// Sites are never mutated in place; translated sites are produced with
/// [`Site::shift_longitude`] and [`Site::shift_latitude`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Site {
    longitude: f64,
    latitude: f64,
}

impl Site {
    /// Create a site, validating coordinate ranges
    ///
    /// Longitude must lie in `[-360, 360]` and latitude in `[-90, 90]`;
    /// anything else is a configuration fault.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self> {
        if !(-360.0..=360.0).contains(&longitude) {
            return Err(RiskError::config(format!(
                "longitude {} out of range [-360, 360]",
                longitude
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RiskError::config(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Longitude in decimal degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in decimal degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// New site translated east by `delta` degrees
    ///
    /// Translation does not re-validate: grid traversal over a valid region
    /// stays within the coordinate ranges by construction.
    pub fn shift_longitude(&self, delta: f64) -> Site {
        Site {
            longitude: self.longitude + delta,
            latitude: self.latitude,
        }
    }

    /// New site translated north by `delta` degrees
    pub fn shift_latitude(&self, delta: f64) -> Site {
        Site {
            longitude: self.longitude,
            latitude: self.latitude + delta,
        }
    }
}

impl PartialEq for Site {
    fn eq(&self, other: &Self) -> bool {
        (self.longitude - other.longitude).abs() < COORDINATE_TOLERANCE
            && (self.latitude - other.latitude).abs() < COORDINATE_TOLERANCE
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// Round to the nearest integer, halves rounding down
fn round_half_down(x: f64) -> usize {
    (x - 0.5).ceil().max(0.0) as usize
}

/// A rectangular grid of cells defined by two corner sites and a cell size
///
/// `from` (NW) is the exact center of the first cell; `to` (SE) may lie
/// anywhere within the last cell. Column and row counts are derived from the
/// corner-to-corner distance with half-down rounding, and the last cell
/// center is derived from those counts, never from `to` directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    from: Site,
    to: Site,
    cell_size: f64,
}

impl Region {
    /// Create a region from its NW and SE corners and a cell size
    pub fn new(from: Site, to: Site, cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) {
            return Err(RiskError::config(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }
        if to.longitude() < from.longitude() || to.latitude() > from.latitude() {
            return Err(RiskError::config(format!(
                "region corners must run NW {} to SE {}",
                from, to
            )));
        }
        Ok(Self {
            from,
            to,
            cell_size,
        })
    }

    /// Degenerate region covering exactly one cell centered on `site`
    pub fn single_cell_region(site: Site) -> Self {
        Self {
            from: site,
            to: site,
            cell_size: 1.0,
        }
    }

    /// NW corner, center of the first cell
    pub fn from(&self) -> Site {
        self.from
    }

    /// SE corner, somewhere within the last cell
    pub fn to(&self) -> Site {
        self.to
    }

    /// Cell size in decimal degrees
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of grid columns
    pub fn columns(&self) -> usize {
        round_half_down((self.to.longitude() - self.from.longitude()) / self.cell_size) + 1
    }

    /// Number of grid rows
    pub fn rows(&self) -> usize {
        round_half_down((self.from.latitude() - self.to.latitude()) / self.cell_size) + 1
    }

    /// Total number of cells (`rows * columns`)
    pub fn number_of_cells(&self) -> usize {
        self.rows() * self.columns()
    }

    /// Center of the cell at the given 1-based row and column
    ///
    /// Equivalent to skipping `columns*(row-1) + (col-1)` iterator steps from
    /// `from`, specialized to O(1) arithmetic.
    pub fn center_of_cell_at(&self, row: usize, col: usize) -> Result<Site> {
        if row == 0 || col == 0 || row > self.rows() || col > self.columns() {
            return Err(RiskError::config(format!(
                "cell ({}, {}) outside {}x{} region",
                row,
                col,
                self.rows(),
                self.columns()
            )));
        }
        Ok(self.center_at_index((row - 1) * self.columns() + (col - 1)))
    }

    /// Center of the last cell, derived from the row/column counts
    ///
    /// This is `from` shifted by whole cells, not `to`: the SE corner is only
    /// guaranteed to lie inside the last cell, not at its center.
    pub fn last_site(&self) -> Site {
        self.center_at_index(self.number_of_cells() - 1)
    }

    /// Cell center for a 0-based row-major index (callers bounds-check)
    pub(crate) fn center_at_index(&self, index: usize) -> Site {
        let row = index / self.columns();
        let col = index % self.columns();
        self.from
            .shift_longitude(self.cell_size * col as f64)
            .shift_latitude(-(self.cell_size * row as f64))
    }

    /// Lazy, restartable iterator over all cell centers, row-major from `from`
    pub fn sites(&self) -> SiteIter<'_> {
        SiteIter {
            region: self,
            next: 0,
            total: self.number_of_cells(),
        }
    }
}

impl<'a> IntoIterator for &'a Region {
    type Item = Site;
    type IntoIter = SiteIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites()
    }
}

/// Iterator over a region's cell centers
///
/// Finite and restartable: constructing a fresh iterator per worker is safe.
#[derive(Debug, Clone)]
pub struct SiteIter<'a> {
    region: &'a Region,
    next: usize,
    total: usize,
}

impl Iterator for SiteIter<'_> {
    type Item = Site;

    fn next(&mut self) -> Option<Site> {
        if self.next >= self.total {
            return None;
        }
        let site = self.region.center_at_index(self.next);
        self.next += 1;
        Some(site)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SiteIter<'_> {}
