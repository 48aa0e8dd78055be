//! # Grid Positions
//!
//! Coordinates are normalised against the bounding box of every point in the
//! first perception, padded by 5% on each side, and quantised to 256 cells
//! per axis:
//!
//! ```text
//! norm = (v - min + diff * 0.05) / 1.1 / diff      in [0, 1)
//! cell = floor(norm * 256)
//! ```
//!
//! The box is frozen once set. [`GridMapper::from_grid`] returns the lower
//! edge of a cell, the exact inverse of the formula above.

use tracing::{debug, warn};

use super::error::{ProtocolError, ProtocolResult};
use super::records::Pos;

/// Padding added to each side of the bounding box, as a share of its extent.
pub const GRID_PADDING: f64 = 0.05;

/// Cells per axis.
const CELLS: f64 = 256.0;

/// Extremes of every point the box was built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Smallest latitude.
    pub min_lat: f64,
    /// Largest latitude.
    pub max_lat: f64,
    /// Smallest longitude.
    pub min_lon: f64,
    /// Largest longitude.
    pub max_lon: f64,
}

impl BoundingBox {
    /// A box containing a single point.
    #[must_use]
    pub const fn around(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        }
    }

    /// Grows the box to contain the point.
    pub fn include(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }
}

/// Converts between coordinates and grid cells for one session.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridMapper {
    bounds: Option<BoundingBox>,
}

impl GridMapper {
    /// A mapper without bounds. Conversions fail until [`freeze`](Self::freeze).
    #[must_use]
    pub const fn new() -> Self {
        Self { bounds: None }
    }

    /// A mapper with known bounds.
    #[must_use]
    pub const fn with_bounds(bounds: BoundingBox) -> Self {
        Self {
            bounds: Some(bounds),
        }
    }

    /// The frozen bounds, if any.
    #[must_use]
    pub const fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Returns true once the bounds are fixed.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.bounds.is_some()
    }

    /// Fixes the bounds from `points` unless they are already fixed.
    ///
    /// Returns true if this call fixed them. An empty iterator leaves the
    /// mapper unfrozen.
    pub fn freeze<I>(&mut self, points: I) -> bool
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        if self.bounds.is_some() {
            return false;
        }
        let mut points = points.into_iter();
        let Some((lat, lon)) = points.next() else {
            return false;
        };
        let mut bounds = BoundingBox::around(lat, lon);
        for (lat, lon) in points {
            bounds.include(lat, lon);
        }
        debug!(?bounds, "grid bounds frozen");
        self.bounds = Some(bounds);
        true
    }

    /// Maps a coordinate pair onto its grid cell.
    ///
    /// Points outside the padded box are clamped to the border cells.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::GridUninitialized`] before the bounds are frozen.
    pub fn to_grid(&self, lat: f64, lon: f64) -> ProtocolResult<Pos> {
        let bounds = self.bounds.ok_or(ProtocolError::GridUninitialized)?;
        Ok(Pos {
            lat: axis_to_cell(lat, bounds.min_lat, bounds.max_lat),
            lon: axis_to_cell(lon, bounds.min_lon, bounds.max_lon),
        })
    }

    /// Maps a grid cell back onto the coordinates of its lower edge.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::GridUninitialized`] before the bounds are frozen.
    pub fn from_grid(&self, pos: Pos) -> ProtocolResult<(f64, f64)> {
        let bounds = self.bounds.ok_or(ProtocolError::GridUninitialized)?;
        Ok((
            cell_to_axis(pos.lat, bounds.min_lat, bounds.max_lat),
            cell_to_axis(pos.lon, bounds.min_lon, bounds.max_lon),
        ))
    }
}

/// Extent of one axis. A degenerate axis behaves as if it were one unit wide.
fn extent(min: f64, max: f64) -> f64 {
    let diff = max - min;
    if diff > 0.0 {
        diff
    } else {
        1.0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_to_cell(value: f64, min: f64, max: f64) -> u8 {
    let diff = extent(min, max);
    let norm = (value - min + diff * GRID_PADDING) / (1.0 + 2.0 * GRID_PADDING) / diff;
    let cell = (norm * CELLS).floor();
    if (0.0..CELLS).contains(&cell) {
        cell as u8
    } else {
        warn!(value, min, max, "coordinate outside the grid, clamping");
        cell.clamp(0.0, CELLS - 1.0) as u8
    }
}

fn cell_to_axis(cell: u8, min: f64, max: f64) -> f64 {
    let diff = extent(min, max);
    f64::from(cell) / CELLS * diff * (1.0 + 2.0 * GRID_PADDING) - diff * GRID_PADDING + min
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> GridMapper {
        let mut grid = GridMapper::new();
        assert!(grid.freeze([(51.45, 12.30), (51.55, 12.45), (51.50, 12.38)]));
        grid
    }

    #[test]
    fn test_unfrozen_mapper_refuses() {
        let grid = GridMapper::new();
        assert_eq!(grid.to_grid(1.0, 1.0), Err(ProtocolError::GridUninitialized));
        assert_eq!(grid.from_grid(Pos::new(0, 0)), Err(ProtocolError::GridUninitialized));
    }

    #[test]
    fn test_bounds_freeze_once() {
        let mut grid = mapper();
        assert!(!grid.freeze([(0.0, 0.0), (90.0, 90.0)]));
        let bounds = grid.bounds().unwrap();
        assert!((bounds.min_lat - 51.45).abs() < 1e-12);
        assert!((bounds.max_lon - 12.45).abs() < 1e-12);
    }

    #[test]
    fn test_box_corners_land_inside_padding() {
        let grid = mapper();
        let low = grid.to_grid(51.45, 12.30).unwrap();
        let high = grid.to_grid(51.55, 12.45).unwrap();
        // 0.05 / 1.1 * 256 = 11.6
        assert_eq!(low, Pos::new(11, 11));
        // 1.05 / 1.1 * 256 = 244.4
        assert_eq!(high, Pos::new(244, 244));
    }

    #[test]
    fn test_round_trip_within_one_cell() {
        let grid = mapper();
        let bounds = grid.bounds().unwrap();
        let cell_lat = (bounds.max_lat - bounds.min_lat) * 1.1 / 256.0;
        let cell_lon = (bounds.max_lon - bounds.min_lon) * 1.1 / 256.0;
        for i in 0..=50 {
            let t = f64::from(i) / 50.0;
            let lat = bounds.min_lat + t * (bounds.max_lat - bounds.min_lat);
            let lon = bounds.min_lon + t * (bounds.max_lon - bounds.min_lon);
            let (back_lat, back_lon) = grid.from_grid(grid.to_grid(lat, lon).unwrap()).unwrap();
            assert!(lat - back_lat >= -1e-9 && lat - back_lat < cell_lat + 1e-9);
            assert!(lon - back_lon >= -1e-9 && lon - back_lon < cell_lon + 1e-9);
        }
    }

    #[test]
    fn test_outside_points_are_clamped() {
        let grid = mapper();
        assert_eq!(grid.to_grid(40.0, 0.0).unwrap(), Pos::new(0, 0));
        assert_eq!(grid.to_grid(60.0, 20.0).unwrap(), Pos::new(255, 255));
    }

    #[test]
    fn test_degenerate_axis() {
        let mut grid = GridMapper::new();
        grid.freeze([(10.0, 20.0)]);
        let pos = grid.to_grid(10.0, 20.0).unwrap();
        assert_eq!(pos, Pos::new(11, 11));
        let (lat, lon) = grid.from_grid(pos).unwrap();
        assert!((lat - 10.0).abs() < 1.1 / 256.0);
        assert!((lon - 20.0).abs() < 1.1 / 256.0);
    }
}
