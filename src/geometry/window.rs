// binfronts/src/geometry/window.rs

use crate::errors::GeometryError;
use std::fmt;

/// Lat/lon bounding box, bounds inclusive.
///
/// A window with `min_lon > 0 > max_lon` wraps across the antimeridian. It is
/// evaluated as `[min_lon - 360, max_lon]` with every positive longitude
/// shifted by -360 first; coordinates reported to callers are never shifted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Window {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, GeometryError> {
        let bounds = [min_lat, max_lat, min_lon, max_lon];
        if bounds.iter().any(|value| !value.is_finite()) {
            return Err(GeometryError::InvalidWindow(format!(
                "bounds must be finite, got {:?}",
                bounds
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(GeometryError::InvalidWindow(format!(
                "latitudes must be within [-90, 90], got [{}, {}]",
                min_lat, max_lat
            )));
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(GeometryError::InvalidWindow(format!(
                "longitudes must be within [-180, 180], got [{}, {}]",
                min_lon, max_lon
            )));
        }
        if min_lat > max_lat {
            return Err(GeometryError::InvalidWindow(format!(
                "min_lat {} is larger than max_lat {}",
                min_lat, max_lat
            )));
        }
        let window = Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        };
        if min_lon > max_lon && !window.crosses_antimeridian() {
            return Err(GeometryError::InvalidWindow(format!(
                "min_lon {} is larger than max_lon {} and the window does not cross the antimeridian",
                min_lon, max_lon
            )));
        }
        Ok(window)
    }

    pub fn global() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > 0.0 && self.max_lon < 0.0
    }

    /// Longitude range after antimeridian normalisation.
    pub fn lon_range(&self) -> (f64, f64) {
        if self.crosses_antimeridian() {
            (self.min_lon - 360.0, self.max_lon)
        } else {
            (self.min_lon, self.max_lon)
        }
    }

    /// Longitude in the frame `lon_range` is expressed in.
    pub fn normalize_lon(&self, lon: f64) -> f64 {
        if self.crosses_antimeridian() && lon > 0.0 {
            lon - 360.0
        } else {
            lon
        }
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat
    }

    /// Membership test for a longitude already passed through `normalize_lon`.
    pub fn contains_normalized_lon(&self, lon: f64) -> bool {
        let (min_lon, max_lon) = self.lon_range();
        lon >= min_lon && lon <= max_lon
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.contains_normalized_lon(self.normalize_lon(lon))
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }

    /// File-name friendly label, e.g. `20N80N_180W120W`.
    pub fn tag(&self) -> String {
        format!(
            "{}{}_{}{}",
            Self::label(self.min_lat, 'N', 'S'),
            Self::label(self.max_lat, 'N', 'S'),
            Self::label(self.min_lon, 'E', 'W'),
            Self::label(self.max_lon, 'E', 'W'),
        )
    }

    fn label(value: f64, positive: char, negative: char) -> String {
        let hemisphere = if value < 0.0 { negative } else { positive };
        let magnitude = format!("{}", value.abs()).replace('.', "p");
        format!("{}{}", magnitude, hemisphere)
    }

    /// Bit patterns of the four bounds, usable as a hash key.
    pub(crate) fn key(&self) -> [u64; 4] {
        [
            self.min_lat.to_bits(),
            self.max_lat.to_bits(),
            self.min_lon.to_bits(),
            self.max_lon.to_bits(),
        ]
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]x[{}, {}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_are_validated() {
        assert!(Window::new(70.9, 73.3, -67.2, -58.7).is_ok());
        assert!(Window::new(-91.0, 0.0, 0.0, 10.0).is_err());
        assert!(Window::new(0.0, 91.0, 0.0, 10.0).is_err());
        assert!(Window::new(0.0, 10.0, -200.0, 0.0).is_err());
        assert!(Window::new(0.0, 10.0, 0.0, 200.0).is_err());
        assert!(Window::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(Window::new(0.0, f64::NAN, 0.0, 10.0).is_err());
        // reversed but not wrapping: min_lon must be east of 0 and max_lon west of it
        assert!(Window::new(0.0, 10.0, 10.0, 5.0).is_err());
        assert!(Window::new(0.0, 10.0, -5.0, -10.0).is_err());
    }

    #[test]
    fn test_antimeridian_window() {
        let window = Window::new(-10.0, 10.0, 170.0, -170.0).unwrap();
        assert!(window.crosses_antimeridian());
        assert_eq!(window.lon_range(), (-190.0, -170.0));
        assert!(window.contains(0.0, 175.0));
        assert!(window.contains(0.0, 180.0));
        assert!(window.contains(0.0, -175.0));
        assert!(!window.contains(0.0, 0.0));
        assert!(!window.contains(0.0, 160.0));
        assert!(!window.contains(0.0, -160.0));
        assert_eq!(window.normalize_lon(175.0), -185.0);
        assert_eq!(window.normalize_lon(-175.0), -175.0);
    }

    #[test]
    fn test_global_window_contains_everything() {
        let window = Window::global();
        assert!(!window.crosses_antimeridian());
        assert!(window.contains(-90.0, -180.0));
        assert!(window.contains(90.0, 180.0));
        assert_eq!(window, Window::default());
    }

    #[test]
    fn test_tag() {
        let window = Window::new(20.0, 80.0, -180.0, -120.5).unwrap();
        assert_eq!(window.tag(), "20N80N_180W120p5W");
    }
}
