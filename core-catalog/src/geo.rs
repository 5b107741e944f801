//! Spherical Mercator (EPSG:3857) helpers for layer extents.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half of the equatorial circumference in meters
pub const MERCATOR_HALF_EXTENT: f64 = 20_037_508.34;

/// Latitude beyond which spherical Mercator diverges
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_6;

/// Axis-aligned bounding box in the tree's native (Mercator) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when every bound is finite and min does not exceed max
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }
}

pub fn lon_to_mercator_x(lon: f64) -> f64 {
    lon * MERCATOR_HALF_EXTENT / 180.0
}

pub fn lat_to_mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    y * MERCATOR_HALF_EXTENT / 180.0
}

/// Reproject a geographic (WGS 84) box into Mercator
pub fn geographic_to_mercator(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Envelope {
    Envelope::new(
        lon_to_mercator_x(min_lon),
        lat_to_mercator_y(min_lat),
        lon_to_mercator_x(max_lon),
        lat_to_mercator_y(max_lat),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_origin_maps_to_origin() {
        assert!(close(lon_to_mercator_x(0.0), 0.0));
        assert!(close(lat_to_mercator_y(0.0), 0.0));
    }

    #[test]
    fn test_antimeridian_maps_to_half_extent() {
        assert!(close(lon_to_mercator_x(180.0), MERCATOR_HALF_EXTENT));
        assert!(close(lon_to_mercator_x(-180.0), -MERCATOR_HALF_EXTENT));
    }

    #[test]
    fn test_latitude_is_symmetric_and_clamped() {
        assert!(close(lat_to_mercator_y(45.0), -lat_to_mercator_y(-45.0)));
        assert!(close(lat_to_mercator_y(45.0), 5_621_521.486));
        assert!(close(lat_to_mercator_y(90.0), lat_to_mercator_y(MAX_MERCATOR_LATITUDE)));
        assert!(lat_to_mercator_y(90.0).is_finite());
    }

    #[test]
    fn test_geographic_box() {
        let env = geographic_to_mercator(-10.0, -5.0, 10.0, 5.0);
        assert!(env.is_valid());
        assert!(close(env.width(), 2.0 * lon_to_mercator_x(10.0)));
        assert!(close(env.min_y, -env.max_y));
    }

    #[test]
    fn test_invalid_envelope() {
        assert!(!Envelope::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Envelope::new(0.0, f64::NAN, 1.0, 1.0).is_valid());
    }
}
