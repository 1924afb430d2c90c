//! Point and frame types shared by the transform chain, the registry and
//! the solver boundary.
//!
//! Every point type is a plain `Copy` value. Geographic points only exist on
//! the backend side; the solver only ever sees [GreenLocalPoint]s.

use derive_more::{Display, From};
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::math::Degree;

/// WGS84 latitude/longitude in degrees
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicPoint {
    pub lat: f64,
    pub lon: f64,
}
impl GeographicPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Planar coordinates in a projected CRS, `x` easting and `y` northing
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}
impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
impl From<DVec2> for ProjectedPoint {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}
impl From<ProjectedPoint> for DVec2 {
    fn from(p: ProjectedPoint) -> Self {
        DVec2::new(p.x, p.y)
    }
}

/// Meters in a green's own rotated and translated frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreenLocalPoint {
    pub x: f64,
    pub y: f64,
}
impl GreenLocalPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &GreenLocalPoint) -> f64 {
        DVec2::from(*self).distance(DVec2::from(*other))
    }
}
impl From<DVec2> for GreenLocalPoint {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}
impl From<GreenLocalPoint> for DVec2 {
    fn from(p: GreenLocalPoint) -> Self {
        DVec2::new(p.x, p.y)
    }
}

/// Origin of a green-local frame, in projected coordinates
pub type GreenOrigin = ProjectedPoint;

/// EPSG code of a projected coordinate reference system
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Display, Serialize, Deserialize,
)]
#[display(fmt = "EPSG:{}", _0)]
pub struct EpsgCode(u32);
impl EpsgCode {
    pub const fn new(code: u32) -> Self {
        Self(code)
    }
    pub fn code(&self) -> u32 {
        self.0
    }
}

/// Everything needed to place a geographic point on one green.
///
/// Built once per request from a validated manifest and passed by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreenFrame {
    pub origin: GreenOrigin,
    pub rotation: Degree,
    pub epsg: EpsgCode,
}
impl GreenFrame {
    pub fn new(origin: GreenOrigin, rotation: Degree, epsg: EpsgCode) -> Self {
        Self {
            origin,
            rotation,
            epsg,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_geographic_bounds() {
        assert!(GeographicPoint::new(40.26824, -111.65952).is_valid());
        assert!(GeographicPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeographicPoint::new(91.0, 0.0).is_valid());
        assert!(!GeographicPoint::new(0.0, 200.0).is_valid());
        assert!(!GeographicPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_green_local_distance() {
        let ball = GreenLocalPoint::new(10.0, 8.0);
        let cup = GreenLocalPoint::new(13.0, 12.0);
        assert_eq!(ball.distance(&cup), 5.0);
    }

    #[test]
    fn test_epsg_display() {
        assert_eq!(EpsgCode::new(32612).to_string(), "EPSG:32612");
    }
}
