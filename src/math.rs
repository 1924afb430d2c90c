//! Mathy related things
//!

use derive_more::{Display, From};
use glam::{DMat2, DVec2};

/// The base angle type used in the crate
///
/// Counter-clockwise positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, From, Display)]
#[display(fmt = "{}°", _0)]
pub struct Degree(f64);
impl Default for Degree {
    fn default() -> Self {
        Self(0.0)
    }
}
impl Degree {
    pub fn new(deg: f64) -> Self {
        Self(deg)
    }
    pub fn degrees(&self) -> f64 {
        self.0
    }
    pub fn radians(&self) -> f64 {
        self.0.to_radians()
    }
}
impl std::ops::Neg for Degree {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

/// Rotate `v` counter-clockwise by `angle` about the origin.
///
/// Uses `[[cos, -sin], [sin, cos]]`. At 0° this is `cos = 1, sin = 0`
/// exactly, so the result is `v` bit for bit.
pub fn rotate(v: DVec2, angle: Degree) -> DVec2 {
    DMat2::from_angle(angle.radians()) * v
}

/// True when `a` and `b` differ by at most `tol`
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rotate_zero_is_identity() {
        let v = DVec2::new(10.000000000001, -3.25);
        assert_eq!(rotate(v, Degree::new(0.0)), v);
    }

    #[test]
    fn test_rotate_quarter_turn_ccw() {
        let v = rotate(DVec2::X, Degree::new(90.0));
        assert!(approx_eq(v.x, 0.0, 1e-12));
        assert!(approx_eq(v.y, 1.0, 1e-12));

        let v = rotate(DVec2::X, -Degree::new(90.0));
        assert!(approx_eq(v.x, 0.0, 1e-12));
        assert!(approx_eq(v.y, -1.0, 1e-12));
    }

    #[test]
    fn test_degree_display() {
        assert_eq!(Degree::new(12.5).to_string(), "12.5°");
    }
}
