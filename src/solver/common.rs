//! Primitives and traits for putt solving
//!
//! Provides the [PuttSolver] trait as well as the [SolveRequest] and
//! [SolveResult] types to help standardize solver implementations.
//!
//! Nothing in a [SolveRequest] is geographic and nothing is a file path:
//! a green is named only by its allowlisted `dtm_id`, and positions are
//! [GreenLocalPoint]s.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use std::error::Error;

use crate::common::GreenLocalPoint;

/// Putt Solver Trait
pub trait PuttSolver {
    type E: Error;

    fn solve(&self, request: &SolveRequest) -> Result<SolveResult, Self::E>;
}

/// Green speed as a stimpmeter reading, in feet
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stimp(f64);
impl Stimp {
    pub fn new(feet: f64) -> Self {
        Self(feet)
    }
    pub fn feet(&self) -> f64 {
        self.0
    }
}

/// What crosses the solver boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub dtm_id: String,
    pub ball_local_m: GreenLocalPoint,
    pub cup_local_m: GreenLocalPoint,
    pub stimp: Stimp,
    pub request_id: String,
}

/// One sample of the ball path in green-local meters
///
/// `t` runs from 0 at the ball to 1 at the cup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub t: f64,
}

/// Results of solving a putt
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub success: bool,
    pub request_id: String,
    #[serde(default)]
    pub instruction_text: Option<String>,
    /// Degrees off the straight ball-to-cup line, negative is left
    #[serde(default)]
    pub aim_line_deg: Option<f64>,
    #[serde(default)]
    pub initial_speed_mph: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plot_points_local: Vec<PlotPoint>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The solver service sends `null` rather than `[]` when it has no path
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PlotPoint>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<PlotPoint>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_wire_format() -> Result<(), serde_json::Error> {
        let request = SolveRequest {
            dtm_id: "riverside_2023_20cm".into(),
            ball_local_m: GreenLocalPoint::new(10.0, 8.0),
            cup_local_m: GreenLocalPoint::new(10.0, 11.0),
            stimp: Stimp::new(10.5),
            request_id: "abc".into(),
        };
        let json = serde_json::to_value(&request)?;
        assert_eq!(
            json,
            serde_json::json!({
                "dtm_id": "riverside_2023_20cm",
                "ball_local_m": { "x": 10.0, "y": 8.0 },
                "cup_local_m": { "x": 10.0, "y": 11.0 },
                "stimp": 10.5,
                "request_id": "abc",
            })
        );
        Ok(())
    }

    #[test]
    fn test_result_tolerates_sparse_responses() -> Result<(), serde_json::Error> {
        let result: SolveResult = serde_json::from_str(
            r#"{"success": false, "request_id": "abc", "plot_points_local": null,
                "error": "Out of bounds"}"#,
        )?;
        assert!(!result.success);
        assert!(result.plot_points_local.is_empty());
        assert_eq!(result.error.as_deref(), Some("Out of bounds"));

        let result: SolveResult = serde_json::from_str(
            r#"{"success": true, "request_id": "abc",
                "plot_points_local": [{"x": 1.0, "y": 2.0}]}"#,
        )?;
        assert_eq!(result.plot_points_local, vec![PlotPoint { x: 1.0, y: 2.0, t: 0.0 }]);
        Ok(())
    }
}
