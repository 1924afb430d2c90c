//! Placeholder solver.
//!
//! Stands in for the vendor physics solver until it is wired up. It knows
//! nothing about slope: the path is the straight ball-to-cup line with a
//! small fixed drift over its second half, and the aim and speed are simple
//! functions of distance and stimp.

use log::{debug, warn};
use thiserror::Error;

use std::collections::BTreeSet;

use super::common::{PlotPoint, PuttSolver, SolveRequest, SolveResult, Stimp};
use crate::registry::Registry;

pub const MIN_STIMP: f64 = 0.0;
pub const MAX_STIMP: f64 = 20.0;

/// Straight-line mock solver
#[derive(Debug, Clone, Default)]
pub struct MockSolver {
    allowed: BTreeSet<String>,
}

impl MockSolver {
    /// Accept exactly the dtm ids in `allowed`
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Accept every dtm id listed in `registry`
    pub fn from_registry(registry: &Registry) -> Self {
        Self::new(registry.allowed_ids())
    }

    fn check(&self, request: &SolveRequest) -> Result<(), MockSolverError> {
        if !self.allowed.contains(&request.dtm_id) {
            return Err(MockSolverError::UnknownDtm {
                dtm_id: request.dtm_id.clone(),
                allowed: self.allowed.iter().cloned().collect(),
            });
        }
        let stimp = request.stimp.feet();
        if !(MIN_STIMP..=MAX_STIMP).contains(&stimp) {
            return Err(MockSolverError::InvalidStimp(request.stimp));
        }
        Ok(())
    }
}

impl PuttSolver for MockSolver {
    type E = MockSolverError;

    fn solve(&self, request: &SolveRequest) -> Result<SolveResult, Self::E> {
        if let Err(e) = self.check(request) {
            warn!("rejecting solve {}: {e}", request.request_id);
            return Err(e);
        }

        let ball = request.ball_local_m;
        let cup = request.cup_local_m;
        let (dx, dy) = (cup.x - ball.x, cup.y - ball.y);
        let distance = ball.distance(&cup);

        let aim_deg = if distance > 3.0 { -2.5 } else { -1.0 };
        let initial_speed_mph = (distance * 0.6 + 2.0) * request.stimp.feet() / 10.0;

        let n = usize::max(10, (distance * 2.0) as usize);
        let mut plot_points: Vec<PlotPoint> = (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                let drift = if t > 0.5 { (t - 0.5) * 0.1 * aim_deg } else { 0.0 };
                PlotPoint {
                    x: ball.x + dx * t + drift,
                    y: ball.y + dy * t,
                    t,
                }
            })
            .collect();
        plot_points.push(PlotPoint {
            x: cup.x,
            y: cup.y,
            t: 1.0,
        });

        debug!(
            "mock solve {}: {distance:.2} m, aim {aim_deg}, {} points",
            request.request_id,
            plot_points.len()
        );

        Ok(SolveResult {
            success: true,
            request_id: request.request_id.clone(),
            instruction_text: Some(instruction(aim_deg, initial_speed_mph)),
            aim_line_deg: Some(aim_deg),
            initial_speed_mph: Some(initial_speed_mph),
            plot_points_local: plot_points,
            error: None,
        })
    }
}

fn instruction(aim_deg: f64, speed_mph: f64) -> String {
    let side = if aim_deg < 0.0 { "left" } else { "right" };
    format!(
        "Aim {:.1}° {side} of the cup, hit with {speed_mph:.1} mph initial speed. \
         The putt will break slightly as it approaches the hole.",
        aim_deg.abs()
    )
}

/// Requests the mock refuses, mirroring what the real solver rejects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MockSolverError {
    #[error("Unknown dtm_id: {dtm_id}. Allowed DTM IDs: {allowed:?}")]
    UnknownDtm { dtm_id: String, allowed: Vec<String> },
    #[error("Invalid stimp value: {0}. Must be between 0 and 20.")]
    InvalidStimp(Stimp),
}
