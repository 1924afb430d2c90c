//! The solve-putt pipeline behind the frontend
//!
//! 1. validate the request
//! 2. resolve `(course_id, hole_id)` to a dtm id
//! 3. load that green's manifest into a [GreenFrame]
//! 4. move ball and cup from WGS84 into the green frame
//! 5. ask the solver, which only ever sees the dtm id and green-local points
//!
//! Any failure ends the request with `success: false` and an error that
//! names the stage it came from.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::error::Error;

use crate::common::{GeographicPoint, GreenFrame, GreenLocalPoint};
use crate::registry::{ConfigurationError, DatasetEntry, Registry};
use crate::solver::{PlotPoint, PuttSolver, SolveRequest, Stimp};
use crate::transform::{geographic_to_green_local, ProjectionError};

pub const SERVICE_NAME: &str = "puttline-backend";
pub const MIN_HOLE: u32 = 1;
pub const MAX_HOLE: u32 = 18;
pub const MIN_STIMP: f64 = 6.0;
pub const MAX_STIMP: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvePuttRequest {
    pub course_id: String,
    pub hole_id: u32,
    pub ball_wgs84: GeographicPoint,
    pub cup_wgs84: GeographicPoint,
    pub stimp: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvePuttResponse {
    pub success: bool,
    pub instruction_text: Option<String>,
    pub aim_line_deg: Option<f64>,
    pub initial_speed_mph: Option<f64>,
    pub plot_points_local: Vec<PlotPoint>,
    pub error: Option<String>,
}

impl SolvePuttResponse {
    fn failed(error: &PuttError) -> Self {
        Self {
            success: false,
            error: Some(format!("{} {error}", error.code())),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Ball and cup in a green's frame, ready for the solver
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPutt {
    pub dtm_id: String,
    pub frame: GreenFrame,
    pub ball_local_m: GreenLocalPoint,
    pub cup_local_m: GreenLocalPoint,
}

pub struct PuttBackend<S> {
    registry: Registry,
    solver: S,
}

impl<S> PuttBackend<S>
where
    S: PuttSolver,
    S::E: Send + Sync + 'static,
{
    pub fn new(registry: Registry, solver: S) -> Self {
        Self { registry, solver }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn courses(&self) -> &[DatasetEntry] {
        self.registry.datasets()
    }

    /// Run the whole pipeline; errors are folded into the response
    pub fn solve_putt(&self, request: &SolvePuttRequest) -> SolvePuttResponse {
        match self.try_solve_putt(request) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "solve_putt {} hole {} failed: {e}",
                    request.course_id, request.hole_id
                );
                SolvePuttResponse::failed(&e)
            }
        }
    }

    pub fn try_solve_putt(&self, request: &SolvePuttRequest) -> Result<SolvePuttResponse, PuttError> {
        let putt = self.prepare(request)?;
        let solve_request = SolveRequest {
            dtm_id: putt.dtm_id,
            ball_local_m: putt.ball_local_m,
            cup_local_m: putt.cup_local_m,
            stimp: Stimp::new(request.stimp),
            request_id: uuid::Uuid::new_v4().to_string(),
        };
        info!(
            "solving {} on {} ({:?} -> {:?})",
            solve_request.request_id,
            solve_request.dtm_id,
            solve_request.ball_local_m,
            solve_request.cup_local_m
        );

        let result = self
            .solver
            .solve(&solve_request)
            .map_err(|e| PuttError::Solver(Box::new(e)))?;

        Ok(SolvePuttResponse {
            success: result.success,
            instruction_text: result.instruction_text,
            aim_line_deg: result.aim_line_deg,
            initial_speed_mph: result.initial_speed_mph,
            plot_points_local: result.plot_points_local,
            error: result.error,
        })
    }

    /// Steps 1–4: everything up to the solver call
    pub fn prepare(&self, request: &SolvePuttRequest) -> Result<PreparedPutt, PuttError> {
        validate(request)?;

        let dtm_id = self
            .registry
            .resolve_dtm_id(&request.course_id, request.hole_id)
            .map_err(|e| match e {
                ConfigurationError::UnknownHole { course_id, hole_id } => {
                    PuttError::UnknownHole { course_id, hole_id }
                }
                e => PuttError::Configuration(e),
            })?
            .to_string();
        let frame = self.registry.manifest(&dtm_id)?.frame;

        Ok(PreparedPutt {
            ball_local_m: geographic_to_green_local(request.ball_wgs84, &frame)?,
            cup_local_m: geographic_to_green_local(request.cup_wgs84, &frame)?,
            dtm_id,
            frame,
        })
    }
}

fn validate(request: &SolvePuttRequest) -> Result<(), PuttError> {
    if !(MIN_HOLE..=MAX_HOLE).contains(&request.hole_id) {
        return Err(PuttError::InvalidRequest(format!(
            "hole_id {} is outside {MIN_HOLE}..={MAX_HOLE}",
            request.hole_id
        )));
    }
    if !(MIN_STIMP..=MAX_STIMP).contains(&request.stimp) {
        return Err(PuttError::InvalidRequest(format!(
            "stimp {} is outside {MIN_STIMP}..={MAX_STIMP}",
            request.stimp
        )));
    }
    Ok(())
}

/// Pipeline failures, one per stage
#[derive(Error, Debug)]
pub enum PuttError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown course/hole mapping: {course_id} hole {hole_id}")]
    UnknownHole { course_id: String, hole_id: u32 },
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
    #[error("Solver error: {0}")]
    Solver(#[source] Box<dyn Error + Send + Sync>),
}

impl PuttError {
    /// Stable code reported to the frontend
    pub fn code(&self) -> &'static str {
        match self {
            PuttError::InvalidRequest(_) => "AB_000",
            PuttError::UnknownHole { .. } => "AB_001",
            PuttError::Configuration(_) => "AB_002",
            PuttError::Projection(_) => "AB_003",
            PuttError::Solver(_) => "AB_004",
        }
    }
}
