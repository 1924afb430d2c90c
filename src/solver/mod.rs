//! Putt solvers
//!
//! [MockSolver] runs in-process; [RemoteSolver] talks to the solver service.
//! [Solver] picks one at runtime.

pub mod common;
pub mod mock;
pub mod remote;

pub use common::{PlotPoint, PuttSolver, SolveRequest, SolveResult, Stimp};
pub use mock::{MockSolver, MockSolverError};
pub use remote::{RemoteSolver, RemoteSolverError, ServiceHealth};

use thiserror::Error;

/// Either solver, chosen from configuration
pub enum Solver {
    Mock(MockSolver),
    Remote(RemoteSolver),
}

impl PuttSolver for Solver {
    type E = SolverError;

    fn solve(&self, request: &SolveRequest) -> Result<SolveResult, Self::E> {
        Ok(match self {
            Solver::Mock(s) => s.solve(request)?,
            Solver::Remote(s) => s.solve(request)?,
        })
    }
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error(transparent)]
    Mock(#[from] MockSolverError),
    #[error(transparent)]
    Remote(#[from] RemoteSolverError),
}
