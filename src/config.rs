//! Runtime settings
//!
//! | Variable                          | Default                 |
//! |-----------------------------------|-------------------------|
//! | `PUTTLINE_COURSE_DATA`            | `course_data`           |
//! | `PUTTSOLVER_MODE`                 | `mock`                  |
//! | `PUTTSOLVER_SERVICE_URL`          | `http://localhost:8081` |
//! | `PUTTSOLVER_TIMEOUT_SECS`         | `5`                     |
//! | `PUTTSOLVER_CONNECT_TIMEOUT_SECS` | `2`                     |

use thiserror::Error;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::registry::Registry;
use crate::solver::{MockSolver, RemoteSolver, RemoteSolverError, Solver};

pub const COURSE_DATA_VAR: &str = "PUTTLINE_COURSE_DATA";
pub const SOLVER_MODE_VAR: &str = "PUTTSOLVER_MODE";
pub const SOLVER_URL_VAR: &str = "PUTTSOLVER_SERVICE_URL";
pub const TIMEOUT_VAR: &str = "PUTTSOLVER_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "PUTTSOLVER_CONNECT_TIMEOUT_SECS";

/// Which solver answers requests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SolverMode {
    #[default]
    Mock,
    Remote,
}

impl FromStr for SolverMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::Invalid {
                var: SOLVER_MODE_VAR,
                value: s.to_string(),
                expected: "mock or remote",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub course_data_root: PathBuf,
    pub solver: SolverMode,
    pub solver_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            course_data_root: PathBuf::from("course_data"),
            solver: SolverMode::Mock,
            solver_url: "http://localhost:8081".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(root) = lookup(COURSE_DATA_VAR) {
            config.course_data_root = PathBuf::from(root);
        }
        if let Some(mode) = lookup(SOLVER_MODE_VAR) {
            config.solver = mode.parse()?;
        }
        if let Some(url) = lookup(SOLVER_URL_VAR) {
            config.solver_url = url;
        }
        if let Some(secs) = lookup(TIMEOUT_VAR) {
            config.request_timeout = parse_secs(TIMEOUT_VAR, &secs)?;
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_VAR) {
            config.connect_timeout = parse_secs(CONNECT_TIMEOUT_VAR, &secs)?;
        }
        Ok(config)
    }

    /// Instantiate the configured solver
    pub fn solver(&self, registry: &Registry) -> Result<Solver, RemoteSolverError> {
        Ok(match self.solver {
            SolverMode::Mock => Solver::Mock(MockSolver::from_registry(registry)),
            SolverMode::Remote => Solver::Remote(RemoteSolver::new(
                &self.solver_url,
                self.request_timeout,
                self.connect_timeout,
            )?),
        })
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
            expected: "a positive number of seconds",
        })
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {var}={value:?}, expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
