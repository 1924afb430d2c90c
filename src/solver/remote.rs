//! Client for the putt solver service.
//!
//! The service wraps the vendor solver and speaks JSON over HTTP:
//!
//! | Method | Path          | Body                                   |
//! |--------|---------------|----------------------------------------|
//! | POST   | `/solve_putt` | [SolveRequest] → [SolveResult]         |
//! | GET    | `/health`     | → [ServiceHealth]                      |

use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::time::Duration;

use super::common::{PuttSolver, SolveRequest, SolveResult};

/// `/health` payload of the solver service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(default)]
    pub mode: Option<String>,
}

/// HTTP solver service wrapper
pub struct RemoteSolver {
    base_url: String,
    client: Client,
}

impl RemoteSolver {
    /// Create a client for the service at `base_url`.
    /// No request is made until [PuttSolver::solve] or [RemoteSolver::health].
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteSolverError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(RemoteSolverError::Client)?;

        Ok(Self::with_client(base_url, client))
    }

    /// Use an already configured client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health(&self) -> Result<ServiceHealth, RemoteSolverError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(RemoteSolverError::Unreachable)?;
        Self::decode(response)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T, RemoteSolverError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteSolverError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response.json().map_err(RemoteSolverError::Decode)
    }
}

impl PuttSolver for RemoteSolver {
    type E = RemoteSolverError;

    fn solve(&self, request: &SolveRequest) -> Result<SolveResult, Self::E> {
        let url = format!("{}/solve_putt", self.base_url);
        debug!("POST {url} for {}", request.request_id);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(RemoteSolverError::Unreachable)?;
        let result: SolveResult = Self::decode(response)?;

        if result.request_id != request.request_id {
            return Err(RemoteSolverError::RequestIdMismatch {
                sent: request.request_id.clone(),
                received: result.request_id,
            });
        }
        info!(
            "solver answered {} (success: {})",
            request.request_id, result.success
        );
        Ok(result)
    }
}

/// Solver service errors
#[derive(Error, Debug)]
pub enum RemoteSolverError {
    #[error("Could not create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("PuttSolver unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("PuttSolver error: {status} {body}")]
    Status { status: u16, body: String },
    #[error("PuttSolver sent an unreadable response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("PuttSolver answered request {received}, expected {sent}")]
    RequestIdMismatch { sent: String, received: String },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::GreenLocalPoint;
    use crate::solver::{PlotPoint, Stimp};
    use std::error::Error;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn request() -> SolveRequest {
        SolveRequest {
            dtm_id: "riverside_2023_20cm".into(),
            ball_local_m: GreenLocalPoint::new(10.0, 8.0),
            cup_local_m: GreenLocalPoint::new(10.0, 11.0),
            stimp: Stimp::new(10.0),
            request_id: "req-1".into(),
        }
    }

    fn client() -> Result<Client, reqwest::Error> {
        Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
    }

    /// Answer exactly one HTTP request with `status` and `body`.
    /// The thread yields the request line and body it received.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> Result<(String, JoinHandle<(String, String)>), Box<dyn Error>> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}", listener.local_addr()?);

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();

            (
                request_line.trim_end().to_string(),
                String::from_utf8(request_body).unwrap(),
            )
        });
        Ok((url, handle))
    }

    #[test]
    fn test_base_url_normalized() -> Result<(), Box<dyn Error>> {
        let solver = RemoteSolver::new(
            "http://localhost:8081/",
            Duration::from_secs(5),
            Duration::from_secs(2),
        )?;
        assert_eq!(solver.base_url(), "http://localhost:8081");
        Ok(())
    }

    #[test]
    fn test_unreachable_service() -> Result<(), Box<dyn Error>> {
        // Nothing listens on the discard port
        let solver = RemoteSolver::with_client("http://127.0.0.1:9", client()?);
        assert!(matches!(
            solver.solve(&request()),
            Err(RemoteSolverError::Unreachable(_))
        ));
        assert!(matches!(
            solver.health(),
            Err(RemoteSolverError::Unreachable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_solve_success() -> Result<(), Box<dyn Error>> {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"success": true, "request_id": "req-1",
                "instruction_text": "Aim 1.0 degrees left",
                "aim_line_deg": -1.0, "initial_speed_mph": 4.6,
                "plot_points_local": [
                    {"x": 10.0, "y": 8.0, "t": 0.0},
                    {"x": 10.0, "y": 11.0, "t": 1.0}
                ]}"#,
        )?;
        let solver = RemoteSolver::with_client(url, client()?);
        let result = solver.solve(&request())?;

        let (request_line, body) = server.join().map_err(|_| "server thread panicked")?;
        assert!(request_line.starts_with("POST /solve_putt "));
        let sent: SolveRequest = serde_json::from_str(&body)?;
        assert_eq!(sent, request());

        assert!(result.success);
        assert_eq!(result.request_id, "req-1");
        assert_eq!(result.aim_line_deg, Some(-1.0));
        assert_eq!(result.initial_speed_mph, Some(4.6));
        assert_eq!(
            result.plot_points_local,
            vec![
                PlotPoint { x: 10.0, y: 8.0, t: 0.0 },
                PlotPoint { x: 10.0, y: 11.0, t: 1.0 },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_error_status() -> Result<(), Box<dyn Error>> {
        let (url, server) = serve_once("400 Bad Request", r#"{"detail": "Invalid DTM ID"}"#)?;
        let solver = RemoteSolver::with_client(url, client()?);
        match solver.solve(&request()) {
            Err(RemoteSolverError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"detail": "Invalid DTM ID"}"#);
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        server.join().map_err(|_| "server thread panicked")?;
        Ok(())
    }

    #[test]
    fn test_unreadable_body() -> Result<(), Box<dyn Error>> {
        let (url, server) = serve_once("200 OK", "<html>not json</html>")?;
        let solver = RemoteSolver::with_client(url, client()?);
        assert!(matches!(
            solver.solve(&request()),
            Err(RemoteSolverError::Decode(_))
        ));
        server.join().map_err(|_| "server thread panicked")?;
        Ok(())
    }

    #[test]
    fn test_request_id_mismatch() -> Result<(), Box<dyn Error>> {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"success": true, "request_id": "req-2", "plot_points_local": []}"#,
        )?;
        let solver = RemoteSolver::with_client(url, client()?);
        match solver.solve(&request()) {
            Err(RemoteSolverError::RequestIdMismatch { sent, received }) => {
                assert_eq!(sent, "req-1");
                assert_eq!(received, "req-2");
            }
            other => panic!("expected a request id mismatch, got {other:?}"),
        }
        server.join().map_err(|_| "server thread panicked")?;
        Ok(())
    }

    #[test]
    fn test_health() -> Result<(), Box<dyn Error>> {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status": "healthy", "service": "putt-solver", "version": "1.0.0", "mode": "mock"}"#,
        )?;
        let solver = RemoteSolver::with_client(url, client()?);
        let health = solver.health()?;

        let (request_line, _) = server.join().map_err(|_| "server thread panicked")?;
        assert!(request_line.starts_with("GET /health "));
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "putt-solver");
        assert_eq!(health.mode.as_deref(), Some("mock"));
        Ok(())
    }
}
