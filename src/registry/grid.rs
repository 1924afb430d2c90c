//! DTM elevation grids.
//!
//! A grid file is tab-separated text, one line per row, one elevation in
//! meters per cell. `-1.000` marks a cell with no data (off the green).
//! The column count is taken from the first line.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::{Path, PathBuf};

/// Elevation written for cells outside the surveyed green
pub const NO_DATA: f64 = -1.0;

/// Grid spacing assumed when the file name does not say
pub const DEFAULT_SPACING_M: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationRange {
    pub min: f64,
    pub max: f64,
}

/// Footprint of the grid in meters, to the centimeter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreenSize {
    pub width: f64,
    pub depth: f64,
}

/// Summary of one grid file
#[derive(Debug, Clone, PartialEq)]
pub struct GridMetadata {
    pub rows: u32,
    pub cols: u32,
    pub grid_spacing_m: f64,
    /// `None` when no cell holds data
    pub elevation_range: Option<ElevationRange>,
    pub data_cells: u64,
}

impl GridMetadata {
    pub fn total_cells(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }

    pub fn has_data(&self) -> bool {
        self.data_cells > 0
    }

    /// Share of cells holding an elevation, 0–100
    pub fn data_coverage_pct(&self) -> f64 {
        match self.total_cells() {
            0 => 0.0,
            total => self.data_cells as f64 / total as f64 * 100.0,
        }
    }

    pub fn green_size(&self) -> GreenSize {
        GreenSize {
            width: round_cm(f64::from(self.cols) * self.grid_spacing_m),
            depth: round_cm(f64::from(self.rows) * self.grid_spacing_m),
        }
    }
}

fn round_cm(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Read and summarise a grid file, taking the spacing from its name
pub fn parse_grid(path: &Path) -> Result<GridMetadata, GridError> {
    let text = std::fs::read_to_string(path).map_err(|source| GridError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let grid = parse_grid_str(&text, spacing_from_file_name(path))?;
    debug!(
        "{}: {}x{} @ {} m, {} cells with data",
        path.display(),
        grid.rows,
        grid.cols,
        grid.grid_spacing_m,
        grid.data_cells
    );
    Ok(grid)
}

pub fn parse_grid_str(text: &str, grid_spacing_m: f64) -> Result<GridMetadata, GridError> {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.first().ok_or(GridError::Empty)?;

    let cols = first.trim().split('\t').count();
    let rows = lines.len();

    let mut data_cells = 0;
    let mut range: Option<ElevationRange> = None;
    // Unreadable cells are skipped, like no-data ones
    let elevations = lines
        .iter()
        .flat_map(|line| line.trim().split('\t'))
        .filter_map(|cell| cell.trim().parse::<f64>().ok())
        .filter(|e| e.is_finite() && *e != NO_DATA);
    for e in elevations {
        data_cells += 1;
        range = Some(match range {
            None => ElevationRange { min: e, max: e },
            Some(r) => ElevationRange {
                min: r.min.min(e),
                max: r.max.max(e),
            },
        });
    }

    Ok(GridMetadata {
        rows: u32::try_from(rows).map_err(|_| GridError::TooLarge)?,
        cols: u32::try_from(cols).map_err(|_| GridError::TooLarge)?,
        grid_spacing_m,
        elevation_range: range,
        data_cells,
    })
}

/// `Riverside_20cm_Grid.txt` → 0.2
pub fn spacing_from_file_name(path: &Path) -> f64 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    [("20cm", 0.2), ("10cm", 0.1), ("50cm", 0.5)]
        .into_iter()
        .find(|(tag, _)| name.contains(tag))
        .map_or(DEFAULT_SPACING_M, |(_, spacing)| spacing)
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Could not read grid {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Grid file is empty")]
    Empty,
    #[error("Grid has more rows or columns than supported")]
    TooLarge,
}
