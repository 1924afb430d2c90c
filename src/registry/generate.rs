//! Writing green manifests from DTM grid files.
//!
//! A generated manifest carries everything [Registry::manifest] validates,
//! plus the grid summary the solver service reports against.
//!
//! [Registry::manifest]: super::Registry::manifest

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::{Path, PathBuf};

use super::check_dtm_id;
use super::grid::{parse_grid, ElevationRange, GreenSize, GridError, GridMetadata};
use crate::common::{EpsgCode, GreenOrigin};
use crate::math::Degree;

/// Stimp bounds written when none are given
pub const DEFAULT_STIMP_RANGE: StimpRange = StimpRange {
    min: 8.0,
    max: 14.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimpRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub rows: u32,
    pub cols: u32,
}

/// What the grid file cannot tell us about a green
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestParams {
    pub dtm_id: String,
    pub course_id: String,
    pub hole_id: u32,
    pub origin: GreenOrigin,
    pub rotation: Degree,
    pub epsg: EpsgCode,
    pub stimp_range: Option<StimpRange>,
    pub description: Option<String>,
    /// Overrides the spacing read from the grid's file name
    pub grid_spacing_m: Option<f64>,
}

/// `manifests/<dtm_id>.json` as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub dtm_id: String,
    pub course_id: String,
    pub hole_id: u32,
    pub green_origin_projected_m: GreenOrigin,
    pub green_rotation_deg: f64,
    pub green_size_m: GreenSize,
    pub grid_spacing_m: f64,
    pub grid_dimensions: GridDimensions,
    pub elevation_range: Option<ElevationRange>,
    pub data_coverage_pct: f64,
    pub state_plane_epsg: EpsgCode,
    pub stimp_range: StimpRange,
    pub description: String,
    /// File name of the grid, next to the manifest's DTM data
    pub grid_file_path: String,
}

/// Summarise `grid_file` and combine it with `params`
pub fn generate_manifest(
    params: ManifestParams,
    grid_file: &Path,
) -> Result<ManifestFile, GenerateError> {
    check_dtm_id(&params.dtm_id).map_err(|_| GenerateError::InvalidDtmId(params.dtm_id.clone()))?;
    let mut grid = parse_grid(grid_file)?;
    if let Some(spacing) = params.grid_spacing_m {
        grid.grid_spacing_m = spacing;
    }
    manifest_from_grid(params, &grid, grid_file)
}

fn manifest_from_grid(
    params: ManifestParams,
    grid: &GridMetadata,
    grid_file: &Path,
) -> Result<ManifestFile, GenerateError> {
    let invalid =
        |reason: String| -> Result<ManifestFile, GenerateError> { Err(GenerateError::Invalid(reason)) };

    if !(params.origin.x.is_finite() && params.origin.y.is_finite()) {
        return invalid(format!("origin {:?} is not finite", params.origin));
    }
    if !params.rotation.degrees().is_finite() {
        return invalid(format!("rotation {} is not finite", params.rotation));
    }
    if !(grid.grid_spacing_m.is_finite() && grid.grid_spacing_m > 0.0) {
        return invalid(format!("grid spacing {} m", grid.grid_spacing_m));
    }
    let stimp_range = params.stimp_range.unwrap_or(DEFAULT_STIMP_RANGE);
    if !(stimp_range.min.is_finite() && stimp_range.max.is_finite())
        || stimp_range.min > stimp_range.max
    {
        return invalid(format!(
            "stimp range {}–{}",
            stimp_range.min, stimp_range.max
        ));
    }

    let description = params.description.unwrap_or_else(|| {
        format!(
            "{} - Hole {} - {:.0}cm resolution DTM",
            title_case(&params.course_id),
            params.hole_id,
            grid.grid_spacing_m * 100.0
        )
    });
    let grid_file_path = grid_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ManifestFile {
        dtm_id: params.dtm_id,
        course_id: params.course_id,
        hole_id: params.hole_id,
        green_origin_projected_m: params.origin,
        green_rotation_deg: params.rotation.degrees(),
        green_size_m: grid.green_size(),
        grid_spacing_m: grid.grid_spacing_m,
        grid_dimensions: GridDimensions {
            rows: grid.rows,
            cols: grid.cols,
        },
        elevation_range: grid.elevation_range,
        data_coverage_pct: (grid.data_coverage_pct() * 100.0).round() / 100.0,
        state_plane_epsg: params.epsg,
        stimp_range,
        description,
        grid_file_path,
    })
}

/// `riverside_country_club` → `Riverside Country Club`
fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Write `manifest` as pretty JSON, creating parent directories
pub fn save_manifest(manifest: &ManifestFile, path: &Path) -> Result<(), GenerateError> {
    let io_err = |source: std::io::Error| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json + "\n").map_err(io_err)?;
    info!("saved manifest {} to {}", manifest.dtm_id, path.display());
    Ok(())
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Invalid dtm_id: {0:?}")]
    InvalidDtmId(String),
    #[error("Invalid manifest parameters: {0}")]
    Invalid(String),
    #[error("Could not encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
