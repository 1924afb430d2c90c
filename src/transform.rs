//! WGS84 → projected → green-local transform chain, and its inverse.
//!
//! Projection math is delegated to [proj4rs] with definitions looked up by
//! EPSG code from [crs_definitions]. Building a [Proj] parses its definition
//! string, so each one is built once per process and shared through a
//! read-mostly cache keyed by EPSG code. Entries are never replaced.
//!
//! Geographic points enter as `(lat, lon)` but are always handed to the
//! projection as `(lon, lat)` → `(x, y)`.
//!
//! Projected coordinates are always meters. Many State Plane definitions
//! are in feet (`+units=us-ft`, `+units=ft`); their native output is scaled
//! by the CRS's `to_meter` factor on the way out and back on the way in.
//!
//! The green-local step is plain arithmetic:
//!
//! ```text
//! local     = R(-rotation) · (projected - origin)
//! projected = R(+rotation) · local + origin
//! ```

use log::debug;
use proj4rs::proj::Proj;
use thiserror::Error;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use glam::DVec2;

use crate::common::{
    EpsgCode, GeographicPoint, GreenFrame, GreenLocalPoint, GreenOrigin, ProjectedPoint,
};
use crate::math::{rotate, Degree};

/// Geographic CRS every incoming point is expressed in
pub const WGS84: EpsgCode = EpsgCode::new(4326);

struct Projection {
    proj: Proj,
    geographic: bool,
    /// Native CRS unit → meters
    to_meter: f64,
}

fn cache() -> &'static RwLock<HashMap<EpsgCode, Arc<Projection>>> {
    static CACHE: OnceLock<RwLock<HashMap<EpsgCode, Arc<Projection>>>> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Look up (or build and remember) the projection for `epsg`
fn projection(epsg: EpsgCode) -> Result<Arc<Projection>, ProjectionError> {
    if let Some(hit) = cache().read().ok().and_then(|c| c.get(&epsg).cloned()) {
        return Ok(hit);
    }

    let code = u16::try_from(epsg.code()).map_err(|_| ProjectionError::UnknownEpsg(epsg))?;
    let def = crs_definitions::from_code(code).ok_or(ProjectionError::UnknownEpsg(epsg))?;
    let proj = Proj::from_proj_string(def.proj4).map_err(|e| ProjectionError::Definition {
        epsg,
        reason: e.to_string(),
    })?;
    let to_meter = proj.to_meter();
    if !(to_meter.is_finite() && to_meter > 0.0) {
        return Err(ProjectionError::Definition {
            epsg,
            reason: format!("unusable unit factor {to_meter}"),
        });
    }
    debug!(
        "built projection for {epsg} ({}, {to_meter} m/unit): {}",
        proj.units(),
        def.proj4
    );

    let built = Arc::new(Projection {
        geographic: proj.is_latlong(),
        to_meter,
        proj,
    });

    match cache().write() {
        // Another thread may have raced us here; keep whichever landed first.
        Ok(mut c) => Ok(c.entry(epsg).or_insert(built).clone()),
        Err(_) => Ok(built),
    }
}

fn projected_target(epsg: EpsgCode) -> Result<Arc<Projection>, ProjectionError> {
    let target = projection(epsg)?;
    if target.geographic {
        return Err(ProjectionError::NotProjected(epsg));
    }
    Ok(target)
}

/// WGS84 `(lat, lon)` → planar `(x, y)` in the CRS named by `epsg`
pub fn geographic_to_projected(
    point: GeographicPoint,
    epsg: EpsgCode,
) -> Result<ProjectedPoint, ProjectionError> {
    if !point.is_valid() {
        return Err(ProjectionError::InvalidCoordinate(point));
    }
    let src = projection(WGS84)?;
    let dst = projected_target(epsg)?;

    // proj4rs takes geographic coordinates as radians, longitude first
    let mut xyz = (point.lon.to_radians(), point.lat.to_radians(), 0.0);
    proj4rs::transform::transform(&src.proj, &dst.proj, &mut xyz).map_err(|e| {
        ProjectionError::Transform {
            epsg,
            reason: e.to_string(),
        }
    })?;

    if !(xyz.0.is_finite() && xyz.1.is_finite()) {
        return Err(ProjectionError::Transform {
            epsg,
            reason: format!("non-finite result for {point:?}"),
        });
    }
    Ok(ProjectedPoint::new(xyz.0 * dst.to_meter, xyz.1 * dst.to_meter))
}

/// Planar `(x, y)` in the CRS named by `epsg` → WGS84 `(lat, lon)`
pub fn projected_to_geographic(
    point: ProjectedPoint,
    epsg: EpsgCode,
) -> Result<GeographicPoint, ProjectionError> {
    let src = projected_target(epsg)?;
    let dst = projection(WGS84)?;

    let mut xyz = (point.x / src.to_meter, point.y / src.to_meter, 0.0);
    proj4rs::transform::transform(&src.proj, &dst.proj, &mut xyz).map_err(|e| {
        ProjectionError::Transform {
            epsg,
            reason: e.to_string(),
        }
    })?;

    let geo = GeographicPoint::new(xyz.1.to_degrees(), xyz.0.to_degrees());
    if !geo.is_valid() {
        return Err(ProjectionError::Transform {
            epsg,
            reason: format!("{point:?} does not map to a valid WGS84 position"),
        });
    }
    Ok(geo)
}

/// Express a projected point in the green's frame
pub fn projected_to_green_local(
    point: ProjectedPoint,
    origin: GreenOrigin,
    rotation: Degree,
) -> GreenLocalPoint {
    let offset = DVec2::from(point) - DVec2::from(origin);
    rotate(offset, -rotation).into()
}

/// Inverse of [projected_to_green_local]
pub fn green_local_to_projected(
    point: GreenLocalPoint,
    origin: GreenOrigin,
    rotation: Degree,
) -> ProjectedPoint {
    (rotate(DVec2::from(point), rotation) + DVec2::from(origin)).into()
}

/// Full chain: WGS84 → `frame.epsg` → green-local
pub fn geographic_to_green_local(
    point: GeographicPoint,
    frame: &GreenFrame,
) -> Result<GreenLocalPoint, ProjectionError> {
    let projected = geographic_to_projected(point, frame.epsg)?;
    let local = projected_to_green_local(projected, frame.origin, frame.rotation);
    debug!("{point:?} -> {projected:?} -> {local:?}");
    Ok(local)
}

/// Full inverse chain: green-local → `frame.epsg` → WGS84
pub fn green_local_to_geographic(
    point: GreenLocalPoint,
    frame: &GreenFrame,
) -> Result<GeographicPoint, ProjectionError> {
    let projected = green_local_to_projected(point, frame.origin, frame.rotation);
    projected_to_geographic(projected, frame.epsg)
}

/// Failures of the geographic ↔ projected stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Coordinate out of WGS84 range: lat {}, lon {}", .0.lat, .0.lon)]
    InvalidCoordinate(GeographicPoint),
    #[error("Unknown or unsupported projection {0}")]
    UnknownEpsg(EpsgCode),
    #[error("{0} is a geographic CRS, not a projected one")]
    NotProjected(EpsgCode),
    #[error("Could not build projection {epsg}: {reason}")]
    Definition { epsg: EpsgCode, reason: String },
    #[error("Projection to/from {epsg} failed: {reason}")]
    Transform { epsg: EpsgCode, reason: String },
}
