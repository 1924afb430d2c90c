//! Course data: the datasets registry and per-green manifests.
//!
//! Layout under the course data root:
//!
//! | Path                        | Contents                                  |
//! |-----------------------------|-------------------------------------------|
//! | `datasets.json`             | `{ "datasets": [DatasetEntry, ..] }`      |
//! | `manifests/<dtm_id>.json`   | green manifest, unless the entry names its own `manifest_path` |
//!
//! Manifests are validated into a [GreenFrame] here, at the boundary, so the
//! transform chain never sees a half-filled record. New manifests are
//! written from DTM grid files by [generate].

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::{Path, PathBuf};

use crate::common::{EpsgCode, GreenFrame, ProjectedPoint};
use crate::math::Degree;

pub mod generate;
pub mod grid;

pub const DATASETS_FILE: &str = "datasets.json";
pub const MANIFESTS_DIR: &str = "manifests";

/// One green in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub dtm_id: String,
    pub course_id: String,
    pub hole_id: u32,
    pub grid_spacing_m: f64,
    pub grid_rows: u32,
    pub grid_cols: u32,
    /// Relative to the course data root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DatasetsFile {
    #[serde(default)]
    datasets: Vec<DatasetEntry>,
}

/// Loaded `datasets.json`
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
    datasets: Vec<DatasetEntry>,
}

impl Registry {
    /// Read `<root>/datasets.json`
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let root = root.into();
        let path = root.join(DATASETS_FILE);
        let file: DatasetsFile = read_json(&path)?;

        for entry in &file.datasets {
            check_dtm_id(&entry.dtm_id)?;
        }
        debug!("loaded {} datasets from {}", file.datasets.len(), path.display());

        Ok(Self {
            root,
            datasets: file.datasets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn datasets(&self) -> &[DatasetEntry] {
        &self.datasets
    }

    pub fn get(&self, dtm_id: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.dtm_id == dtm_id)
    }

    /// Whether the solver may be asked about `dtm_id`
    pub fn is_allowed(&self, dtm_id: &str) -> bool {
        self.get(dtm_id).is_some()
    }

    pub fn allowed_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.datasets.iter().map(|d| d.dtm_id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn resolve_dtm_id(&self, course_id: &str, hole_id: u32) -> Result<&str, ConfigurationError> {
        self.datasets
            .iter()
            .find(|d| d.course_id == course_id && d.hole_id == hole_id)
            .map(|d| d.dtm_id.as_str())
            .ok_or_else(|| ConfigurationError::UnknownHole {
                course_id: course_id.to_string(),
                hole_id,
            })
    }

    fn manifest_path(&self, dtm_id: &str) -> Result<PathBuf, ConfigurationError> {
        check_dtm_id(dtm_id)?;
        match self.get(dtm_id).and_then(|d| d.manifest_path.as_ref()) {
            Some(rel) => Ok(self.root.join(rel)),
            None => Ok(default_manifest_path(&self.root, dtm_id)),
        }
    }

    /// Load and validate the manifest for `dtm_id`
    pub fn manifest(&self, dtm_id: &str) -> Result<GreenManifest, ConfigurationError> {
        if !self.is_allowed(dtm_id) {
            return Err(ConfigurationError::UnknownDtm(dtm_id.to_string()));
        }
        let path = self.manifest_path(dtm_id)?;
        let raw: RawManifest = read_json(&path)?;
        let manifest = raw.validate(&path)?;

        if manifest.dtm_id != dtm_id {
            return Err(ConfigurationError::Invalid {
                path,
                reason: format!("manifest is for {}, expected {dtm_id}", manifest.dtm_id),
            });
        }
        Ok(manifest)
    }
}

/// A validated green manifest
#[derive(Debug, Clone, PartialEq)]
pub struct GreenManifest {
    pub dtm_id: String,
    pub course_id: Option<String>,
    pub hole_id: Option<u32>,
    pub frame: GreenFrame,
}

#[derive(Debug, Deserialize)]
struct RawOrigin {
    x: Option<f64>,
    y: Option<f64>,
}

/// Manifest as found on disk; every field the transform needs is optional
/// here so that a missing one is reported by name
#[derive(Debug, Deserialize)]
struct RawManifest {
    dtm_id: Option<String>,
    course_id: Option<String>,
    hole_id: Option<u32>,
    green_origin_projected_m: Option<RawOrigin>,
    green_rotation_deg: Option<f64>,
    state_plane_epsg: Option<u32>,
}

impl RawManifest {
    fn validate(self, path: &Path) -> Result<GreenManifest, ConfigurationError> {
        let missing = |field: &'static str| ConfigurationError::MissingField {
            path: path.to_path_buf(),
            field,
        };
        let finite = |field: &'static str, v: f64| {
            if v.is_finite() {
                Ok(v)
            } else {
                Err(ConfigurationError::Invalid {
                    path: path.to_path_buf(),
                    reason: format!("{field} is not a finite number"),
                })
            }
        };

        let dtm_id = self.dtm_id.ok_or_else(|| missing("dtm_id"))?;
        let origin = self
            .green_origin_projected_m
            .ok_or_else(|| missing("green_origin_projected_m"))?;
        let x = origin.x.ok_or_else(|| missing("green_origin_projected_m.x"))?;
        let y = origin.y.ok_or_else(|| missing("green_origin_projected_m.y"))?;
        let rotation = self
            .green_rotation_deg
            .ok_or_else(|| missing("green_rotation_deg"))?;
        let epsg = self
            .state_plane_epsg
            .ok_or_else(|| missing("state_plane_epsg"))?;

        Ok(GreenManifest {
            dtm_id,
            course_id: self.course_id,
            hole_id: self.hole_id,
            frame: GreenFrame::new(
                ProjectedPoint::new(
                    finite("green_origin_projected_m.x", x)?,
                    finite("green_origin_projected_m.y", y)?,
                ),
                Degree::new(finite("green_rotation_deg", rotation)?),
                EpsgCode::new(epsg),
            ),
        })
    }
}

/// Where the manifest for `dtm_id` lives unless its entry says otherwise
pub fn default_manifest_path(root: &Path, dtm_id: &str) -> PathBuf {
    root.join(MANIFESTS_DIR).join(format!("{dtm_id}.json"))
}

/// dtm ids name files, so they must not be able to walk out of the data root
pub(crate) fn check_dtm_id(dtm_id: &str) -> Result<(), ConfigurationError> {
    let ok = !dtm_id.is_empty()
        && dtm_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !dtm_id.contains("..");
    if ok {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidDtmId(dtm_id.to_string()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigurationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Course data errors, surfaced before the transform chain runs
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown course/hole mapping: {course_id} hole {hole_id}")]
    UnknownHole { course_id: String, hole_id: u32 },
    #[error("Unknown dtm_id: {0}")]
    UnknownDtm(String),
    #[error("Invalid dtm_id: {0:?}")]
    InvalidDtmId(String),
    #[error("Manifest {} is missing {field}", .path.display())]
    MissingField { path: PathBuf, field: &'static str },
    #[error("Manifest {} is invalid: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::error::Error;
    use std::fs;

    pub(crate) const DATASETS: &str = r#"{
        "datasets": [
            {
                "dtm_id": "riverside_2023_20cm",
                "course_id": "riverside_country_club",
                "hole_id": 1,
                "grid_spacing_m": 0.2,
                "grid_rows": 180,
                "grid_cols": 140
            },
            {
                "dtm_id": "riverside_2023_20cm_h2",
                "course_id": "riverside_country_club",
                "hole_id": 2,
                "grid_spacing_m": 0.2,
                "grid_rows": 150,
                "grid_cols": 150,
                "manifest_path": "greens/h2.json"
            }
        ]
    }"#;

    pub(crate) const MANIFEST: &str = r#"{
        "dtm_id": "riverside_2023_20cm",
        "course_id": "riverside_country_club",
        "hole_id": 1,
        "green_origin_projected_m": { "x": 443900.0, "y": 4457700.0 },
        "green_rotation_deg": 15.0,
        "state_plane_epsg": 32612
    }"#;

    /// A course data directory with the two datasets above and hole 1's manifest
    pub(crate) fn course_data() -> Result<tempfile::TempDir, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(DATASETS_FILE), DATASETS)?;
        fs::create_dir(dir.path().join(MANIFESTS_DIR))?;
        fs::write(
            dir.path().join(MANIFESTS_DIR).join("riverside_2023_20cm.json"),
            MANIFEST,
        )?;
        Ok(dir)
    }

    #[test]
    fn test_resolve_dtm_id() -> Result<(), Box<dyn Error>> {
        let dir = course_data()?;
        let registry = Registry::load(dir.path())?;

        assert_eq!(registry.datasets().len(), 2);
        assert_eq!(
            registry.resolve_dtm_id("riverside_country_club", 1)?,
            "riverside_2023_20cm"
        );
        assert!(matches!(
            registry.resolve_dtm_id("riverside_country_club", 7),
            Err(ConfigurationError::UnknownHole { hole_id: 7, .. })
        ));
        assert!(registry.is_allowed("riverside_2023_20cm_h2"));
        assert!(!registry.is_allowed("pebble_beach_1"));
        Ok(())
    }

    #[test]
    fn test_load_manifest() -> Result<(), Box<dyn Error>> {
        let dir = course_data()?;
        let manifest = Registry::load(dir.path())?.manifest("riverside_2023_20cm")?;

        assert_eq!(manifest.hole_id, Some(1));
        assert_eq!(
            manifest.frame,
            GreenFrame::new(
                ProjectedPoint::new(443_900.0, 4_457_700.0),
                Degree::new(15.0),
                EpsgCode::new(32612)
            )
        );
        Ok(())
    }

    #[test]
    fn test_manifest_path_override() -> Result<(), Box<dyn Error>> {
        let dir = course_data()?;
        fs::create_dir(dir.path().join("greens"))?;
        fs::write(
            dir.path().join("greens/h2.json"),
            MANIFEST.replace("riverside_2023_20cm", "riverside_2023_20cm_h2"),
        )?;

        let manifest = Registry::load(dir.path())?.manifest("riverside_2023_20cm_h2")?;
        assert_eq!(manifest.dtm_id, "riverside_2023_20cm_h2");
        Ok(())
    }

    #[test]
    fn test_missing_fields_are_named() -> Result<(), Box<dyn Error>> {
        let dir = course_data()?;
        let path = dir.path().join(MANIFESTS_DIR).join("riverside_2023_20cm.json");
        let registry = Registry::load(dir.path())?;

        fs::write(&path, MANIFEST.replace("\"green_rotation_deg\": 15.0,", ""))?;
        match registry.manifest("riverside_2023_20cm") {
            Err(ConfigurationError::MissingField { field, .. }) => {
                assert_eq!(field, "green_rotation_deg")
            }
            other => panic!("unexpected {other:?}"),
        }

        fs::write(&path, MANIFEST.replace("\"y\": 4457700.0", "\"z\": 1.0"))?;
        match registry.manifest("riverside_2023_20cm") {
            Err(ConfigurationError::MissingField { field, .. }) => {
                assert_eq!(field, "green_origin_projected_m.y")
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_manifest_errors() -> Result<(), Box<dyn Error>> {
        let dir = course_data()?;
        let registry = Registry::load(dir.path())?;

        // Listed but no manifest on disk
        assert!(matches!(
            registry.manifest("riverside_2023_20cm_h2"),
            Err(ConfigurationError::Io { .. })
        ));
        assert!(matches!(
            registry.manifest("../datasets"),
            Err(ConfigurationError::UnknownDtm(_))
        ));

        fs::write(
            dir.path().join(MANIFESTS_DIR).join("riverside_2023_20cm.json"),
            "{ not json",
        )?;
        assert!(matches!(
            registry.manifest("riverside_2023_20cm"),
            Err(ConfigurationError::Parse { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_registry_rejects_path_like_ids() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(DATASETS_FILE),
            r#"{"datasets":[{"dtm_id":"../../etc/passwd","course_id":"c","hole_id":1,
                "grid_spacing_m":0.2,"grid_rows":1,"grid_cols":1}]}"#,
        )?;
        assert!(matches!(
            Registry::load(dir.path()),
            Err(ConfigurationError::InvalidDtmId(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_registry() {
        let err = Registry::load("/nonexistent/course_data").unwrap_err();
        assert!(err.to_string().contains("datasets.json"));
    }
}
