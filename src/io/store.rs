//! On-disk scene records: coefficient tensor, optional T/C and a status document

use crate::io::npy::{read_complex4, write_complex4};
use crate::scene::SarScene;
use crate::types::{Device, MatrixKind, PolSarError, PolSarResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const CONFIG_FILE: &str = "config.json";
pub const COEFFS_FILE: &str = "coeffs.npy";
pub const T_MATRIX_FILE: &str = "t_mat.npy";
pub const C_MATRIX_FILE: &str = "c_mat.npy";

/// Which artifacts a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub calibrated: bool,
    pub coeffs: bool,
    pub t_mat: bool,
    pub c_mat: bool,
}

impl StatusRecord {
    fn for_scene(scene: &SarScene) -> Self {
        Self {
            calibrated: scene.is_calibrated(),
            coeffs: true,
            t_mat: scene.has_matrix(MatrixKind::Coherency),
            c_mat: scene.has_matrix(MatrixKind::Covariance),
        }
    }
}

/// Saves and loads scene records in a directory
#[derive(Debug, Clone)]
pub struct SceneStore {
    require_calibrated: bool,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self {
            require_calibrated: true,
        }
    }
}

impl SceneStore {
    pub fn new(require_calibrated: bool) -> Self {
        Self { require_calibrated }
    }

    /// Write the scene into `dir`, creating it if absent.
    ///
    /// Artifacts are written first and `config.json` last, so an interrupted
    /// save leaves no status record and is never picked up by `load`.
    pub fn save<P: AsRef<Path>>(&self, scene: &SarScene, dir: P) -> PolSarResult<StatusRecord> {
        let dir = dir.as_ref();
        if self.require_calibrated && !scene.is_calibrated() {
            return Err(PolSarError::NotCalibrated);
        }

        fs::create_dir_all(dir)?;
        let status = StatusRecord::for_scene(scene);
        log::info!("Saving scene record to {} ({:?})", dir.display(), status);

        // An old status record must not vouch for artifacts being rewritten
        remove_if_exists(&dir.join(CONFIG_FILE))?;

        write_complex4(dir.join(COEFFS_FILE), scene.coefficients())?;
        for (kind, file) in [
            (MatrixKind::Coherency, T_MATRIX_FILE),
            (MatrixKind::Covariance, C_MATRIX_FILE),
        ] {
            let path = dir.join(file);
            match scene.matrix(kind) {
                Ok(matrix) => write_complex4(&path, matrix)?,
                Err(_) => remove_if_exists(&path)?,
            }
        }

        write_status(dir, &status)?;
        Ok(status)
    }

    /// Read the status record of `dir`
    pub fn read_status<P: AsRef<Path>>(&self, dir: P) -> PolSarResult<StatusRecord> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.is_file() {
            return Err(PolSarError::MissingConfig(path));
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load a scene record. T and C are read only when flagged.
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> PolSarResult<SarScene> {
        let dir = dir.as_ref();
        let status = self.read_status(dir)?;
        log::info!("Loading scene record from {} ({:?})", dir.display(), status);

        let coeffs = read_complex4(artifact_path(dir, COEFFS_FILE)?)?;
        let t_matrix = if status.t_mat {
            Some(read_complex4(artifact_path(dir, T_MATRIX_FILE)?)?)
        } else {
            None
        };
        let c_matrix = if status.c_mat {
            Some(read_complex4(artifact_path(dir, C_MATRIX_FILE)?)?)
        } else {
            None
        };

        SarScene::with_matrices(coeffs, status.calibrated, Device::default(), t_matrix, c_matrix)
    }

    /// Remove every artifact of the record in `dir`
    pub fn clear<P: AsRef<Path>>(&self, dir: P) -> PolSarResult<()> {
        let dir = dir.as_ref();
        log::debug!("Clearing scene record at {}", dir.display());
        for file in [CONFIG_FILE, COEFFS_FILE, T_MATRIX_FILE, C_MATRIX_FILE] {
            remove_if_exists(&dir.join(file))?;
        }
        Ok(())
    }
}

fn artifact_path(dir: &Path, file: &str) -> PolSarResult<PathBuf> {
    let path = dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PolSarError::MissingArtifact(path))
    }
}

fn write_status(dir: &Path, status: &StatusRecord) -> PolSarResult<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(temp.as_file_mut(), status)?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.persist(dir.join(CONFIG_FILE)).map_err(|e| e.error)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> PolSarResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
