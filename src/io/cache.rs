//! Scene cache keyed by scene identity and pipeline stage

use crate::config::ProcessorConfig;
use crate::core::multilook::MultilookMethod;
use crate::core::polarimetry::VhHandling;
use crate::io::store::{SceneStore, CONFIG_FILE};
use crate::scene::SarScene;
use crate::types::PolSarResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// Settings file stored beside each cache entry's status record
pub const PROFILE_FILE: &str = "profile.json";

/// Settings that change the values of a cached scene.
///
/// An entry written under a different profile is stale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingProfile {
    pub calibration_factor: f64,
    pub vh_handling: VhHandling,
}

impl ProcessingProfile {
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self {
            calibration_factor: config.calibration_factor,
            vh_handling: config.vh_handling,
        }
    }
}

impl Default for ProcessingProfile {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

/// Point in the processing chain a cached record corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Calibrated coefficients with configured matrices
    Calibrated,
    /// Azimuth-multilooked scene with recomputed matrices
    Multilooked { looks: usize, method: MultilookMethod },
}

impl PipelineStage {
    /// Directory name of the stage under the scene's cache entry
    pub fn dir_name(&self) -> String {
        match self {
            PipelineStage::Calibrated => "calibrated".to_string(),
            PipelineStage::Multilooked { looks, method } => format!("multilook_{}_{}", method, looks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneKey {
    pub scene_id: String,
    pub stage: PipelineStage,
}

impl SceneKey {
    pub fn new(scene_id: impl Into<String>, stage: PipelineStage) -> Self {
        Self {
            scene_id: scene_id.into(),
            stage,
        }
    }
}

/// Invalidation signal for a cache lookup
#[derive(Debug, Clone, Default)]
pub struct Freshness {
    /// Newest modification time among the upstream source files
    pub newest_source: Option<SystemTime>,
    /// Discard the entry regardless of timestamps
    pub force_reload: bool,
    /// Settings the caller would compute the scene with
    pub profile: ProcessingProfile,
}

impl Freshness {
    /// Collect the newest modification time of `sources`
    pub fn from_sources<P: AsRef<Path>>(
        sources: &[P],
        force_reload: bool,
        profile: ProcessingProfile,
    ) -> PolSarResult<Self> {
        let mut newest = None;
        for source in sources {
            let modified = fs::metadata(source.as_ref())?.modified()?;
            newest = Some(match newest {
                Some(current) if current >= modified => current,
                _ => modified,
            });
        }
        Ok(Self {
            newest_source: newest,
            force_reload,
            profile,
        })
    }
}

/// Directory-backed cache of scene records
#[derive(Debug, Clone)]
pub struct SceneCache {
    root: PathBuf,
    store: SceneStore,
}

impl SceneCache {
    pub fn new<P: Into<PathBuf>>(root: P, store: SceneStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, key: &SceneKey) -> PathBuf {
        self.root.join(&key.scene_id).join(key.stage.dir_name())
    }

    /// Return the cached scene when present and fresh.
    ///
    /// A stale, force-reloaded or differently-profiled entry is cleared and
    /// reported as a miss.
    pub fn lookup(&self, key: &SceneKey, freshness: &Freshness) -> PolSarResult<Option<SarScene>> {
        let dir = self.entry_dir(key);
        let status_path = dir.join(CONFIG_FILE);
        if !status_path.is_file() {
            log::debug!("Cache miss for {:?}", key);
            return Ok(None);
        }

        if freshness.force_reload {
            log::info!("Forced reload, discarding cache entry {}", dir.display());
            self.clear_entry(&dir)?;
            return Ok(None);
        }

        match read_profile(&dir)? {
            Some(saved) if saved == freshness.profile => {}
            saved => {
                log::info!(
                    "Cache entry {} was computed with {:?}, current settings are {:?}, discarding",
                    dir.display(),
                    saved,
                    freshness.profile
                );
                self.clear_entry(&dir)?;
                return Ok(None);
            }
        }

        if let Some(newest) = freshness.newest_source {
            let saved = fs::metadata(&status_path)?.modified()?;
            if newest > saved {
                log::info!("Source files are newer than cache entry {}, discarding", dir.display());
                self.clear_entry(&dir)?;
                return Ok(None);
            }
        }

        log::debug!("Cache hit for {:?}", key);
        self.store.load(&dir).map(Some)
    }

    /// Save `scene` under `key`, recording the profile it was computed with
    pub fn insert(&self, key: &SceneKey, scene: &SarScene, profile: &ProcessingProfile) -> PolSarResult<()> {
        let dir = self.entry_dir(key);
        // Without a profile the entry never matches, so it goes first
        remove_profile(&dir)?;
        self.store.save(scene, &dir)?;
        write_profile(&dir, profile)
    }

    /// Drop the entry for `key`
    pub fn invalidate(&self, key: &SceneKey) -> PolSarResult<()> {
        let dir = self.entry_dir(key);
        if dir.is_dir() {
            self.clear_entry(&dir)?;
        }
        Ok(())
    }

    fn clear_entry(&self, dir: &Path) -> PolSarResult<()> {
        self.store.clear(dir)?;
        remove_profile(dir)
    }
}

fn read_profile(dir: &Path) -> PolSarResult<Option<ProcessingProfile>> {
    let path = dir.join(PROFILE_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    match serde_json::from_str(&text) {
        Ok(profile) => Ok(Some(profile)),
        Err(e) => {
            log::warn!("Unreadable cache profile {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn write_profile(dir: &Path, profile: &ProcessingProfile) -> PolSarResult<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(temp.as_file_mut(), profile)?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.persist(dir.join(PROFILE_FILE)).map_err(|e| e.error)?;
    Ok(())
}

fn remove_profile(dir: &Path) -> PolSarResult<()> {
    match fs::remove_file(dir.join(PROFILE_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
