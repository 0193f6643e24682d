//! Date-indexed catalog of raw scene directories

use crate::config::ProcessorConfig;
use crate::types::{PolSarError, PolSarResult};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One acquisition found in the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEntry {
    /// Date token as it appears in the directory name, e.g. `20210312`
    pub date_token: String,
    pub date: NaiveDate,
    /// The scene's raw source directory
    pub source_dir: PathBuf,
    /// Directory holding the calibrated coefficient rasters
    pub calibrated_dir: PathBuf,
}

impl SceneEntry {
    /// The four coefficient rasters sorted by file name (HH, HV, VH, VV)
    pub fn coefficient_files(&self, pattern: &Regex) -> PolSarResult<[PathBuf; 4]> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.calibrated_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| pattern.is_match(name))
            })
            .collect();
        files.sort();

        let count = files.len();
        files.try_into().map_err(|_| {
            PolSarError::Catalog(format!(
                "Expected 4 coefficient rasters in {}, found {}",
                self.calibrated_dir.display(),
                count
            ))
        })
    }
}

/// Maps acquisition dates to scene directories
#[derive(Debug, Clone)]
pub struct SceneCatalog {
    base: PathBuf,
    entries: BTreeMap<String, SceneEntry>,
}

impl SceneCatalog {
    /// Scan `config.data_dir` for scene directories
    pub fn scan(config: &ProcessorConfig) -> PolSarResult<Self> {
        let base = config.data_dir.clone();
        if !base.is_dir() {
            return Err(PolSarError::Catalog(format!(
                "directory for scene data files is incorrect, dir: {}",
                base.display()
            )));
        }

        let mut entries = BTreeMap::new();
        for entry in fs::read_dir(&base)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            match parse_date_token(&name, config.date_token_index) {
                Ok((date_token, date)) => {
                    let calibrated_dir = path.join(&config.calibrated_subdir).join(&date_token);
                    log::debug!("Catalogued scene {} -> {}", date_token, path.display());
                    entries.insert(
                        date_token.clone(),
                        SceneEntry {
                            date_token,
                            date,
                            source_dir: path,
                            calibrated_dir,
                        },
                    );
                }
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        log::info!("Found {} scenes in {}", entries.len(), base.display());
        Ok(Self { base, entries })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a scene by its `YYYYMMDD` date string
    pub fn lookup(&self, date: &str) -> PolSarResult<&SceneEntry> {
        self.entries
            .get(date)
            .ok_or_else(|| PolSarError::SceneNotFound(date.to_string()))
    }

    /// Raw source directory of the scene acquired on `date`
    pub fn source_dir(&self, date: &str) -> PolSarResult<&Path> {
        self.lookup(date).map(|entry| entry.source_dir.as_path())
    }

    /// Catalogued dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &SceneEntry> {
        self.entries.values()
    }
}

/// Extract the date token from a scene directory name.
///
/// The name is split on `_`, the token at `index` is cut at the first `t`
/// (e.g. `20210312t0537` -> `20210312`) and must parse as `%Y%m%d`.
pub fn parse_date_token(dir_name: &str, index: usize) -> PolSarResult<(String, NaiveDate)> {
    let token = dir_name.split('_').nth(index).ok_or_else(|| {
        PolSarError::Catalog(format!("no token {} in directory name {}", index, dir_name))
    })?;
    let date_token = token.split(['t', 'T']).next().unwrap_or(token).to_string();
    let date = NaiveDate::parse_from_str(&date_token, "%Y%m%d").map_err(|e| {
        PolSarError::Catalog(format!("invalid date token {} in {}: {}", date_token, dir_name, e))
    })?;
    Ok((date_token, date))
}
