use crate::scene::SarScene;
use crate::types::{PolComplex, PolImage, PolRealImage, PolSarError, PolSarResult, ScatteringTensor};
use ndarray::{s, Array2, ArrayView2, Zip};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Aggregation applied within each block of azimuth lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultilookMethod {
    /// NaN-aware mean of the block
    #[default]
    Mean,
    /// NaN-aware median of the block
    Median,
    /// Pick the centre line of the block
    Nearest,
}

impl FromStr for MultilookMethod {
    type Err = PolSarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(MultilookMethod::Mean),
            "median" => Ok(MultilookMethod::Median),
            "nearest" => Ok(MultilookMethod::Nearest),
            _ => Err(PolSarError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for MultilookMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultilookMethod::Mean => write!(f, "mean"),
            MultilookMethod::Median => write!(f, "median"),
            MultilookMethod::Nearest => write!(f, "nearest"),
        }
    }
}

/// Multilooking parameters for speckle reduction
#[derive(Debug, Clone, PartialEq)]
pub struct MultilookParams {
    /// Number of looks in azimuth direction (range is never reduced)
    pub azimuth_looks: usize,
    pub method: MultilookMethod,
}

impl Default for MultilookParams {
    fn default() -> Self {
        Self {
            azimuth_looks: 1,
            method: MultilookMethod::Mean,
        }
    }
}

/// Multilook processor reducing azimuth resolution of complex coefficients
pub struct MultilookProcessor {
    params: MultilookParams,
}

impl MultilookProcessor {
    /// Create a new multilook processor; at least one look is required
    pub fn new(params: MultilookParams) -> PolSarResult<Self> {
        if params.azimuth_looks == 0 {
            return Err(PolSarError::InvalidParameter(
                "Number of azimuth looks must be at least 1".to_string(),
            ));
        }
        Ok(Self { params })
    }

    /// Create a processor from a method name such as `"median"`
    pub fn from_method_name(azimuth_looks: usize, method: &str) -> PolSarResult<Self> {
        Self::new(MultilookParams {
            azimuth_looks,
            method: method.parse()?,
        })
    }

    pub fn params(&self) -> &MultilookParams {
        &self.params
    }

    /// Multilook every polarization channel of a scene.
    ///
    /// The returned scene owns new coefficients and carries no T/C, since
    /// those no longer match the reduced extent. With a single look the
    /// scene is returned unchanged, matrices included.
    pub fn apply_to_scene(&self, scene: &SarScene) -> PolSarResult<SarScene> {
        if self.params.azimuth_looks == 1 {
            return Ok(scene.clone());
        }

        let (rows, cols) = scene.dim();
        let out_rows = self.output_rows(rows);
        log::info!(
            "Applying {} multilook: {} azimuth looks to {}x{} scene -> {}x{}",
            self.params.method,
            self.params.azimuth_looks,
            rows,
            cols,
            out_rows,
            cols
        );

        let mut coeffs = ScatteringTensor::zeros((2, 2, out_rows, cols));
        for i in 0..2 {
            for j in 0..2 {
                let reduced = self.apply_multilook(scene.coefficients().slice(s![i, j, .., ..]))?;
                coeffs.slice_mut(s![i, j, .., ..]).assign(&reduced);
            }
        }

        scene.derive(coeffs)
    }

    /// Multilook a single complex raster along azimuth (rows)
    pub fn apply_multilook(&self, image: ArrayView2<'_, PolComplex>) -> PolSarResult<PolImage> {
        let looks = self.params.azimuth_looks;
        if looks == 1 {
            return Ok(image.to_owned());
        }

        let (rows, cols) = image.dim();
        let out_rows = self.output_rows(rows);
        log::debug!("Multilook output dimensions: {}x{}", out_rows, cols);
        if out_rows == 0 {
            log::warn!(
                "{} azimuth looks exceed the {} available rows, output is empty",
                looks,
                rows
            );
            return Ok(Array2::zeros((0, cols)));
        }

        let output = match self.params.method {
            MultilookMethod::Nearest => {
                // Centre line of each block; truncation keeps floor(rows / looks) lines
                image
                    .slice(s![looks / 2..;looks, ..])
                    .slice(s![..out_rows, ..])
                    .to_owned()
            }
            MultilookMethod::Mean | MultilookMethod::Median => {
                let reduce: fn(&mut Vec<PolComplex>) -> PolComplex = match self.params.method {
                    MultilookMethod::Median => nan_median,
                    _ => nan_mean,
                };
                let mut output = Array2::zeros((out_rows, cols));
                let block_reduce = |(row, col): (usize, usize), out: &mut PolComplex| {
                    let start = row * looks;
                    let mut block: Vec<PolComplex> = image
                        .slice(s![start..start + looks, col])
                        .iter()
                        .copied()
                        .collect();
                    *out = reduce(&mut block);
                };
                if cfg!(feature = "parallel") {
                    Zip::indexed(&mut output).par_for_each(block_reduce);
                } else {
                    Zip::indexed(&mut output).for_each(block_reduce);
                }
                output
            }
        };

        Ok(output)
    }

    /// Calculate equivalent number of looks (ENL) estimate
    ///
    /// This provides a quality metric for the multilooking
    pub fn estimate_enl(&self, intensity: &PolRealImage) -> f64 {
        let mean = intensity.mean().unwrap_or(0.0);
        let variance = intensity.mapv(|x| (x - mean).powi(2)).mean().unwrap_or(0.0);

        if variance > 1e-10 {
            mean * mean / variance
        } else {
            f64::MAX
        }
    }

    /// Get the theoretical number of looks
    pub fn theoretical_looks(&self) -> usize {
        self.params.azimuth_looks
    }

    /// floor(rows / looks); zero when the factor exceeds the row count
    fn output_rows(&self, rows: usize) -> usize {
        rows / self.params.azimuth_looks
    }
}

/// Intensity |z|^2 of a complex raster
pub fn intensity(image: ArrayView2<'_, PolComplex>) -> PolRealImage {
    image.mapv(|z| z.norm_sqr())
}

fn nan_mean(block: &mut Vec<PolComplex>) -> PolComplex {
    let mut sum = PolComplex::zero();
    let mut count = 0usize;
    for z in block.iter().filter(|z| !z.is_nan()) {
        sum += *z;
        count += 1;
    }
    if count == 0 {
        return PolComplex::new(f64::NAN, f64::NAN);
    }
    sum / count as f64
}

fn nan_median(block: &mut Vec<PolComplex>) -> PolComplex {
    block.retain(|z| !z.is_nan());
    if block.is_empty() {
        return PolComplex::new(f64::NAN, f64::NAN);
    }
    // Complex samples are ordered lexicographically by (re, im)
    block.sort_by(|a, b| match a.re.total_cmp(&b.re) {
        Ordering::Equal => a.im.total_cmp(&b.im),
        other => other,
    });
    let mid = block.len() / 2;
    if block.len() % 2 == 1 {
        block[mid]
    } else {
        (block[mid - 1] + block[mid]) * 0.5
    }
}
