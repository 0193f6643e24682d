use crate::core::coefficients::{ComplexCoefficientBuilder, RawRaster};
use crate::scene::SarScene;
use crate::types::{Device, PolSarError, PolSarResult, ScatteringTensor};
use ndarray::Zip;

/// Digital-number scale of the calibrated slant-range products
pub const DEFAULT_CALIBRATION_FACTOR: f64 = 10_000.0;

/// Radiometric calibration parameters
#[derive(Debug, Clone)]
pub struct CalibrationParams {
    /// Every coefficient component is divided by this factor
    pub factor: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            factor: DEFAULT_CALIBRATION_FACTOR,
        }
    }
}

/// Rescales raw digital numbers to calibrated complex reflectivity
#[derive(Debug, Clone)]
pub struct Calibrator {
    params: CalibrationParams,
}

impl Calibrator {
    /// Create a calibrator; the factor must be a positive finite number
    pub fn new(params: CalibrationParams) -> PolSarResult<Self> {
        if !params.factor.is_finite() || params.factor <= 0.0 {
            return Err(PolSarError::InvalidParameter(format!(
                "Calibration factor must be positive, got {}",
                params.factor
            )));
        }
        Ok(Self { params })
    }

    /// Calibrator with the default factor
    pub fn standard() -> Self {
        Self {
            params: CalibrationParams::default(),
        }
    }

    pub fn factor(&self) -> f64 {
        self.params.factor
    }

    /// Calibrate a scene in place. Already-calibrated scenes are left untouched.
    ///
    /// The new tensor is computed in full before it replaces the old one, so
    /// on error the scene is unchanged. T and C are invalidated on success.
    pub fn calibrate(&self, scene: &mut SarScene) -> PolSarResult<()> {
        if scene.is_calibrated() {
            log::debug!("Scene already calibrated, skipping");
            return Ok(());
        }

        let (rows, cols) = scene.dim();
        log::info!(
            "Applying calibration factor {} to {}x{} scene",
            self.params.factor,
            rows,
            cols
        );

        let calibrated = self.rescale(scene.coefficients());
        scene.replace_coefficients(calibrated)?;
        scene.mark_calibrated();
        Ok(())
    }

    /// Assemble and calibrate raw rasters in one pass (HH, HV, VH, VV order).
    ///
    /// Real bands are divided and then combined into complex samples, so the
    /// real/imaginary assembly happens exactly once for each raster.
    pub fn calibrate_raw(&self, rasters: &[RawRaster; 4], device: Device) -> PolSarResult<SarScene> {
        log::info!(
            "Calibrating raw rasters with factor {}",
            self.params.factor
        );
        let coeffs = ComplexCoefficientBuilder::new().build_scaled(rasters, self.params.factor)?;
        let mut scene = SarScene::new(coeffs)?.with_device(device);
        scene.mark_calibrated();
        Ok(scene)
    }

    fn rescale(&self, coeffs: &ScatteringTensor) -> ScatteringTensor {
        let factor = self.params.factor;

        if cfg!(feature = "parallel") {
            Zip::from(coeffs).par_map_collect(|&z| z / factor)
        } else {
            Zip::from(coeffs).map_collect(|&z| z / factor)
        }
    }
}
