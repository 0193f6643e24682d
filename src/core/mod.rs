//! Core polarimetric processing modules

pub mod coefficients;
pub mod calibrate;
pub mod polarimetry;
pub mod multilook;
pub mod crop;

// Re-export main types
pub use coefficients::{ComplexCoefficientBuilder, ComplexRaster, RasterSample, RawRaster, RealBands};
pub use calibrate::{CalibrationParams, Calibrator, DEFAULT_CALIBRATION_FACTOR};
pub use polarimetry::{PolarimetricEngine, PolarimetryParams, VhHandling};
pub use multilook::{intensity, MultilookMethod, MultilookParams, MultilookProcessor};
pub use crop::{CropWindow, RegionCropper};
