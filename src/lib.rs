//! polsar: dual-polarization SAR polarimetric matrix processor
//!
//! This library turns calibrated quad scattering coefficients (HH, HV, VH, VV)
//! into per-pixel coherency (T) and covariance (C) matrices, with azimuth
//! multilooking, region cropping and an on-disk scene cache.

pub mod types;
pub mod scene;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    Device, MatrixElement, MatrixKind, PolComplex, PolImage, PolMatrix, PolSarError, PolSarResult,
    Polarization, ScatteringTensor,
};

pub use scene::SarScene;
pub use config::ProcessorConfig;
pub use pipeline::ScenePipeline;
pub use io::{RasterSource, SceneCache, SceneCatalog, SceneStore, StatusRecord};
