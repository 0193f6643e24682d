use ndarray::{Array2, Array4};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Complex-valued scattering sample (re + j·im), always at least 64-bit complex
pub type PolComplex = Complex<f64>;

/// 2D complex raster (azimuth x range)
pub type PolImage = Array2<PolComplex>;

/// 2D real raster (azimuth x range), used for intensities
pub type PolRealImage = Array2<f64>;

/// Scattering coefficients indexed as [pol-row, pol-col, azimuth, range], shape (2, 2, rows, cols)
pub type ScatteringTensor = Array4<PolComplex>;

/// Per-pixel 3x3 polarimetric matrix indexed as [row, col, azimuth, range], shape (3, 3, rows, cols)
pub type PolMatrix = Array4<PolComplex>;

/// Transmit/receive polarization pairs in canonical tensor order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    HH,
    HV,
    VH,
    VV,
}

impl Polarization {
    /// Canonical ordering of the scattering tensor
    pub const ALL: [Polarization; 4] = [
        Polarization::HH,
        Polarization::HV,
        Polarization::VH,
        Polarization::VV,
    ];

    /// Position of this polarization on the first two tensor axes
    pub fn index(self) -> (usize, usize) {
        match self {
            Polarization::HH => (0, 0),
            Polarization::HV => (0, 1),
            Polarization::VH => (1, 0),
            Polarization::VV => (1, 1),
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::HH => write!(f, "HH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::VV => write!(f, "VV"),
        }
    }
}

impl FromStr for Polarization {
    type Err = PolSarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HH" => Ok(Polarization::HH),
            "HV" => Ok(Polarization::HV),
            "VH" => Ok(Polarization::VH),
            "VV" => Ok(Polarization::VV),
            _ => Err(PolSarError::InvalidParameter(format!(
                "Invalid polarization: {}",
                s
            ))),
        }
    }
}

/// Which polarimetric matrix a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Coherency matrix T (Pauli basis)
    Coherency,
    /// Covariance matrix C (lexicographic basis)
    Covariance,
}

impl MatrixKind {
    pub fn symbol(self) -> char {
        match self {
            MatrixKind::Coherency => 'T',
            MatrixKind::Covariance => 'C',
        }
    }
}

impl std::fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixKind::Coherency => write!(f, "T (coherency)"),
            MatrixKind::Covariance => write!(f, "C (covariance)"),
        }
    }
}

/// A single element of T or C, e.g. `T23` is `{ Coherency, row: 1, col: 2 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixElement {
    pub kind: MatrixKind,
    /// Zero-based matrix row
    pub row: usize,
    /// Zero-based matrix column
    pub col: usize,
}

impl FromStr for MatrixElement {
    type Err = PolSarError;

    /// Parses one-based names `T11`..`T33` and `C11`..`C33`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PolSarError::InvalidParameter(format!("Invalid matrix element: {}", s));

        let bytes = s.as_bytes();
        if bytes.len() != 3 {
            return Err(invalid());
        }
        let kind = match bytes[0].to_ascii_uppercase() {
            b'T' => MatrixKind::Coherency,
            b'C' => MatrixKind::Covariance,
            _ => return Err(invalid()),
        };
        let digit = |b: u8| match b {
            b'1'..=b'3' => Ok((b - b'1') as usize),
            _ => Err(invalid()),
        };

        Ok(MatrixElement {
            kind,
            row: digit(bytes[1])?,
            col: digit(bytes[2])?,
        })
    }
}

impl std::fmt::Display for MatrixElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.kind.symbol(), self.row + 1, self.col + 1)
    }
}

/// Processing backend tag. Informational only, results never depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu => write!(f, "gpu"),
        }
    }
}

impl FromStr for Device {
    type Err = PolSarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "gpu" => Ok(Device::Gpu),
            _ => Err(PolSarError::InvalidParameter(format!(
                "Device: {} is not a valid device (should be 'cpu' or 'gpu')",
                s
            ))),
        }
    }
}

/// Error types for polarimetric processing
#[derive(Debug, thiserror::Error)]
pub enum PolSarError {
    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Unsafe cast: combining {from} components into {to} would lose precision")]
    UnsafeCast {
        from: &'static str,
        to: &'static str,
    },

    #[error("Unsupported multilook method: {0} (available: mean, median, nearest)")]
    UnsupportedMethod(String),

    #[error("Scene is not calibrated, calibrate it before saving")]
    NotCalibrated,

    #[error("Status record not found: {}", .0.display())]
    MissingConfig(PathBuf),

    #[error("Artifact flagged in status record is missing: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("{0} matrix is not computed")]
    MatrixNotComputed(MatrixKind),

    #[error("Invalid crop region: {0}")]
    InvalidRegion(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("No scene found for date {0}")]
    SceneNotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for polarimetric operations
pub type PolSarResult<T> = Result<T, PolSarError>;
