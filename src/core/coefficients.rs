use crate::types::{PolComplex, PolImage, PolSarError, PolSarResult, ScatteringTensor};
use ndarray::{s, Array2, Array3, Array4, Zip};
use num_complex::Complex;

/// Real sample types a raw raster band can carry
pub trait RasterSample: Copy + Send + Sync {
    /// NumPy-style dtype name, used in error messages
    const DTYPE: &'static str;
    /// Whether every value of this type is exactly representable as f64
    const LOSSLESS_F64: bool;

    fn to_f64(self) -> f64;
}

macro_rules! impl_raster_sample {
    ($($ty:ty => $name:literal, $lossless:literal);* $(;)?) => {
        $(
            impl RasterSample for $ty {
                const DTYPE: &'static str = $name;
                const LOSSLESS_F64: bool = $lossless;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_raster_sample! {
    u8 => "uint8", true;
    u16 => "uint16", true;
    i16 => "int16", true;
    u32 => "uint32", true;
    i32 => "int32", true;
    f32 => "float32", true;
    f64 => "float64", true;
    i64 => "int64", false;
    u64 => "uint64", false;
}

/// Real-valued raster bands shaped (bands, rows, cols).
///
/// Band 0 is the real part, band 1 (when present) the imaginary part.
#[derive(Debug, Clone)]
pub enum RealBands {
    U8(Array3<u8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    U32(Array3<u32>),
    I32(Array3<i32>),
    I64(Array3<i64>),
    U64(Array3<u64>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

/// Single-band rasters that already hold complex samples
#[derive(Debug, Clone)]
pub enum ComplexRaster {
    C32(Array2<Complex<f32>>),
    C64(Array2<Complex<f64>>),
}

/// One polarization channel as delivered by the raster reader
#[derive(Debug, Clone)]
pub enum RawRaster {
    Bands(RealBands),
    Complex(ComplexRaster),
}

impl RawRaster {
    /// Spatial dimensions (rows, cols)
    pub fn spatial_dim(&self) -> (usize, usize) {
        fn bands_dim<T>(a: &Array3<T>) -> (usize, usize) {
            let (_, rows, cols) = a.dim();
            (rows, cols)
        }
        match self {
            RawRaster::Bands(RealBands::U8(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::U16(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::I16(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::U32(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::I32(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::I64(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::U64(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::F32(a)) => bands_dim(a),
            RawRaster::Bands(RealBands::F64(a)) => bands_dim(a),
            RawRaster::Complex(ComplexRaster::C32(a)) => a.dim(),
            RawRaster::Complex(ComplexRaster::C64(a)) => a.dim(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, RawRaster::Complex(_))
    }

    /// Convert to a complex raster, dividing every component by `scale`.
    ///
    /// Real bands are combined as `real + j·imag`; complex rasters keep their
    /// values. Either way the raster is converted exactly once here.
    pub fn to_complex(&self, scale: f64) -> PolSarResult<PolImage> {
        match self {
            RawRaster::Bands(bands) => match bands {
                RealBands::U8(a) => combine_bands(a, scale),
                RealBands::U16(a) => combine_bands(a, scale),
                RealBands::I16(a) => combine_bands(a, scale),
                RealBands::U32(a) => combine_bands(a, scale),
                RealBands::I32(a) => combine_bands(a, scale),
                RealBands::I64(a) => combine_bands(a, scale),
                RealBands::U64(a) => combine_bands(a, scale),
                RealBands::F32(a) => combine_bands(a, scale),
                RealBands::F64(a) => combine_bands(a, scale),
            },
            RawRaster::Complex(ComplexRaster::C32(a)) => {
                Ok(a.mapv(|z| PolComplex::new(z.re as f64, z.im as f64) / scale))
            }
            RawRaster::Complex(ComplexRaster::C64(a)) => {
                if scale == 1.0 {
                    Ok(a.clone())
                } else {
                    Ok(a.mapv(|z| z / scale))
                }
            }
        }
    }
}

fn combine_bands<T: RasterSample>(bands: &Array3<T>, scale: f64) -> PolSarResult<PolImage> {
    if !T::LOSSLESS_F64 {
        return Err(PolSarError::UnsafeCast {
            from: T::DTYPE,
            to: "complex128",
        });
    }

    let (band_count, rows, cols) = bands.dim();
    match band_count {
        2 => {
            let real = bands.slice(s![0, .., ..]);
            let imag = bands.slice(s![1, .., ..]);
            Ok(Zip::from(&real).and(&imag).map_collect(|&re, &im| {
                PolComplex::new(re.to_f64() / scale, im.to_f64() / scale)
            }))
        }
        // Single band carries only the real part
        1 => Ok(bands
            .slice(s![0, .., ..])
            .mapv(|re| PolComplex::new(re.to_f64() / scale, 0.0))),
        _ => Err(PolSarError::Shape(format!(
            "Expected 1 or 2 bands per raster, got {} for {}x{} raster",
            band_count, rows, cols
        ))),
    }
}

/// Assembles the (2, 2, rows, cols) scattering tensor from four rasters
#[derive(Debug, Clone, Default)]
pub struct ComplexCoefficientBuilder;

impl ComplexCoefficientBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the tensor from rasters given in HH, HV, VH, VV order
    pub fn build(&self, rasters: &[RawRaster; 4]) -> PolSarResult<ScatteringTensor> {
        self.build_scaled(rasters, 1.0)
    }

    /// Build the tensor, dividing every component by `scale` during conversion
    pub fn build_scaled(&self, rasters: &[RawRaster; 4], scale: f64) -> PolSarResult<ScatteringTensor> {
        let (rows, cols) = rasters[0].spatial_dim();
        for (idx, raster) in rasters.iter().enumerate() {
            if raster.spatial_dim() != (rows, cols) {
                return Err(PolSarError::Shape(format!(
                    "Raster {} has shape {:?}, expected ({}, {})",
                    idx,
                    raster.spatial_dim(),
                    rows,
                    cols
                )));
            }
        }

        log::debug!(
            "Assembling {}x{} scattering tensor (complex inputs: {})",
            rows,
            cols,
            rasters.iter().filter(|r| r.is_complex()).count()
        );

        let channels = convert_all(rasters, scale)?;

        let mut tensor = Array4::zeros((2, 2, rows, cols));
        for (idx, channel) in channels.iter().enumerate() {
            tensor.slice_mut(s![idx / 2, idx % 2, .., ..]).assign(channel);
        }
        Ok(tensor)
    }
}

#[cfg(feature = "parallel")]
fn convert_all(rasters: &[RawRaster; 4], scale: f64) -> PolSarResult<Vec<PolImage>> {
    use rayon::prelude::*;

    rasters[..]
        .par_iter()
        .map(|raster| raster.to_complex(scale))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn convert_all(rasters: &[RawRaster; 4], scale: f64) -> PolSarResult<Vec<PolImage>> {
    rasters.iter().map(|raster| raster.to_complex(scale)).collect()
}
