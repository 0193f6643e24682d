use crate::core::coefficients::RawRaster;
use crate::types::PolSarResult;
use std::path::Path;

/// Reader for one scattering-coefficient raster file.
///
/// GeoTIFF decoding lives outside this crate; implementations return the
/// bands exactly as stored so that complex assembly happens only once.
pub trait RasterSource {
    fn read_raster(&self, path: &Path) -> PolSarResult<RawRaster>;
}

impl<F> RasterSource for F
where
    F: Fn(&Path) -> PolSarResult<RawRaster>,
{
    fn read_raster(&self, path: &Path) -> PolSarResult<RawRaster> {
        self(path)
    }
}
