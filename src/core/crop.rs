use crate::scene::SarScene;
use crate::types::{PolSarError, PolSarResult};
use ndarray::s;

/// Half-open rectangular window `[row_start, row_end) x [col_start, col_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl CropWindow {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// Build a window from `[r1, r2, c1, c2]` margins
    pub fn from_margins(margins: &[usize]) -> PolSarResult<Self> {
        match margins {
            &[r1, r2, c1, c2] => Ok(Self::new(r1, r2, c1, c2)),
            _ => Err(PolSarError::InvalidRegion(format!(
                "size of margins should be 4, but got margin: {:?}",
                margins
            ))),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (
            self.row_end.saturating_sub(self.row_start),
            self.col_end.saturating_sub(self.col_start),
        )
    }

    /// Check the window is non-empty and inside a `rows x cols` grid
    pub fn validate(&self, rows: usize, cols: usize) -> PolSarResult<()> {
        if self.row_end <= self.row_start || self.col_end <= self.col_start {
            return Err(PolSarError::InvalidRegion(format!(
                "empty window {:?}",
                self
            )));
        }
        if self.row_end > rows || self.col_end > cols {
            return Err(PolSarError::InvalidRegion(format!(
                "window {:?} exceeds scene extent {}x{}",
                self, rows, cols
            )));
        }
        Ok(())
    }
}

/// Extracts rectangular sub-scenes
#[derive(Debug, Clone, Default)]
pub struct RegionCropper;

impl RegionCropper {
    pub fn new() -> Self {
        Self
    }

    /// Crop all four channels to `window`.
    ///
    /// The result owns a fresh copy of the coefficients and has no T/C.
    pub fn crop(&self, scene: &SarScene, window: CropWindow) -> PolSarResult<SarScene> {
        let (rows, cols) = scene.dim();
        window.validate(rows, cols)?;

        log::info!(
            "Cropping {}x{} scene to rows {}..{}, cols {}..{}",
            rows,
            cols,
            window.row_start,
            window.row_end,
            window.col_start,
            window.col_end
        );

        let coeffs = scene
            .coefficients()
            .slice(s![
                ..,
                ..,
                window.row_start..window.row_end,
                window.col_start..window.col_end
            ])
            .to_owned();
        scene.derive(coeffs)
    }
}
