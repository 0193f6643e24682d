//! The SAR scene aggregate: scattering coefficients plus derived matrices

use crate::types::{
    Device, MatrixElement, MatrixKind, PolComplex, PolMatrix, PolSarError, PolSarResult,
    Polarization, ScatteringTensor,
};
use ndarray::{s, Array4, ArrayView2};

/// One acquisition's coefficients with optional T and C matrices.
///
/// T and C, when present, always share the spatial extent of the
/// coefficients. Every change to the coefficients goes through
/// [`SarScene::replace_coefficients`], which drops both matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct SarScene {
    coeffs: ScatteringTensor,
    t_matrix: Option<PolMatrix>,
    c_matrix: Option<PolMatrix>,
    calibrated: bool,
    device: Device,
}

impl SarScene {
    /// Create an uncalibrated scene from a (2, 2, rows, cols) coefficient tensor
    pub fn new(coeffs: ScatteringTensor) -> PolSarResult<Self> {
        check_coefficient_shape(&coeffs)?;
        Ok(Self {
            coeffs,
            t_matrix: None,
            c_matrix: None,
            calibrated: false,
            device: Device::default(),
        })
    }

    /// Create a scene with all state supplied, validating matrix extents
    pub fn with_matrices(
        coeffs: ScatteringTensor,
        calibrated: bool,
        device: Device,
        t_matrix: Option<PolMatrix>,
        c_matrix: Option<PolMatrix>,
    ) -> PolSarResult<Self> {
        let mut scene = Self::new(coeffs)?;
        scene.calibrated = calibrated;
        scene.device = device;
        if let Some(t) = t_matrix {
            scene.set_matrix(MatrixKind::Coherency, t)?;
        }
        if let Some(c) = c_matrix {
            scene.set_matrix(MatrixKind::Covariance, c)?;
        }
        Ok(scene)
    }

    /// Replace the device tag
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Spatial dimensions (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        let (_, _, rows, cols) = self.coeffs.dim();
        (rows, cols)
    }

    pub fn coefficients(&self) -> &ScatteringTensor {
        &self.coeffs
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// View of one polarization channel
    pub fn polarization(&self, pol: Polarization) -> ArrayView2<'_, PolComplex> {
        let (i, j) = pol.index();
        self.coeffs.slice(s![i, j, .., ..])
    }

    pub fn hh(&self) -> ArrayView2<'_, PolComplex> {
        self.polarization(Polarization::HH)
    }

    pub fn hv(&self) -> ArrayView2<'_, PolComplex> {
        self.polarization(Polarization::HV)
    }

    pub fn vh(&self) -> ArrayView2<'_, PolComplex> {
        self.polarization(Polarization::VH)
    }

    pub fn vv(&self) -> ArrayView2<'_, PolComplex> {
        self.polarization(Polarization::VV)
    }

    pub fn has_matrix(&self, kind: MatrixKind) -> bool {
        self.matrix_slot(kind).is_some()
    }

    /// The requested matrix, or `MatrixNotComputed` when absent
    pub fn matrix(&self, kind: MatrixKind) -> PolSarResult<&PolMatrix> {
        self.matrix_slot(kind)
            .as_ref()
            .ok_or(PolSarError::MatrixNotComputed(kind))
    }

    pub fn t_matrix(&self) -> PolSarResult<&PolMatrix> {
        self.matrix(MatrixKind::Coherency)
    }

    pub fn c_matrix(&self) -> PolSarResult<&PolMatrix> {
        self.matrix(MatrixKind::Covariance)
    }

    /// View of one matrix element across the grid
    pub fn matrix_element(&self, element: MatrixElement) -> PolSarResult<ArrayView2<'_, PolComplex>> {
        let matrix = self.matrix(element.kind)?;
        Ok(matrix.slice(s![element.row, element.col, .., ..]))
    }

    /// Resolve a symbolic name (`HH`, `VV`, `T12`, `C33`, ...) to a view
    pub fn element(&self, name: &str) -> PolSarResult<ArrayView2<'_, PolComplex>> {
        if let Ok(pol) = name.parse::<Polarization>() {
            return Ok(self.polarization(pol));
        }
        let element: MatrixElement = name
            .parse()
            .map_err(|_| PolSarError::InvalidParameter(format!("Attribute {} does not exist", name)))?;
        self.matrix_element(element)
    }

    /// Drop one derived matrix
    pub fn clear_matrix(&mut self, kind: MatrixKind) {
        *self.matrix_slot_mut(kind) = None;
    }

    /// Store a derived matrix after checking it matches the current extent
    pub(crate) fn set_matrix(&mut self, kind: MatrixKind, matrix: PolMatrix) -> PolSarResult<()> {
        let (rows, cols) = self.dim();
        if matrix.dim() != (3, 3, rows, cols) {
            return Err(PolSarError::Shape(format!(
                "{} matrix has shape {:?}, expected (3, 3, {}, {})",
                kind,
                matrix.shape(),
                rows,
                cols
            )));
        }
        *self.matrix_slot_mut(kind) = Some(matrix);
        Ok(())
    }

    /// Drop both derived matrices
    pub fn clear_matrices(&mut self) {
        if self.t_matrix.is_some() || self.c_matrix.is_some() {
            log::debug!("Invalidating derived T/C matrices");
        }
        self.t_matrix = None;
        self.c_matrix = None;
    }

    /// Swap in new coefficients as a whole, invalidating T and C
    pub(crate) fn replace_coefficients(&mut self, coeffs: ScatteringTensor) -> PolSarResult<()> {
        check_coefficient_shape(&coeffs)?;
        self.coeffs = coeffs;
        self.clear_matrices();
        Ok(())
    }

    pub(crate) fn mark_calibrated(&mut self) {
        self.calibrated = true;
    }

    /// New scene on different coefficients, keeping flags but no matrices
    pub(crate) fn derive(&self, coeffs: ScatteringTensor) -> PolSarResult<Self> {
        let mut derived = Self::new(coeffs)?;
        derived.calibrated = self.calibrated;
        derived.device = self.device;
        Ok(derived)
    }

    fn matrix_slot(&self, kind: MatrixKind) -> &Option<PolMatrix> {
        match kind {
            MatrixKind::Coherency => &self.t_matrix,
            MatrixKind::Covariance => &self.c_matrix,
        }
    }

    fn matrix_slot_mut(&mut self, kind: MatrixKind) -> &mut Option<PolMatrix> {
        match kind {
            MatrixKind::Coherency => &mut self.t_matrix,
            MatrixKind::Covariance => &mut self.c_matrix,
        }
    }
}

fn check_coefficient_shape(coeffs: &Array4<PolComplex>) -> PolSarResult<()> {
    let (a, b, _, _) = coeffs.dim();
    if a != 2 || b != 2 {
        return Err(PolSarError::Shape(format!(
            "the shape of coeffs should be of the form (2, 2, x, y) [given shape -> {:?}]",
            coeffs.shape()
        )));
    }
    Ok(())
}
