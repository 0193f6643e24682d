//! Coherency (T) and covariance (C) matrices from quad scattering coefficients
//!
//! Both matrices are built per pixel from HH, HV and VV. The upper triangle
//! and the diagonal are evaluated directly; the lower triangle is the complex
//! conjugate of the upper one, so every pixel is exactly Hermitian.

use crate::scene::SarScene;
use crate::types::{MatrixKind, PolComplex, PolMatrix, PolSarError, PolSarResult};
use ndarray::{s, ArrayView2, CowArray, Ix2, Zip};
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

/// How the VH channel enters the matrix derivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VhHandling {
    /// Reciprocal scattering: HV stands for both cross-pol terms, VH is ignored
    #[default]
    Reciprocal,
    /// Use (HV + VH) / 2 as the cross-pol term
    Symmetrize,
}

/// Polarimetric matrix parameters
#[derive(Debug, Clone, Default)]
pub struct PolarimetryParams {
    pub vh_handling: VhHandling,
}

/// Derives T and C matrices from calibrated coefficients
#[derive(Debug, Clone, Default)]
pub struct PolarimetricEngine {
    params: PolarimetryParams,
}

impl PolarimetricEngine {
    pub fn new(params: PolarimetryParams) -> Self {
        Self { params }
    }

    pub fn vh_handling(&self) -> VhHandling {
        self.params.vh_handling
    }

    /// Compute the coherency matrix T, shape (3, 3, rows, cols)
    pub fn coherency(
        &self,
        hh: ArrayView2<'_, PolComplex>,
        hv: ArrayView2<'_, PolComplex>,
        vh: ArrayView2<'_, PolComplex>,
        vv: ArrayView2<'_, PolComplex>,
    ) -> PolSarResult<PolMatrix> {
        self.build(MatrixKind::Coherency, hh, hv, vh, vv)
    }

    /// Compute the covariance matrix C, shape (3, 3, rows, cols)
    pub fn covariance(
        &self,
        hh: ArrayView2<'_, PolComplex>,
        hv: ArrayView2<'_, PolComplex>,
        vh: ArrayView2<'_, PolComplex>,
        vv: ArrayView2<'_, PolComplex>,
    ) -> PolSarResult<PolMatrix> {
        self.build(MatrixKind::Covariance, hh, hv, vh, vv)
    }

    /// Derive T for the scene unless it is already present
    pub fn compute_t(&self, scene: &mut SarScene) -> PolSarResult<()> {
        self.compute(MatrixKind::Coherency, scene)
    }

    /// Derive C for the scene unless it is already present
    pub fn compute_c(&self, scene: &mut SarScene) -> PolSarResult<()> {
        self.compute(MatrixKind::Covariance, scene)
    }

    pub fn compute(&self, kind: MatrixKind, scene: &mut SarScene) -> PolSarResult<()> {
        if scene.has_matrix(kind) {
            log::debug!("{} matrix already computed, skipping", kind);
            return Ok(());
        }
        if !scene.is_calibrated() {
            log::warn!("Computing {} matrix on uncalibrated coefficients", kind);
        }

        let (rows, cols) = scene.dim();
        log::info!(
            "Computing {} matrix for {}x{} scene on {} ({:?} cross-pol)",
            kind,
            rows,
            cols,
            scene.device(),
            self.params.vh_handling
        );

        let matrix = self.build(kind, scene.hh(), scene.hv(), scene.vh(), scene.vv())?;
        scene.set_matrix(kind, matrix)
    }

    fn build(
        &self,
        kind: MatrixKind,
        hh: ArrayView2<'_, PolComplex>,
        hv: ArrayView2<'_, PolComplex>,
        vh: ArrayView2<'_, PolComplex>,
        vv: ArrayView2<'_, PolComplex>,
    ) -> PolSarResult<PolMatrix> {
        let dim = hh.dim();
        if hv.dim() != dim || vh.dim() != dim || vv.dim() != dim {
            return Err(PolSarError::Shape(format!(
                "Channel shapes differ: HH {:?}, HV {:?}, VH {:?}, VV {:?}",
                hh.dim(),
                hv.dim(),
                vh.dim(),
                vv.dim()
            )));
        }

        let cross = self.cross_pol(hv, vh);
        let element: fn(usize, usize, PolComplex, PolComplex, PolComplex) -> PolComplex = match kind {
            MatrixKind::Coherency => coherency_element,
            MatrixKind::Covariance => covariance_element,
        };

        let (rows, cols) = dim;
        let mut matrix = PolMatrix::zeros((3, 3, rows, cols));

        for i in 0..3 {
            for j in i..3 {
                let mut lane = matrix.slice_mut(s![i, j, .., ..]);
                let zip = Zip::from(&mut lane).and(&hh).and(&cross).and(&vv);
                if cfg!(feature = "parallel") {
                    zip.par_for_each(|out, &a, &b, &d| *out = element(i, j, a, b, d));
                } else {
                    zip.for_each(|out, &a, &b, &d| *out = element(i, j, a, b, d));
                }
            }
        }

        for i in 0..3 {
            for j in 0..i {
                let (upper, mut lower) =
                    matrix.multi_slice_mut((s![j, i, .., ..], s![i, j, .., ..]));
                Zip::from(&mut lower)
                    .and(&upper)
                    .for_each(|out, &z| *out = z.conj());
            }
        }

        Ok(matrix)
    }

    fn cross_pol<'a>(
        &self,
        hv: ArrayView2<'a, PolComplex>,
        vh: ArrayView2<'_, PolComplex>,
    ) -> CowArray<'a, PolComplex, Ix2> {
        match self.params.vh_handling {
            VhHandling::Reciprocal => CowArray::from(hv),
            VhHandling::Symmetrize => {
                CowArray::from(Zip::from(&hv).and(&vh).map_collect(|&a, &b| (a + b) * 0.5))
            }
        }
    }
}

/// Upper-triangle and diagonal elements of T in the Pauli basis
fn coherency_element(i: usize, j: usize, hh: PolComplex, hv: PolComplex, vv: PolComplex) -> PolComplex {
    let sum = hh + vv;
    let diff = hh - vv;
    match (i, j) {
        (0, 0) => PolComplex::new(0.5 * sum.norm_sqr(), 0.0),
        (0, 1) => sum * diff.conj() * 0.5,
        (0, 2) => sum * hv.conj(),
        (1, 1) => PolComplex::new(0.5 * diff.norm_sqr(), 0.0),
        (1, 2) => diff * hv.conj(),
        (2, 2) => PolComplex::new(2.0 * hv.norm_sqr(), 0.0),
        _ => unreachable!("lower triangle is filled by conjugation"),
    }
}

/// Upper-triangle and diagonal elements of C in the lexicographic basis
fn covariance_element(i: usize, j: usize, hh: PolComplex, hv: PolComplex, vv: PolComplex) -> PolComplex {
    match (i, j) {
        (0, 0) => PolComplex::new(hh.norm_sqr(), 0.0),
        (0, 1) => hh * hv.conj() * SQRT_2,
        (0, 2) => hh * vv.conj(),
        (1, 1) => PolComplex::new(2.0 * hv.norm_sqr(), 0.0),
        (1, 2) => hv * vv.conj() * SQRT_2,
        (2, 2) => PolComplex::new(vv.norm_sqr(), 0.0),
        _ => unreachable!("lower triangle is filled by conjugation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScatteringTensor;
    use approx::assert_relative_eq;

    fn single_pixel_scene(hh: PolComplex, hv: PolComplex, vh: PolComplex, vv: PolComplex) -> SarScene {
        let mut coeffs = ScatteringTensor::zeros((2, 2, 1, 1));
        coeffs[[0, 0, 0, 0]] = hh;
        coeffs[[0, 1, 0, 0]] = hv;
        coeffs[[1, 0, 0, 0]] = vh;
        coeffs[[1, 1, 0, 0]] = vv;
        SarScene::new(coeffs).unwrap()
    }

    #[test]
    fn test_surface_scatterer_scalars() {
        let two = PolComplex::new(2.0, 0.0);
        let zero = PolComplex::new(0.0, 0.0);
        let mut scene = single_pixel_scene(two, zero, zero, two);
        let engine = PolarimetricEngine::default();
        engine.compute_t(&mut scene).unwrap();
        engine.compute_c(&mut scene).unwrap();

        let t = scene.t_matrix().unwrap();
        assert_relative_eq!(t[[0, 0, 0, 0]].re, 8.0);
        assert_relative_eq!(t[[1, 1, 0, 0]].re, 0.0);
        assert_relative_eq!(t[[2, 2, 0, 0]].re, 0.0);

        let c = scene.c_matrix().unwrap();
        assert_relative_eq!(c[[0, 0, 0, 0]].re, 4.0);
        assert_relative_eq!(c[[1, 1, 0, 0]].re, 0.0);
        assert_relative_eq!(c[[2, 2, 0, 0]].re, 4.0);
        assert_relative_eq!(c[[0, 2, 0, 0]].re, 4.0);
    }

    #[test]
    fn test_general_pixel_matches_closed_form() {
        let hh = PolComplex::new(1.0, 2.0);
        let hv = PolComplex::new(-0.5, 0.25);
        let vv = PolComplex::new(0.75, -1.5);
        let mut scene = single_pixel_scene(hh, hv, PolComplex::new(9.0, 9.0), vv);
        let engine = PolarimetricEngine::default();
        engine.compute_t(&mut scene).unwrap();
        engine.compute_c(&mut scene).unwrap();

        let t = scene.t_matrix().unwrap();
        let expected_t23 = (hh - vv) * hv.conj();
        assert_relative_eq!(t[[1, 2, 0, 0]].re, expected_t23.re, epsilon = 1e-12);
        assert_relative_eq!(t[[1, 2, 0, 0]].im, expected_t23.im, epsilon = 1e-12);

        let c = scene.c_matrix().unwrap();
        let expected_c21 = hh.conj() * hv * SQRT_2;
        assert_relative_eq!(c[[1, 0, 0, 0]].re, expected_c21.re, epsilon = 1e-12);
        assert_relative_eq!(c[[1, 0, 0, 0]].im, expected_c21.im, epsilon = 1e-12);
        let expected_c31 = vv * hh.conj();
        assert_relative_eq!(c[[2, 0, 0, 0]].re, expected_c31.re, epsilon = 1e-12);
        assert_relative_eq!(c[[2, 0, 0, 0]].im, expected_c31.im, epsilon = 1e-12);
    }

    #[test]
    fn test_matrices_are_hermitian() {
        let coeffs = ScatteringTensor::from_shape_fn((2, 2, 4, 5), |(a, b, r, c)| {
            PolComplex::new(
                ((a * 7 + b * 3 + r * 5 + c) as f64).sin(),
                ((a + b * 11 + r * 2 + c * 13) as f64).cos(),
            )
        });
        let mut scene = SarScene::new(coeffs).unwrap();
        let engine = PolarimetricEngine::default();
        engine.compute_t(&mut scene).unwrap();
        engine.compute_c(&mut scene).unwrap();

        for matrix in [scene.t_matrix().unwrap(), scene.c_matrix().unwrap()] {
            for i in 0..3 {
                assert!(matrix.slice(s![i, i, .., ..]).iter().all(|z| z.im == 0.0));
                for j in 0..3 {
                    let upper = matrix.slice(s![i, j, .., ..]);
                    let lower = matrix.slice(s![j, i, .., ..]);
                    Zip::from(&upper)
                        .and(&lower)
                        .for_each(|&u, &l| assert_eq!(u, l.conj()));
                }
            }
        }
    }

    #[test]
    fn test_zero_pixels_stay_finite() {
        let zero = PolComplex::new(0.0, 0.0);
        let mut scene = single_pixel_scene(zero, zero, zero, zero);
        let engine = PolarimetricEngine::default();
        engine.compute_t(&mut scene).unwrap();
        engine.compute_c(&mut scene).unwrap();
        assert!(scene.t_matrix().unwrap().iter().all(|z| *z == zero));
        assert!(scene.c_matrix().unwrap().iter().all(|z| *z == zero));
    }

    #[test]
    fn test_reciprocal_ignores_vh() {
        let hh = PolComplex::new(1.0, 0.0);
        let hv = PolComplex::new(0.5, 0.5);
        let vv = PolComplex::new(-1.0, 0.0);
        let engine = PolarimetricEngine::default();

        let mut a = single_pixel_scene(hh, hv, PolComplex::new(0.0, 0.0), vv);
        let mut b = single_pixel_scene(hh, hv, PolComplex::new(3.0, -2.0), vv);
        engine.compute_t(&mut a).unwrap();
        engine.compute_t(&mut b).unwrap();
        assert_eq!(a.t_matrix().unwrap(), b.t_matrix().unwrap());
    }

    #[test]
    fn test_symmetrize_averages_cross_pol() {
        let hh = PolComplex::new(1.0, 0.0);
        let vv = PolComplex::new(1.0, 0.0);
        let engine = PolarimetricEngine::new(PolarimetryParams {
            vh_handling: VhHandling::Symmetrize,
        });

        let mut scene = single_pixel_scene(hh, PolComplex::new(1.0, 0.0), PolComplex::new(3.0, 0.0), vv);
        engine.compute_t(&mut scene).unwrap();
        // cross-pol term is 2, so T33 = 2 * |2|^2
        assert_relative_eq!(scene.t_matrix().unwrap()[[2, 2, 0, 0]].re, 8.0);
    }

    #[test]
    fn test_existing_matrix_is_kept() {
        let one = PolComplex::new(1.0, 0.0);
        let mut scene = single_pixel_scene(one, one, one, one);
        let mut marker = PolMatrix::zeros((3, 3, 1, 1));
        marker[[0, 0, 0, 0]] = PolComplex::new(-42.0, 0.0);
        scene.set_matrix(MatrixKind::Coherency, marker.clone()).unwrap();

        PolarimetricEngine::default().compute_t(&mut scene).unwrap();
        assert_eq!(scene.t_matrix().unwrap(), &marker);
    }

    #[test]
    fn test_channels_from_separate_arrays() {
        let hh = ndarray::Array2::from_elem((2, 2), PolComplex::new(1.0, 0.0));
        let vv = hh.clone();
        let hv = ndarray::Array2::from_elem((2, 2), PolComplex::new(1.0, 0.0));
        let engine = PolarimetricEngine::new(PolarimetryParams {
            vh_handling: VhHandling::Symmetrize,
        });
        let t = {
            let vh = ndarray::Array2::from_elem((2, 2), PolComplex::new(3.0, 0.0));
            engine.coherency(hh.view(), hv.view(), vh.view(), vv.view()).unwrap()
        };
        assert_relative_eq!(t[[2, 2, 1, 1]].re, 8.0);
        assert_relative_eq!(t[[0, 0, 0, 0]].re, 2.0);
    }

    #[test]
    fn test_mismatched_channels_are_rejected() {
        let a = ndarray::Array2::<PolComplex>::zeros((2, 2));
        let b = ndarray::Array2::<PolComplex>::zeros((2, 3));
        let result = PolarimetricEngine::default().coherency(a.view(), a.view(), a.view(), b.view());
        assert!(matches!(result, Err(PolSarError::Shape(_))));
    }
}
