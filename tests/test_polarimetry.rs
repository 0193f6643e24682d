use approx::assert_relative_eq;
use polsar::core::{PolarimetricEngine, PolarimetryParams, VhHandling};
use polsar::{MatrixKind, PolComplex, SarScene, ScatteringTensor};

fn irregular_scene(rows: usize, cols: usize) -> SarScene {
    let coeffs = ScatteringTensor::from_shape_fn((2, 2, rows, cols), |(a, b, r, c)| {
        let seed = (a * 2 + b) as f64 + (r * cols + c) as f64 * 0.37;
        PolComplex::new(seed.sin() * 1.5, (seed * 1.3).cos() - 0.2)
    });
    SarScene::new(coeffs).unwrap()
}

#[test]
fn test_matrices_are_hermitian_per_pixel() {
    let mut scene = irregular_scene(5, 4);
    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();
    engine.compute_c(&mut scene).unwrap();

    for kind in [MatrixKind::Coherency, MatrixKind::Covariance] {
        let m = scene.matrix(kind).unwrap();
        for r in 0..5 {
            for c in 0..4 {
                for i in 0..3 {
                    assert_eq!(m[[i, i, r, c]].im, 0.0);
                    for j in 0..3 {
                        assert_eq!(m[[i, j, r, c]], m[[j, i, r, c]].conj());
                    }
                }
            }
        }
    }
}

#[test]
fn test_total_power_matches_between_t_and_c() {
    let mut scene = irregular_scene(3, 3);
    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();
    engine.compute_c(&mut scene).unwrap();

    let t = scene.t_matrix().unwrap();
    let c = scene.c_matrix().unwrap();
    for r in 0..3 {
        for col in 0..3 {
            let span_t: f64 = (0..3).map(|i| t[[i, i, r, col]].re).sum();
            let span_c: f64 = (0..3).map(|i| c[[i, i, r, col]].re).sum();
            let hh = scene.hh()[[r, col]];
            let hv = scene.hv()[[r, col]];
            let vv = scene.vv()[[r, col]];
            let span = hh.norm_sqr() + 2.0 * hv.norm_sqr() + vv.norm_sqr();
            assert_relative_eq!(span_t, span, epsilon = 1e-12);
            assert_relative_eq!(span_c, span, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_symmetrize_uses_cross_pol_average() {
    let mut scene = irregular_scene(2, 2);
    let mut reference = scene.clone();

    PolarimetricEngine::new(PolarimetryParams {
        vh_handling: VhHandling::Symmetrize,
    })
    .compute_t(&mut scene)
    .unwrap();
    PolarimetricEngine::default().compute_t(&mut reference).unwrap();

    let sym = scene.t_matrix().unwrap();
    let rec = reference.t_matrix().unwrap();
    // T11 and T22 do not involve the cross-pol channel
    assert_eq!(sym[[0, 0, 1, 1]], rec[[0, 0, 1, 1]]);
    assert_eq!(sym[[1, 1, 0, 1]], rec[[1, 1, 0, 1]]);

    let x = (scene.hv()[[1, 0]] + scene.vh()[[1, 0]]) * 0.5;
    assert_relative_eq!(sym[[2, 2, 1, 0]].re, 2.0 * x.norm_sqr(), epsilon = 1e-12);
}

#[test]
fn test_named_element_lookup() {
    let mut scene = irregular_scene(2, 3);
    PolarimetricEngine::default().compute_c(&mut scene).unwrap();

    let c12 = scene.element("C12").unwrap();
    let expected = scene.hh()[[1, 2]] * (scene.hv()[[1, 2]] * 2f64.sqrt()).conj();
    assert_relative_eq!(c12[[1, 2]].re, expected.re, epsilon = 1e-12);
    assert_relative_eq!(c12[[1, 2]].im, expected.im, epsilon = 1e-12);
    assert!(scene.element("T11").is_err());
}
