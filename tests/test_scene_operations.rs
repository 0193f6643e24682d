use polsar::core::{
    Calibrator, CropWindow, MultilookMethod, MultilookParams, MultilookProcessor,
    PolarimetricEngine, RegionCropper,
};
use polsar::{PolComplex, SarScene, ScatteringTensor};
use ndarray::s;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_scene(rows: usize, cols: usize) -> SarScene {
    let coeffs = ScatteringTensor::from_shape_fn((2, 2, rows, cols), |(a, b, r, c)| {
        PolComplex::new(
            (r * cols + c) as f64 + a as f64 * 0.25,
            b as f64 - (r as f64) * 0.5,
        )
    });
    SarScene::new(coeffs).unwrap()
}

#[test]
fn test_single_look_is_bit_identical_for_all_methods() {
    init_logging();
    let mut scene = test_scene(7, 3);
    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();

    for method in [MultilookMethod::Mean, MultilookMethod::Median, MultilookMethod::Nearest] {
        let processor = MultilookProcessor::new(MultilookParams {
            azimuth_looks: 1,
            method,
        })
        .unwrap();
        let result = processor.apply_to_scene(&scene).unwrap();
        assert_eq!(result.coefficients(), scene.coefficients());
    }
}

#[test]
fn test_multilook_mean_on_scene() {
    init_logging();
    let coeffs = ScatteringTensor::from_shape_fn((2, 2, 5, 1), |(_, _, r, _)| {
        PolComplex::new([1.0, 3.0, 5.0, 7.0, 9.0][r], 0.0)
    });
    let mut scene = SarScene::new(coeffs).unwrap();
    PolarimetricEngine::default().compute_c(&mut scene).unwrap();

    let processor = MultilookProcessor::from_method_name(2, "mean").unwrap();
    let result = processor.apply_to_scene(&scene).unwrap();

    assert_eq!(result.dim(), (2, 1));
    for pol in [result.hh(), result.hv(), result.vh(), result.vv()] {
        let values: Vec<f64> = pol.iter().map(|z| z.re).collect();
        assert_eq!(values, vec![2.0, 6.0]);
    }
    // matrices no longer match the reduced extent
    assert!(result.c_matrix().is_err());
}

#[test]
fn test_crop_drops_parent_matrices() {
    init_logging();
    let mut scene = test_scene(4, 4);
    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();
    engine.compute_c(&mut scene).unwrap();

    let cropped = RegionCropper::new()
        .crop(&scene, CropWindow::new(0, 2, 0, 2))
        .unwrap();
    assert_eq!(cropped.dim(), (2, 2));
    assert_eq!(
        cropped.coefficients(),
        &scene.coefficients().slice(s![.., .., 0..2, 0..2])
    );
    assert!(cropped.t_matrix().is_err());
    assert!(cropped.c_matrix().is_err());
}

#[test]
fn test_calibrate_then_derive_matrices_chain() {
    init_logging();
    let coeffs = ScatteringTensor::from_elem((2, 2, 4, 2), PolComplex::new(20_000.0, 0.0));
    let mut scene = SarScene::new(coeffs).unwrap();

    let calibrator = Calibrator::standard();
    calibrator.calibrate(&mut scene).unwrap();
    let once = scene.clone();
    calibrator.calibrate(&mut scene).unwrap();
    assert_eq!(once, scene);

    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();
    // HH = VV = HV = 2: T11 = 0.5 * |4|^2, T33 = 2 * |2|^2
    let t = scene.t_matrix().unwrap();
    assert_eq!(t[[0, 0, 3, 1]].re, 8.0);
    assert_eq!(t[[2, 2, 0, 0]].re, 8.0);
    assert_eq!(t[[1, 1, 0, 0]].re, 0.0);

    let multilooked = MultilookProcessor::from_method_name(2, "median")
        .unwrap()
        .apply_to_scene(&scene)
        .unwrap();
    assert!(multilooked.is_calibrated());
    assert_eq!(multilooked.dim(), (2, 2));
    assert!(multilooked.t_matrix().is_err());
}
