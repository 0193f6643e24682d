use polsar::core::PolarimetricEngine;
use polsar::io::store::{CONFIG_FILE, C_MATRIX_FILE, T_MATRIX_FILE};
use polsar::{Device, PolComplex, SarScene, ScatteringTensor, SceneStore};
use tempfile::tempdir;

fn calibrated_scene() -> SarScene {
    let coeffs = ScatteringTensor::from_shape_fn((2, 2, 3, 4), |(a, b, r, c)| {
        PolComplex::new(
            ((a * 31 + b * 17 + r * 7 + c) as f64).sin() * 1e-3,
            ((a + b * 5 + r * 3 + c * 11) as f64).cos() / 3.0,
        )
    });
    SarScene::with_matrices(coeffs, true, Device::Cpu, None, None).unwrap()
}

#[test]
fn test_round_trip_without_matrices() {
    let dir = tempdir().unwrap();
    let store = SceneStore::default();
    let scene = calibrated_scene();

    store.save(&scene, dir.path()).unwrap();
    let loaded = store.load(dir.path()).unwrap();

    assert_eq!(loaded.coefficients(), scene.coefficients());
    assert!(loaded.is_calibrated());
    assert!(loaded.t_matrix().is_err());
    assert!(loaded.c_matrix().is_err());
    assert!(!dir.path().join(T_MATRIX_FILE).exists());
}

#[test]
fn test_round_trip_with_matrices() {
    let dir = tempdir().unwrap();
    let store = SceneStore::default();
    let mut scene = calibrated_scene();
    let engine = PolarimetricEngine::default();
    engine.compute_t(&mut scene).unwrap();
    engine.compute_c(&mut scene).unwrap();

    store.save(&scene, dir.path().join("nested").join("record")).unwrap();
    let loaded = store.load(dir.path().join("nested").join("record")).unwrap();

    assert_eq!(loaded, scene);
    assert_eq!(loaded.t_matrix().unwrap(), scene.t_matrix().unwrap());
    assert_eq!(loaded.c_matrix().unwrap(), scene.c_matrix().unwrap());
}

#[test]
fn test_status_flags_control_what_is_read() {
    let dir = tempdir().unwrap();
    let store = SceneStore::default();
    let mut scene = calibrated_scene();
    PolarimetricEngine::default().compute_t(&mut scene).unwrap();
    store.save(&scene, dir.path()).unwrap();

    // Flip the T flag off: the artifact is then ignored on load
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{ "calibrated": true, "coeffs": true, "t_mat": false, "c_mat": false }"#,
    )
    .unwrap();
    let loaded = store.load(dir.path()).unwrap();
    assert!(loaded.t_matrix().is_err());
    assert!(!dir.path().join(C_MATRIX_FILE).exists());
}
