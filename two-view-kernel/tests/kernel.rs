use approx::assert_relative_eq;
use mvg_affine::Affine2d;
use mvg_core::{
    nalgebra::{Matrix2xX, Matrix3, Point2, Rotation3, Vector3},
    Affine2, EssentialMatrix, EstimationError, Kernel, PointSet, Residual, SampsonError,
    SquaredTransferError,
};
use nister_stewenius::FivePoint;
use quickcheck_macros::quickcheck;
use two_view_kernel::TwoViewKernel;

fn some_affine() -> Affine2 {
    Affine2(Matrix3::new(1.1, 0.2, 30.0, -0.1, 0.9, -12.0, 0.0, 0.0, 1.0))
}

/// Ten correspondences of `some_affine`, except for the last one.
fn affine_correspondences() -> (Matrix2xX<f64>, Matrix2xX<f64>) {
    let truth = some_affine();
    let a: Vec<_> = (0..10)
        .map(|i| {
            let i = i as f64;
            Point2::new(10.0 * i + 3.0, (i * 1.3).sin() * 50.0 + 100.0)
        })
        .collect();
    let mut b: Vec<_> = a.iter().map(|p| truth.transform_point(p)).collect();
    b[9].x += 25.0;
    (Matrix2xX::from_points(&a), Matrix2xX::from_points(&b))
}

#[test]
fn fit_and_score() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    assert_eq!(kernel.num_samples(), 10);
    assert_eq!(kernel.minimum_samples(), 3);
    assert_eq!(kernel.max_models(), 1);

    let mut models = vec![];
    kernel.fit(&[0, 4, 7], &mut models).unwrap();
    assert_eq!(models.len(), 1);
    assert_relative_eq!(models[0].0, some_affine().0, epsilon = 1e-9);

    for index in 0..9 {
        assert!(kernel.error(index, &models[0]) < 1e-12);
    }
    assert_relative_eq!(kernel.error(9, &models[0]), 625.0, epsilon = 1e-6);
}

#[test]
fn sample_including_outlier_gives_no_model() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    let mut models = vec![];
    kernel.fit(&[0, 1, 2, 9], &mut models).unwrap();
    assert!(models.is_empty());
}

#[test]
fn solve_on_bound_correspondences() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    assert_eq!(kernel.x1(), &x1);
    assert_eq!(kernel.x2(), &x2);
    assert_eq!(kernel.solver(), &Affine2d::new());

    // The outlier at index 9 spoils the exact fit over all points.
    let mut models = vec![];
    kernel.solve(kernel.x1(), kernel.x2(), &mut models).unwrap();
    assert!(models.is_empty());

    let inliers: Vec<usize> = (0..9).collect();
    let (a, b) = (x1.select(&inliers), x2.select(&inliers));
    kernel.solve(&a, &b, &mut models).unwrap();
    assert_eq!(models.len(), 1);
    let truth = some_affine();
    for &i in &inliers {
        let error = kernel.residual().error(&models[0], &x1.point(i), &x2.point(i));
        assert!(error < 1e-12);
        assert_relative_eq!(error, kernel.error(i, &models[0]));
    }
    assert_relative_eq!(models[0].0, truth.0, epsilon = 1e-9);
}

#[test]
fn mismatched_point_sets() {
    let (x1, x2) = affine_correspondences();
    let x2 = x2.select(&[0, 1, 2]);
    let err = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).err();
    assert_eq!(err, Some(EstimationError::MismatchedPointSets { left: 10, right: 3 }));
}

#[test]
fn contract_violations_are_reported() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    let mut models = vec![];

    let err = kernel.fit(&[0, 1], &mut models).unwrap_err();
    assert_eq!(err, EstimationError::SampleTooSmall { minimum: 3, got: 2 });
    assert!(err.is_contract_violation());

    let err = kernel.fit(&[0, 1, 10], &mut models).unwrap_err();
    assert_eq!(err, EstimationError::IndexOutOfBounds { index: 10, len: 10 });
    assert!(err.is_contract_violation());

    assert!(models.is_empty());
}

#[test]
#[should_panic]
fn error_out_of_bounds_panics() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    kernel.error(10, &some_affine());
}

#[test]
fn duplicate_indices_are_passed_through() {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    let mut models = vec![];
    // Two distinct points cannot pin down an affine map.
    kernel.fit(&[3, 5, 3], &mut models).unwrap();
    assert!(models.is_empty());
}

#[quickcheck]
fn fit_only_appends(existing: u8, start: u8) -> bool {
    let (x1, x2) = affine_correspondences();
    let kernel = TwoViewKernel::new(&x1, &x2, Affine2d::new(), SquaredTransferError).unwrap();
    let sentinels: Vec<_> = (0..existing % 8)
        .map(|i| Affine2(Matrix3::from_diagonal_element(i as f64)))
        .collect();
    let start = start as usize % 7;

    let mut models = sentinels.clone();
    kernel.fit(&[start, start + 1, start + 2], &mut models).unwrap();
    models.len() == sentinels.len() + 1 && models[..sentinels.len()] == sentinels[..]
}

#[test]
fn essential_kernel() {
    let rotation = Rotation3::from_euler_angles(0.1, -0.05, 0.08);
    let translation = Vector3::new(1.0, 0.1, 0.05);
    let points = [
        Vector3::new(-0.3, 0.2, 4.0),
        Vector3::new(0.5, -0.4, 5.5),
        Vector3::new(0.1, 0.7, 3.2),
        Vector3::new(-0.8, -0.6, 6.0),
        Vector3::new(0.9, 0.3, 4.7),
        Vector3::new(0.0, -0.1, 5.0),
        Vector3::new(-0.5, 0.5, 3.6),
    ];
    let a: Vec<_> = points.iter().map(|p| Point2::from(p.xy() / p.z)).collect();
    let b: Vec<_> = points
        .iter()
        .map(|p| rotation * p + translation)
        .map(|p| Point2::from(p.xy() / p.z))
        .collect();
    let (x1, x2) = (Matrix2xX::from_points(&a), Matrix2xX::from_points(&b));
    let kernel = TwoViewKernel::new(&x1, &x2, FivePoint::new(), SampsonError).unwrap();
    assert_eq!(kernel.max_models(), 10);

    let mut models: Vec<EssentialMatrix> = vec![];
    kernel.fit(&[0, 1, 2, 3, 4], &mut models).unwrap();
    assert!(!models.is_empty());
    // Every candidate explains the sample; the true one also explains the other points.
    for model in &models {
        assert!((0..5).all(|i| kernel.error(i, model) < 1e-16));
    }
    assert!(models
        .iter()
        .any(|model| (5..7).all(|i| kernel.error(i, model) < 1e-16)));
}
