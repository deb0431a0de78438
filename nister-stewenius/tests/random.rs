use mvg_core::{
    nalgebra::{Matrix2xX, Point2, Rotation3, Vector3},
    EssentialMatrix, PointSet, Solver,
};
use nister_stewenius::FivePoint;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

const ROUNDS: usize = 200;
const EPSILON_APPROX: f64 = 1e-6;

const ROT_MAGNITUDE: f64 = 0.2;
const POINT_BOX_SIZE: f64 = 2.0;
const POINT_DISTANCE: f64 = 3.0;

#[test]
fn randomized() {
    let mut rng = Pcg64::seed_from_u64(0);
    let successes = (0..ROUNDS).filter(|_| run_round(&mut rng)).count();
    eprintln!("successes: {}", successes);
    assert!(successes * 10 >= ROUNDS * 9);
}

fn run_round(rng: &mut Pcg64) -> bool {
    let (truth, a, b) = some_test_data(rng);
    let mut models = vec![];
    if FivePoint::new().solve(&a, &b, &mut models).is_err() {
        return false;
    }
    models
        .iter()
        .any(|model| (model.0 - truth.0).norm().min((model.0 + truth.0).norm()) < EPSILON_APPROX)
}

fn random_vector(rng: &mut Pcg64) -> Vector3<f64> {
    Vector3::new(rng.gen(), rng.gen(), rng.gen())
}

/// Gets the normalized ground truth essential matrix and the two views of five random points.
fn some_test_data(rng: &mut Pcg64) -> (EssentialMatrix, Matrix2xX<f64>, Matrix2xX<f64>) {
    let axis_angle = (random_vector(rng) * 2.0 - Vector3::repeat(1.0)) * ROT_MAGNITUDE;
    let rotation = Rotation3::new(axis_angle * std::f64::consts::PI);
    let translation = (random_vector(rng) - Vector3::repeat(0.5)).normalize();

    let points: Vec<_> = (0..5)
        .map(|_| {
            let mut p = random_vector(rng) * POINT_BOX_SIZE;
            p.x -= 0.5 * POINT_BOX_SIZE;
            p.y -= 0.5 * POINT_BOX_SIZE;
            p.z += POINT_DISTANCE;
            p
        })
        .collect();

    let a: Vec<_> = points.iter().map(|p| Point2::from(p.xy() / p.z)).collect();
    let b: Vec<_> = points
        .iter()
        .map(|p| rotation * p + translation)
        .map(|p| Point2::from(p.xy() / p.z))
        .collect();

    let truth = EssentialMatrix::from_pose(&rotation, &translation);
    (
        EssentialMatrix(truth.0 / truth.0.norm()),
        Matrix2xX::from_points(&a),
        Matrix2xX::from_points(&b),
    )
}
