//! Linear estimation of affine transformations from point correspondences.
//!
//! Given correspondences `x1[i] <-> x2[i]`, the solvers find the affine map `M` such that
//! `x2 = M * x1` for every correspondence. In 2d `M` has six degrees of freedom:
//!
//! ```text
//!     | a b tx |
//! M = | c d ty |
//!     | 0 0 1  |
//! ```
//!
//! and in 3d it has twelve. Each correspondence contributes one linear equation per coordinate,
//! so three non-collinear points are needed in 2d and four non-coplanar points in 3d. With more
//! correspondences the system is solved in the least-squares sense, but the solution is only
//! accepted when it explains every correspondence up to [`Affine2d::expected_precision`].
//! This makes the solvers suitable to verify that a set of correspondences is (almost) exactly
//! affine rather than to fit a noisy affine model.

use arrayvec::ArrayVec;
use log::trace;
use mvg_core::{
    check_correspondences,
    nalgebra::{
        allocator::Allocator, DMatrix, DVector, DefaultAllocator, DimName, Dynamic, Matrix2xX,
        Matrix3, Matrix3xX, Matrix4, OMatrix, Point2, Point3, U1,
    },
    sample_consensus::Estimator,
    Affine2, Affine3, EstimationError, FeatureMatch, PointSet, Solver,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Default relative precision a least-squares solution must reach to be accepted.
///
/// This is the precision below which two doubles are considered approximately equal.
pub const DEFAULT_EXPECTED_PRECISION: f64 = 1e-12;

/// Default threshold on the ratio of the smallest to the largest singular value of the linear
/// system below which the correspondences are considered degenerate.
pub const DEFAULT_RANK_EPSILON: f64 = 1e-10;

macro_rules! affine_solver {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Debug, PartialEq)]
        #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
        #[non_exhaustive]
        pub struct $name {
            /// The relative residual `|A * p - b| / min(|A * p|, |b|)` a solution may have.
            pub expected_precision: f64,
            /// Systems whose condition is worse than the inverse of this are rejected.
            pub rank_epsilon: f64,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Sets the [`Self::expected_precision`].
            #[must_use]
            pub fn expected_precision(self, expected_precision: f64) -> Self {
                Self {
                    expected_precision,
                    ..self
                }
            }

            /// Sets the [`Self::rank_epsilon`].
            #[must_use]
            pub fn rank_epsilon(self, rank_epsilon: f64) -> Self {
                Self {
                    rank_epsilon,
                    ..self
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    expected_precision: DEFAULT_EXPECTED_PRECISION,
                    rank_epsilon: DEFAULT_RANK_EPSILON,
                }
            }
        }
    };
}

affine_solver!(
    Affine2d,
    "Estimates a 2d affine map from at least three non-collinear correspondences."
);
affine_solver!(
    Affine3d,
    "Estimates a 3d affine map from at least four non-coplanar correspondences."
);

impl Affine2d {
    /// Estimates the affine map taking the columns of `x1` onto the columns of `x2`.
    ///
    /// Returns `None` if the point sets differ in length, the points are collinear, or no
    /// affine map explains all correspondences to the configured precision.
    pub fn from_correspondences(&self, x1: &Matrix2xX<f64>, x2: &Matrix2xX<f64>) -> Option<Affine2> {
        let p = linear_parameters(x1, x2, self.expected_precision, self.rank_epsilon)?;
        Some(Affine2(Matrix3::new(
            p[0], p[1], p[2], //
            p[3], p[4], p[5], //
            0.0, 0.0, 1.0,
        )))
    }
}

impl Affine3d {
    /// Estimates the affine map taking the columns of `x1` onto the columns of `x2`.
    ///
    /// Returns `None` if the point sets differ in length, the points are coplanar, or no
    /// affine map explains all correspondences to the configured precision.
    pub fn from_correspondences(&self, x1: &Matrix3xX<f64>, x2: &Matrix3xX<f64>) -> Option<Affine3> {
        let p = linear_parameters(x1, x2, self.expected_precision, self.rank_epsilon)?;
        Some(Affine3(Matrix4::new(
            p[0], p[1], p[2], p[3], //
            p[4], p[5], p[6], p[7], //
            p[8], p[9], p[10], p[11], //
            0.0, 0.0, 0.0, 1.0,
        )))
    }
}

const SVD_EPSILON: f64 = 1e-12;
const SVD_MAX_ITERATIONS: usize = 1000;

/// Solves for the row-major parameters of the top `D x (D + 1)` block of the affine map.
fn linear_parameters<D>(
    x1: &OMatrix<f64, D, Dynamic>,
    x2: &OMatrix<f64, D, Dynamic>,
    expected_precision: f64,
    rank_epsilon: f64,
) -> Option<DVector<f64>>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D, Dynamic>,
{
    let dim = D::dim();
    let stride = dim + 1;
    let n = x1.ncols();
    if n != x2.ncols() || n < stride {
        trace!("affine solver got {} and {} correspondences", n, x2.ncols());
        return None;
    }

    // Row `dim * i + r` states `sum_c M[r][c] * x1[c][i] + M[r][dim] = x2[r][i]`.
    let mut a = DMatrix::<f64>::zeros(dim * n, dim * stride);
    let mut b = DVector::<f64>::zeros(dim * n);
    for i in 0..n {
        for r in 0..dim {
            let row = dim * i + r;
            for c in 0..dim {
                a[(row, stride * r + c)] = x1[(c, i)];
            }
            a[(row, stride * r + dim)] = 1.0;
            b[row] = x2[(r, i)];
        }
    }

    let singular_values = a
        .clone()
        .try_svd(false, false, SVD_EPSILON, SVD_MAX_ITERATIONS)?
        .singular_values;
    let largest = singular_values.max();
    let smallest = singular_values.min();
    if !(smallest > rank_epsilon * largest) {
        trace!(
            "affine system is rank deficient (singular values {} and {})",
            smallest,
            largest
        );
        return None;
    }
    // Full column rank here, so `R` is square and invertible.
    let qr = a.clone().qr();
    let r: DMatrix<f64> = qr.r();
    let q: DMatrix<f64> = qr.q();
    let p: DVector<f64> = r.solve_upper_triangular::<Dynamic, U1, _>(&(q.transpose() * &b))?;

    let fitted = &a * &p;
    let tolerance = expected_precision * expected_precision * fitted.norm_squared().min(b.norm_squared());
    if (&fitted - &b).norm_squared() > tolerance {
        trace!(
            "affine solution residual {} exceeds the expected precision",
            (&fitted - &b).norm()
        );
        return None;
    }
    Some(p)
}

/// Estimates the 2d affine map `M` with `x2 = M * x1` using [`DEFAULT_EXPECTED_PRECISION`].
///
/// Needs at least three non-collinear correspondences.
///
/// ```
/// use mvg_affine::affine2d_from_correspondences_linear;
/// use mvg_core::nalgebra::{Matrix2xX, Point2};
/// use mvg_core::PointSet;
///
/// let x1 = Matrix2xX::from_points(&[
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.0, 1.0),
/// ]);
/// let x2 = Matrix2xX::from_points(&[
///     Point2::new(5.0, 7.0),
///     Point2::new(7.0, 7.0),
///     Point2::new(5.0, 10.0),
/// ]);
/// let m = affine2d_from_correspondences_linear(&x1, &x2).unwrap();
/// assert!((m[(0, 0)] - 2.0).abs() < 1e-12);
/// assert!((m[(1, 1)] - 3.0).abs() < 1e-12);
/// assert!((m[(0, 2)] - 5.0).abs() < 1e-12);
/// assert!((m[(1, 2)] - 7.0).abs() < 1e-12);
/// ```
pub fn affine2d_from_correspondences_linear(
    x1: &Matrix2xX<f64>,
    x2: &Matrix2xX<f64>,
) -> Option<Affine2> {
    Affine2d::new().from_correspondences(x1, x2)
}

/// Estimates the 3d affine map `M` with `x2 = M * x1` using [`DEFAULT_EXPECTED_PRECISION`].
///
/// Needs at least four non-coplanar correspondences.
pub fn affine3d_from_correspondences_linear(
    x1: &Matrix3xX<f64>,
    x2: &Matrix3xX<f64>,
) -> Option<Affine3> {
    Affine3d::new().from_correspondences(x1, x2)
}

impl Solver for Affine2d {
    type Points = Matrix2xX<f64>;
    type Model = Affine2;
    const MINIMUM_SAMPLES: usize = 3;
    const MAX_MODELS: usize = 1;

    fn solve(
        &self,
        x1: &Matrix2xX<f64>,
        x2: &Matrix2xX<f64>,
        models: &mut Vec<Affine2>,
    ) -> Result<(), EstimationError> {
        check_correspondences(x1.num_points(), x2.num_points(), Self::MINIMUM_SAMPLES)?;
        models.extend(self.from_correspondences(x1, x2));
        Ok(())
    }
}

impl Solver for Affine3d {
    type Points = Matrix3xX<f64>;
    type Model = Affine3;
    const MINIMUM_SAMPLES: usize = 4;
    const MAX_MODELS: usize = 1;

    fn solve(
        &self,
        x1: &Matrix3xX<f64>,
        x2: &Matrix3xX<f64>,
        models: &mut Vec<Affine3>,
    ) -> Result<(), EstimationError> {
        check_correspondences(x1.num_points(), x2.num_points(), Self::MINIMUM_SAMPLES)?;
        models.extend(self.from_correspondences(x1, x2));
        Ok(())
    }
}

impl Estimator<FeatureMatch<Point2<f64>>> for Affine2d {
    type Model = Affine2;
    type ModelIter = ArrayVec<Affine2, 1>;
    const MIN_SAMPLES: usize = 3;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch<Point2<f64>>> + Clone,
    {
        let (a, b): (Vec<_>, Vec<_>) = data.map(|FeatureMatch(a, b)| (a, b)).unzip();
        let x1 = Matrix2xX::from_points(&a);
        let x2 = Matrix2xX::from_points(&b);
        self.from_correspondences(&x1, &x2).into_iter().collect()
    }
}

impl Estimator<FeatureMatch<Point3<f64>>> for Affine3d {
    type Model = Affine3;
    type ModelIter = ArrayVec<Affine3, 1>;
    const MIN_SAMPLES: usize = 4;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch<Point3<f64>>> + Clone,
    {
        let (a, b): (Vec<_>, Vec<_>) = data.map(|FeatureMatch(a, b)| (a, b)).unzip();
        let x1 = Matrix3xX::from_points(&a);
        let x2 = Matrix3xX::from_points(&b);
        self.from_correspondences(&x1, &x2).into_iter().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn too_few_points_is_not_solvable() {
        let x1 = Matrix2xX::from_points(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert_eq!(affine2d_from_correspondences_linear(&x1, &x1), None);
    }

    #[test]
    fn solver_reports_small_samples() {
        let x1 = Matrix2xX::from_points(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        let mut models = vec![];
        assert_eq!(
            Affine2d::new().solve(&x1, &x1, &mut models),
            Err(EstimationError::SampleTooSmall { minimum: 3, got: 2 })
        );
        assert!(models.is_empty());
    }

    #[test]
    fn builder_sets_fields() {
        let solver = Affine3d::new().expected_precision(1e-6).rank_epsilon(1e-8);
        assert_eq!(solver.expected_precision, 1e-6);
        assert_eq!(solver.rank_epsilon, 1e-8);
    }
}
