use arrayvec::ArrayVec;
use log::trace;
use mvg_core::{
    check_correspondences,
    nalgebra::{Matrix2xX, Matrix3, OMatrix, OVector, Point2, U9},
    sample_consensus::Estimator,
    EstimationError, FeatureMatch, FundamentalMatrix, PointSet, Solver,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Accumulates `transpose(A) * A`, where row `i` of `A` encodes `transpose(b_i) * F * a_i = 0`
/// with the entries of `F` in row-major order.
fn encode_epipolar_equation(a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> OMatrix<f64, U9, U9> {
    let mut ata = OMatrix::<f64, U9, U9>::zeros();
    for i in 0..a.num_points() {
        let ap = a.point(i).to_homogeneous();
        let bp = b.point(i).to_homogeneous();
        let mut row = OVector::<f64, U9>::zeros();
        for r in 0..3 {
            row.fixed_rows_mut::<3>(3 * r).copy_from(&(bp[r] * ap));
        }
        ata += row * row.transpose();
    }
    ata
}

/// Performs the
/// [eight-point algorithm](https://en.wikipedia.org/wiki/Eight-point_algorithm)
/// by Richard Hartley and Andrew Zisserman.
///
/// The linear estimate is projected onto the closest rank-two matrix, see
/// [`FundamentalMatrix::enforce_rank2`]. On pixel coordinates the linear system is badly
/// conditioned; wrap the solver so that both point sets are normalized first to get the
/// normalized eight-point algorithm.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EightPoint {
    pub epsilon: f64,
    pub iterations: usize,
}

impl EightPoint {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the [`EightPoint::epsilon`].
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Sets the [`EightPoint::iterations`].
    #[must_use]
    pub fn iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    /// Estimates the matrix `F` with `transpose(b[i]) * F * a[i] = 0` for every correspondence.
    ///
    /// Returns `None` if fewer than eight correspondences are given or a decomposition does
    /// not converge.
    pub fn from_correspondences(
        &self,
        a: &Matrix2xX<f64>,
        b: &Matrix2xX<f64>,
    ) -> Option<FundamentalMatrix> {
        if a.ncols() != b.ncols() || a.ncols() < 8 {
            return None;
        }
        let eet = encode_epipolar_equation(a, b);
        let eigens = eet.try_symmetric_eigen(self.epsilon, self.iterations)?;
        let eigenvector = eigens
            .eigenvalues
            .iter()
            .enumerate()
            .min_by_key(|&(_, &n)| float_ord::FloatOrd(n))
            .map(|(ix, _)| eigens.eigenvectors.column(ix).into_owned())?;
        let mat = Matrix3::from_row_slice(eigenvector.as_slice());
        let fundamental = FundamentalMatrix(mat).enforce_rank2(self.epsilon, self.iterations);
        if fundamental.is_none() {
            trace!("rank two enforcement did not converge");
        }
        fundamental
    }
}

impl Default for EightPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl Solver for EightPoint {
    type Points = Matrix2xX<f64>;
    type Model = FundamentalMatrix;
    const MINIMUM_SAMPLES: usize = 8;
    const MAX_MODELS: usize = 1;

    fn solve(
        &self,
        x1: &Matrix2xX<f64>,
        x2: &Matrix2xX<f64>,
        models: &mut Vec<FundamentalMatrix>,
    ) -> Result<(), EstimationError> {
        check_correspondences(x1.num_points(), x2.num_points(), Self::MINIMUM_SAMPLES)?;
        models.extend(self.from_correspondences(x1, x2));
        Ok(())
    }
}

impl Estimator<FeatureMatch<Point2<f64>>> for EightPoint {
    type Model = FundamentalMatrix;
    type ModelIter = ArrayVec<FundamentalMatrix, 1>;
    const MIN_SAMPLES: usize = 8;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch<Point2<f64>>> + Clone,
    {
        let (a, b): (Vec<_>, Vec<_>) = data.map(|FeatureMatch(a, b)| (a, b)).unzip();
        self.from_correspondences(&Matrix2xX::from_points(&a), &Matrix2xX::from_points(&b))
            .into_iter()
            .collect()
    }
}
