//! Five-point relative pose solver for calibrated cameras.
//!
//! Implements the algorithm from "Recent developments on direct relative orientation"
//! by H. Stewenius, C. Engels and D. Nister [1], which reformulates the original five-point
//! algorithm of D. Nister [2] with a Groebner basis so that the solutions are the real
//! eigenvalues of a 10x10 action matrix.
//!
//! Given five correspondences of normalized image coordinates, there are at most ten
//! essential matrices satisfying the epipolar constraint of every correspondence, the
//! determinant constraint `det(E) = 0` and the trace constraint
//! `2 * E * transpose(E) * E - trace(E * transpose(E)) * E = 0`.
//!
//! [1]: https://doi.org/10.1016/j.isprsjprs.2006.03.005
//! [2]: https://doi.org/10.1109/TPAMI.2004.17

use arrayvec::ArrayVec;
use log::{debug, trace};
use mvg_core::{
    check_correspondences,
    nalgebra::{
        dimension::{U10, U20, U4, U9},
        DMatrix, Matrix2, Matrix2xX, Matrix3, OMatrix, OVector, Point2, Vector4,
    },
    sample_consensus::Estimator,
    EssentialMatrix, EstimationError, FeatureMatch, PointSet, Solver,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use basis::*;

/// Positions of the monomials in the coefficient vectors of the polynomial constraints.
///
/// The ten cubic monomials come first, so that Gauss-Jordan elimination of the leading block
/// expresses each of them in terms of the ten monomials of degree at most two.
mod basis {
    pub const BASIS_XXX: usize = 0;
    pub const BASIS_XXY: usize = 1;
    pub const BASIS_XYY: usize = 2;
    pub const BASIS_YYY: usize = 3;
    pub const BASIS_XXZ: usize = 4;
    pub const BASIS_XYZ: usize = 5;
    pub const BASIS_YYZ: usize = 6;
    pub const BASIS_XZZ: usize = 7;
    pub const BASIS_YZZ: usize = 8;
    pub const BASIS_ZZZ: usize = 9;
    pub const BASIS_XX: usize = 10;
    pub const BASIS_XY: usize = 11;
    pub const BASIS_YY: usize = 12;
    pub const BASIS_XZ: usize = 13;
    pub const BASIS_YZ: usize = 14;
    pub const BASIS_ZZ: usize = 15;
    pub const BASIS_X: usize = 16;
    pub const BASIS_Y: usize = 17;
    pub const BASIS_Z: usize = 18;
    pub const BASIS_1: usize = 19;
}

/// The smallest ratio of the fifth singular value to the largest one of the epipolar
/// constraint matrix for the sample to be considered non-degenerate.
const NULLITY_THRESHOLD: f64 = 1e-10;

/// Relative to the squared magnitude of a 2x2 Schur block.
const DISCRIMINANT_TOLERANCE: f64 = 1e-12;

type PolyBasisVec = OVector<f64, U20>;
type Square10 = OMatrix<f64, U10, U10>;

/// Four vectors spanning the nullspace of the epipolar constraints, one per column.
///
/// Row `3 * i + j` of every column holds the entry `(i, j)` of a 3x3 matrix.
pub type NullspaceBasis = OMatrix<f64, U9, U4>;

/// The ten cubic polynomial constraints on the coefficients `(x, y, z)` of
/// `E = x * X + y * Y + z * Z + W`, where `X`, `Y`, `Z`, `W` are the nullspace basis.
///
/// Row 0 is the determinant constraint; rows 1 to 9 are the entries of the trace constraint.
/// Columns are indexed by the monomials `xxx xxy xyy yyy xxz xyz yyz xzz yzz zzz xx xy yy xz
/// yz zz x y z 1`.
pub type PolynomialConstraints = OMatrix<f64, U10, U20>;

/// Implements the 5-point algorithm from the paper "Recent developments on direct relative orientation".
///
/// Consumes normalized image coordinates (pixel coordinates with the intrinsics removed) and
/// produces up to ten essential matrices with unit frobenius norm. More than five
/// correspondences are accepted, in which case the nullspace is the least-squares one.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FivePoint {
    /// Convergence threshold of the singular value and Schur decompositions.
    pub epsilon: f64,
    /// Maximum number of iterations of the singular value and Schur decompositions.
    pub iterations: usize,
}

impl FivePoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [`FivePoint::epsilon`].
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Sets the [`FivePoint::iterations`].
    #[must_use]
    pub fn iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    /// Computes the four-dimensional nullspace of the epipolar constraints `transpose(b) * E * a = 0`.
    ///
    /// Returns `None` if the correspondences do not constrain five degrees of freedom, for
    /// instance when all points lie on a line in space.
    pub fn nullspace_basis(&self, a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> Option<NullspaceBasis> {
        let epipolar_constraint = encode_epipolar_equation(a, b);
        // Only thin factors are computed, so the matrix has at least 9 rows to get all of V.
        let svd = epipolar_constraint.try_svd(false, true, self.epsilon, self.iterations)?;
        let v_t = svd.v_t?;
        let singular = &svd.singular_values;
        if !(singular[4] > NULLITY_THRESHOLD * singular[0]) {
            trace!(
                "epipolar constraints have rank below five (singular values {})",
                singular.transpose()
            );
            return None;
        }
        let mut nullspace = NullspaceBasis::zeros();
        for (row, mut column) in (5..9).zip(nullspace.column_iter_mut()) {
            column.copy_from(&v_t.row(row).transpose());
        }
        Some(nullspace)
    }

    /// Finds all essential matrices explaining the correspondences `a[i] <-> b[i]`.
    pub fn from_correspondences(&self, a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> Vec<EssentialMatrix> {
        if a.ncols() != b.ncols() || a.ncols() < 5 {
            return vec![];
        }

        // Step 1: Nullspace Extraction.
        let e_basis = match self.nullspace_basis(a, b) {
            Some(e_basis) => e_basis,
            None => return vec![],
        };

        // Step 2: Constraint Expansion.
        let e_constraints = five_points_polynomial_constraints(&e_basis);

        // Step 3: Gauss-Jordan Elimination (done thanks to a LU decomposition).
        let c_lu = e_constraints.fixed_slice::<10, 10>(0, 0).full_piv_lu();
        let m = match c_lu.solve(&e_constraints.fixed_slice::<10, 10>(0, 10).into_owned()) {
            Some(m) => m,
            None => {
                trace!("cubic monomial block of the constraints is singular");
                return vec![];
            }
        };

        // Step 4: the action matrix of multiplication by z on the monomials
        // `xx xy yy xz yz zz x y z 1`. Its eigenvectors are these monomials evaluated at a
        // solution and its eigenvalues are the z of the solutions.
        let mut at = Square10::zeros();
        for (row, cubic) in [BASIS_XXZ, BASIS_XYZ, BASIS_YYZ, BASIS_XZZ, BASIS_YZZ, BASIS_ZZZ]
            .into_iter()
            .enumerate()
        {
            at.row_mut(row).copy_from(&-m.row(cubic));
        }
        at[(6, BASIS_XZ - 10)] = 1.0;
        at[(7, BASIS_YZ - 10)] = 1.0;
        at[(8, BASIS_ZZ - 10)] = 1.0;
        at[(9, BASIS_Z - 10)] = 1.0;

        let essentials = self.essentials_from_action_ebasis(at, &e_basis);
        debug!("five-point solver found {} essential matrices", essentials.len());
        essentials
    }

    /// Recovers one essential matrix per real eigenvalue of the action matrix.
    fn essentials_from_action_ebasis(&self, at: Square10, eb: &NullspaceBasis) -> Vec<EssentialMatrix> {
        let roots = match self.real_eigenvalues(at) {
            Some(roots) => roots,
            None => {
                trace!("schur decomposition of the action matrix did not converge");
                return vec![];
            }
        };
        roots
            .into_iter()
            .filter_map(|z| self.compute_eigenvector(&at, z))
            .filter_map(|v| {
                let w = v[BASIS_1 - 10];
                if w.abs() < self.epsilon {
                    return None;
                }
                let coefficients = Vector4::new(
                    v[BASIS_X - 10] / w,
                    v[BASIS_Y - 10] / w,
                    v[BASIS_Z - 10] / w,
                    1.0,
                );
                let e = Matrix3::from_row_slice((eb * coefficients).as_slice());
                let norm = e.norm();
                (norm > 0.0).then(|| EssentialMatrix(e / norm))
            })
            .collect()
    }

    /// The real eigenvalues of `at`, read off the diagonal blocks of its real Schur form.
    fn real_eigenvalues(&self, at: Square10) -> Option<ArrayVec<f64, 10>> {
        let (_, t) = at.try_schur(self.epsilon, self.iterations)?.unpack();
        let mut roots = ArrayVec::new();
        let mut i = 0;
        while i < 10 {
            if i == 9 || t[(i + 1, i)] == 0.0 {
                roots.push(t[(i, i)]);
                i += 1;
            } else {
                let block = t.fixed_slice::<2, 2>(i, i).into_owned();
                if let Some((high, low)) = block_real_eigenvalues(&block) {
                    roots.push(high);
                    roots.push(low);
                }
                i += 2;
            }
        }
        Some(roots)
    }

    /// The unit vector spanning the (numerical) nullspace of `m - lambda * I`.
    fn compute_eigenvector(&self, m: &Square10, lambda: f64) -> Option<OVector<f64, U10>> {
        let svd = (m - Square10::from_diagonal_element(lambda)).try_svd(
            false,
            true,
            self.epsilon,
            self.iterations,
        )?;
        // Singular values are sorted, so the last right singular vector is the closest to
        // the nullspace.
        Some(svd.v_t?.row(9).transpose())
    }
}

impl Default for FivePoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

/// Encodes `transpose(b) * E * a = 0` as one row per correspondence, zero-padded to 9 rows.
fn encode_epipolar_equation(a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(a.ncols().max(9), 9);
    for i in 0..a.ncols() {
        let ap = a.point(i).to_homogeneous();
        let bp = b.point(i).to_homogeneous();
        for r in 0..3 {
            for c in 0..3 {
                out[(i, 3 * r + c)] = bp[r] * ap[c];
            }
        }
    }
    out
}

/// Computes the nullspace of the epipolar constraints with the default [`FivePoint`] settings.
pub fn five_points_nullspace_basis(a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> Option<NullspaceBasis> {
    FivePoint::default().nullspace_basis(a, b)
}

/// Both eigenvalues of a 2x2 Schur block, or `None` for a complex conjugate pair.
///
/// A discriminant that is negative only by rounding is a double root.
fn block_real_eigenvalues(block: &Matrix2<f64>) -> Option<(f64, f64)> {
    let half_difference = 0.5 * (block[(0, 0)] - block[(1, 1)]);
    let discriminant = block[(1, 0)] * block[(0, 1)] + half_difference * half_difference;
    let scale = block.amax();
    if discriminant < -DISCRIMINANT_TOLERANCE * scale * scale {
        return None;
    }
    let half_trace = 0.5 * (block[(0, 0)] + block[(1, 1)]);
    let root = discriminant.max(0.0).sqrt();
    Some((half_trace + root, half_trace - root))
}

/// Products of the linear factors `a` and `b` of the essential matrix entries, in the degree-2
/// monomials of the basis.
fn o1(a: Vector4<f64>, b: Vector4<f64>) -> PolyBasisVec {
    let mut res = PolyBasisVec::zeros();
    res[BASIS_XX] = a.x * b.x;
    res[BASIS_XY] = a.x * b.y + a.y * b.x;
    res[BASIS_XZ] = a.x * b.z + a.z * b.x;
    res[BASIS_YY] = a.y * b.y;
    res[BASIS_YZ] = a.y * b.z + a.z * b.y;
    res[BASIS_ZZ] = a.z * b.z;
    res[BASIS_X] = a.x * b.w + a.w * b.x;
    res[BASIS_Y] = a.y * b.w + a.w * b.y;
    res[BASIS_Z] = a.z * b.w + a.w * b.z;
    res[BASIS_1] = a.w * b.w;
    res
}

/// Multiplies the degree-2 polynomial `a` by the linear factor `b`, giving degree-3 terms.
fn o2(a: PolyBasisVec, b: Vector4<f64>) -> PolyBasisVec {
    let mut res = PolyBasisVec::zeros();
    res[BASIS_XXX] = a[BASIS_XX] * b.x;
    res[BASIS_XXY] = a[BASIS_XX] * b.y + a[BASIS_XY] * b.x;
    res[BASIS_XXZ] = a[BASIS_XX] * b.z + a[BASIS_XZ] * b.x;
    res[BASIS_XYY] = a[BASIS_XY] * b.y + a[BASIS_YY] * b.x;
    res[BASIS_XYZ] = a[BASIS_XY] * b.z + a[BASIS_YZ] * b.x + a[BASIS_XZ] * b.y;
    res[BASIS_XZZ] = a[BASIS_XZ] * b.z + a[BASIS_ZZ] * b.x;
    res[BASIS_YYY] = a[BASIS_YY] * b.y;
    res[BASIS_YYZ] = a[BASIS_YY] * b.z + a[BASIS_YZ] * b.y;
    res[BASIS_YZZ] = a[BASIS_YZ] * b.z + a[BASIS_ZZ] * b.y;
    res[BASIS_ZZZ] = a[BASIS_ZZ] * b.z;
    res[BASIS_XX] = a[BASIS_XX] * b.w + a[BASIS_X] * b.x;
    res[BASIS_XY] = a[BASIS_XY] * b.w + a[BASIS_X] * b.y + a[BASIS_Y] * b.x;
    res[BASIS_XZ] = a[BASIS_XZ] * b.w + a[BASIS_X] * b.z + a[BASIS_Z] * b.x;
    res[BASIS_YY] = a[BASIS_YY] * b.w + a[BASIS_Y] * b.y;
    res[BASIS_YZ] = a[BASIS_YZ] * b.w + a[BASIS_Y] * b.z + a[BASIS_Z] * b.y;
    res[BASIS_ZZ] = a[BASIS_ZZ] * b.w + a[BASIS_Z] * b.z;
    res[BASIS_X] = a[BASIS_X] * b.w + a[BASIS_1] * b.x;
    res[BASIS_Y] = a[BASIS_Y] * b.w + a[BASIS_1] * b.y;
    res[BASIS_Z] = a[BASIS_Z] * b.w + a[BASIS_1] * b.z;
    res[BASIS_1] = a[BASIS_1] * b.w;
    res
}

/// Expands the determinant and trace constraints of `E = x * X + y * Y + z * Z + W` into
/// polynomials in `x`, `y` and `z`.
pub fn five_points_polynomial_constraints(nullspace: &NullspaceBasis) -> PolynomialConstraints {
    // Build the polynomial form of E (equation (8) in Stewenius et al. [1])
    let mut e_poly = [[Vector4::zeros(); 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let x = nullspace[(3 * i + j, 0)];
            let y = nullspace[(3 * i + j, 1)];
            let z = nullspace[(3 * i + j, 2)];
            let w = nullspace[(3 * i + j, 3)];
            e_poly[i][j] = Vector4::new(x, y, z, w);
        }
    }

    // The constraint matrix.
    let mut m = PolynomialConstraints::zeros();
    // Determinant constraint det(E) = 0; equation (19) of Nister [2].
    m.row_mut(0).copy_from(
        &(o2(
            o1(e_poly[0][1], e_poly[1][2]) - o1(e_poly[0][2], e_poly[1][1]),
            e_poly[2][0],
        ) + o2(
            o1(e_poly[0][2], e_poly[1][0]) - o1(e_poly[0][0], e_poly[1][2]),
            e_poly[2][1],
        ) + o2(
            o1(e_poly[0][0], e_poly[1][1]) - o1(e_poly[0][1], e_poly[1][0]),
            e_poly[2][2],
        ))
        .transpose(),
    );

    // Cubic singular values constraint.
    // Equation (20).
    let mut eet = [[PolyBasisVec::zeros(); 3]; 3];
    for i in 0..3 {
        // EET is symmetric, so only its upper triangular part is computed.
        for j in 0..3 {
            if i <= j {
                eet[i][j] = o1(e_poly[i][0], e_poly[j][0])
                    + o1(e_poly[i][1], e_poly[j][1])
                    + o1(e_poly[i][2], e_poly[j][2]);
            } else {
                eet[i][j] = eet[j][i];
            }
        }
    }

    // Equation (21).
    let mut l = eet;
    let trace = 0.5 * (eet[0][0] + eet[1][1] + eet[2][2]);
    #[allow(clippy::needless_range_loop)]
    for i in 0..3 {
        l[i][i] -= trace;
    }

    // Equation (23).
    #[allow(clippy::needless_range_loop)]
    for i in 0..3 {
        for j in 0..3 {
            let leij =
                o2(l[i][0], e_poly[0][j]) + o2(l[i][1], e_poly[1][j]) + o2(l[i][2], e_poly[2][j]);
            m.row_mut(1 + i * 3 + j).copy_from(&leij.transpose());
        }
    }

    m
}

impl Solver for FivePoint {
    type Points = Matrix2xX<f64>;
    type Model = EssentialMatrix;
    const MINIMUM_SAMPLES: usize = 5;
    const MAX_MODELS: usize = 10;

    fn solve(
        &self,
        x1: &Matrix2xX<f64>,
        x2: &Matrix2xX<f64>,
        models: &mut Vec<EssentialMatrix>,
    ) -> Result<(), EstimationError> {
        check_correspondences(x1.num_points(), x2.num_points(), Self::MINIMUM_SAMPLES)?;
        models.extend(self.from_correspondences(x1, x2));
        Ok(())
    }
}

impl Estimator<FeatureMatch<Point2<f64>>> for FivePoint {
    type Model = EssentialMatrix;
    type ModelIter = ArrayVec<EssentialMatrix, 10>;
    const MIN_SAMPLES: usize = 5;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch<Point2<f64>>> + Clone,
    {
        let (a, b): (Vec<_>, Vec<_>) = data.map(|FeatureMatch(a, b)| (a, b)).unzip();
        self.from_correspondences(&Matrix2xX::from_points(&a), &Matrix2xX::from_points(&b))
            .into_iter()
            .take(10)
            .collect()
    }
}
