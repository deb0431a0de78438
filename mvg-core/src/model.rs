use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This stores an essential matrix, which is satisfied by the following constraint:
///
/// transpose(x') * E * x = 0
///
/// Where `x` and `x'` are homogeneous normalized image coordinates of the same feature in the
/// first and second view. Normalized image coordinates are pixel coordinates from which the
/// camera intrinsics have been removed, so `(x, y, 1.0)` is the bearing of the feature out of
/// the optical center.
///
/// For any point `x` in the first image, `E * x` is the epipolar line in the second image on
/// which the projection of the same 3d point must lie. An essential matrix has rank two and its
/// two non-zero singular values are equal. It is only defined up to scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EssentialMatrix(pub Matrix3<f64>);

impl EssentialMatrix {
    /// Creates the essential matrix `[t]x * R` of the relative pose that maps a point `p`
    /// of the first camera frame to `R * p + t` in the second camera frame.
    ///
    /// ```
    /// use mvg_core::nalgebra::{Point2, Rotation3, Vector3};
    /// use mvg_core::EssentialMatrix;
    /// let rotation = Rotation3::from_euler_angles(0.1, -0.2, 0.05);
    /// let translation = Vector3::new(1.0, 0.1, 0.2);
    /// let essential = EssentialMatrix::from_pose(&rotation, &translation);
    ///
    /// let point = Vector3::new(0.3, -0.2, 4.0);
    /// let moved = rotation * point + translation;
    /// let a = point.xy() / point.z;
    /// let b = moved.xy() / moved.z;
    /// assert!(essential.epipolar_residual(&Point2::from(a), &Point2::from(b)).abs() < 1e-12);
    /// ```
    pub fn from_pose(rotation: &Rotation3<f64>, translation: &Vector3<f64>) -> Self {
        Self(translation.cross_matrix() * rotation.matrix())
    }

    /// The signed algebraic residual `transpose(x') * E * x`.
    pub fn epipolar_residual(&self, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
        epipolar_residual(&self.0, a, b)
    }
}

/// A fundamental matrix relates the pixel coordinates of two uncalibrated views with the same
/// constraint as [`EssentialMatrix`]:
///
/// transpose(x') * F * x = 0
///
/// It has rank two but, unlike an essential matrix, no constraint on its singular values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FundamentalMatrix(pub Matrix3<f64>);

impl FundamentalMatrix {
    /// Finds the closest rank-two matrix in frobenius norm by zeroing the smallest singular value.
    ///
    /// `epsilon` and `max_iterations` control the singular value decomposition. Returns `None`
    /// if it does not converge.
    pub fn enforce_rank2(self, epsilon: f64, max_iterations: usize) -> Option<Self> {
        let mut svd = self.0.try_svd(true, true, epsilon, max_iterations)?;
        // Singular values are sorted, so the last one is the smallest.
        svd.singular_values[2] = 0.0;
        svd.recompose().ok().map(Self)
    }

    /// The signed algebraic residual `transpose(x') * F * x`.
    pub fn epipolar_residual(&self, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
        epipolar_residual(&self.0, a, b)
    }
}

fn epipolar_residual(mat: &Matrix3<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    b.to_homogeneous().dot(&(mat * a.to_homogeneous()))
}

/// A 2d affine transformation with 6 degrees of freedom, stored as the homogeneous matrix
///
/// ```text
///     | a b tx |
/// M = | c d ty |
///     | 0 0 1  |
/// ```
///
/// mapping a point of the first set onto its correspondent: `x' = M * x`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Affine2(pub Matrix3<f64>);

impl Affine2 {
    pub fn transform_point(&self, point: &Point2<f64>) -> Point2<f64> {
        let p = self.0 * point.to_homogeneous();
        Point2::new(p.x, p.y)
    }
}

/// A 3d affine transformation with 12 degrees of freedom, stored as the homogeneous matrix
///
/// ```text
///     | a b c tx |
/// M = | d e f ty |
///     | g h i tz |
///     | 0 0 0 1  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Affine3(pub Matrix4<f64>);

impl Affine3 {
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let p = self.0 * point.to_homogeneous();
        Point3::new(p.x, p.y, p.z)
    }
}
