use crate::{Affine2, Affine3, EssentialMatrix, FeatureMatch, FundamentalMatrix, Residual};
use nalgebra::{Matrix3, Point2, Point3};
use sample_consensus::Model;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Squared transfer distance `|M * x - x'|^2` of an affine model.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SquaredTransferError;

impl Residual<Affine2, Point2<f64>> for SquaredTransferError {
    fn error(&self, model: &Affine2, x1: &Point2<f64>, x2: &Point2<f64>) -> f64 {
        (model.transform_point(x1) - x2).norm_squared()
    }
}

impl Residual<Affine3, Point3<f64>> for SquaredTransferError {
    fn error(&self, model: &Affine3, x1: &Point3<f64>, x2: &Point3<f64>) -> f64 {
        (model.transform_point(x1) - x2).norm_squared()
    }
}

/// Squared algebraic epipolar residual `(transpose(x') * E * x)^2`.
///
/// Cheap, but its value depends on the scale of the model and of the coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AlgebraicError;

/// Squared Sampson distance, the first-order approximation of the geometric reprojection
/// error of a correspondence with respect to an epipolar model.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SampsonError;

/// Sum of the squared distances of each point to the epipolar line induced by the other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SymmetricEpipolarError;

/// The epipolar lines and the algebraic residual of a correspondence.
struct EpipolarTerms {
    residual: f64,
    /// `x^2 + y^2` of `E * x`, the line in the second image.
    line2: f64,
    /// `x^2 + y^2` of `transpose(E) * x'`, the line in the first image.
    line1: f64,
}

impl EpipolarTerms {
    fn new(mat: &Matrix3<f64>, a: &Point2<f64>, b: &Point2<f64>) -> Self {
        let a = a.to_homogeneous();
        let b = b.to_homogeneous();
        let ea = mat * a;
        let etb = mat.tr_mul(&b);
        Self {
            residual: b.dot(&ea),
            line2: ea.x * ea.x + ea.y * ea.y,
            line1: etb.x * etb.x + etb.y * etb.y,
        }
    }
}

impl<M: AsRef<Matrix3<f64>>> Residual<M, Point2<f64>> for AlgebraicError {
    fn error(&self, model: &M, x1: &Point2<f64>, x2: &Point2<f64>) -> f64 {
        let r = EpipolarTerms::new(model.as_ref(), x1, x2).residual;
        r * r
    }
}

impl<M: AsRef<Matrix3<f64>>> Residual<M, Point2<f64>> for SampsonError {
    fn error(&self, model: &M, x1: &Point2<f64>, x2: &Point2<f64>) -> f64 {
        let terms = EpipolarTerms::new(model.as_ref(), x1, x2);
        let denominator = terms.line1 + terms.line2;
        if denominator > 0.0 {
            terms.residual * terms.residual / denominator
        } else {
            // A vanishing gradient means the model carries no epipolar geometry.
            f64::INFINITY
        }
    }
}

impl<M: AsRef<Matrix3<f64>>> Residual<M, Point2<f64>> for SymmetricEpipolarError {
    fn error(&self, model: &M, x1: &Point2<f64>, x2: &Point2<f64>) -> f64 {
        let terms = EpipolarTerms::new(model.as_ref(), x1, x2);
        if terms.line1 > 0.0 && terms.line2 > 0.0 {
            let r2 = terms.residual * terms.residual;
            r2 / terms.line1 + r2 / terms.line2
        } else {
            f64::INFINITY
        }
    }
}

impl Model<FeatureMatch<Point2<f64>>> for EssentialMatrix {
    fn residual(&self, data: &FeatureMatch<Point2<f64>>) -> f64 {
        let FeatureMatch(a, b) = data;
        SampsonError.error(self, a, b)
    }
}

impl Model<FeatureMatch<Point2<f64>>> for FundamentalMatrix {
    fn residual(&self, data: &FeatureMatch<Point2<f64>>) -> f64 {
        let FeatureMatch(a, b) = data;
        SampsonError.error(self, a, b)
    }
}

impl Model<FeatureMatch<Point2<f64>>> for Affine2 {
    fn residual(&self, data: &FeatureMatch<Point2<f64>>) -> f64 {
        let FeatureMatch(a, b) = data;
        SquaredTransferError.error(self, a, b)
    }
}

impl Model<FeatureMatch<Point3<f64>>> for Affine3 {
    fn residual(&self, data: &FeatureMatch<Point3<f64>>) -> f64 {
        let FeatureMatch(a, b) = data;
        SquaredTransferError.error(self, a, b)
    }
}
