use crate::{Affine2, Affine3, EssentialMatrix, FundamentalMatrix, Unnormalizer};
use nalgebra::{Matrix3, Matrix4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Un-normalizes affine models by composition: `M = inverse(T2) * M' * T1`.
///
/// If `M'` maps `T1 * x` onto `T2 * x'`, then `M` maps `x` onto `x'`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AffineUnnormalizer;

impl Unnormalizer<Affine2, Matrix3<f64>> for AffineUnnormalizer {
    fn unnormalize(&self, model: &Affine2, t1: &Matrix3<f64>, t2: &Matrix3<f64>) -> Option<Affine2> {
        Some(Affine2(t2.try_inverse()? * model.0 * t1))
    }
}

impl Unnormalizer<Affine3, Matrix4<f64>> for AffineUnnormalizer {
    fn unnormalize(&self, model: &Affine3, t1: &Matrix4<f64>, t2: &Matrix4<f64>) -> Option<Affine3> {
        Some(Affine3(t2.try_inverse()? * model.0 * t1))
    }
}

/// Un-normalizes epipolar models: `E = transpose(T2) * E' * T1`.
///
/// If `transpose(T2 * x') * E' * (T1 * x) = 0`, then `transpose(x') * E * x = 0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EpipolarUnnormalizer;

impl Unnormalizer<FundamentalMatrix, Matrix3<f64>> for EpipolarUnnormalizer {
    fn unnormalize(
        &self,
        model: &FundamentalMatrix,
        t1: &Matrix3<f64>,
        t2: &Matrix3<f64>,
    ) -> Option<FundamentalMatrix> {
        Some(FundamentalMatrix(t2.transpose() * model.0 * t1))
    }
}

impl Unnormalizer<EssentialMatrix, Matrix3<f64>> for EpipolarUnnormalizer {
    fn unnormalize(
        &self,
        model: &EssentialMatrix,
        t1: &Matrix3<f64>,
        t2: &Matrix3<f64>,
    ) -> Option<EssentialMatrix> {
        Some(EssentialMatrix(t2.transpose() * model.0 * t1))
    }
}
