use crate::{EstimationError, PointSet};
use log::trace;
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, Dynamic, Matrix2xX, Matrix3, Matrix3xX,
    Matrix4, OMatrix, OVector,
};

/// Conditioning of a point set prior to building a linear system from it.
///
/// The points are translated so that their centroid is the origin and isotropically scaled so
/// that their mean distance to the origin is `sqrt(D)`, `D` being the dimension of the points.
/// This is the normalization proposed by Hartley for the eight-point algorithm and it keeps the
/// linear systems of the solvers well-conditioned whatever the units of the input (pixel
/// coordinates in the thousands, for instance).
pub trait Normalize: PointSet + Sized {
    /// Returns the normalized points together with the similarity `T` such that
    /// `normalized = T * points` in homogeneous coordinates.
    ///
    /// Fails with [`EstimationError::EmptyPointSet`] if there are no points and with
    /// [`EstimationError::ZeroSpread`] if all points coincide.
    fn normalize_isotropic(&self) -> Result<(Self, Self::Transform), EstimationError>;
}

impl Normalize for Matrix2xX<f64> {
    fn normalize_isotropic(&self) -> Result<(Self, Matrix3<f64>), EstimationError> {
        let (centroid, scale) = centroid_and_scale(self)?;
        let transform = Matrix3::new(
            scale,
            0.0,
            -scale * centroid.x,
            0.0,
            scale,
            -scale * centroid.y,
            0.0,
            0.0,
            1.0,
        );
        Ok((apply(self, &centroid, scale), transform))
    }
}

impl Normalize for Matrix3xX<f64> {
    fn normalize_isotropic(&self) -> Result<(Self, Matrix4<f64>), EstimationError> {
        let (centroid, scale) = centroid_and_scale(self)?;
        let transform = Matrix4::new(
            scale,
            0.0,
            0.0,
            -scale * centroid.x,
            0.0,
            scale,
            0.0,
            -scale * centroid.y,
            0.0,
            0.0,
            scale,
            -scale * centroid.z,
            0.0,
            0.0,
            0.0,
            1.0,
        );
        Ok((apply(self, &centroid, scale), transform))
    }
}

fn centroid_and_scale<D>(
    points: &OMatrix<f64, D, Dynamic>,
) -> Result<(OVector<f64, D>, f64), EstimationError>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D> + Allocator<f64, D, Dynamic>,
{
    let count = points.ncols();
    if count == 0 {
        return Err(EstimationError::EmptyPointSet);
    }
    let centroid = points.column_mean();
    let mean_distance = points
        .column_iter()
        .map(|point| {
            point
                .iter()
                .zip(centroid.iter())
                .map(|(&p, &c)| (p - c) * (p - c))
                .sum::<f64>()
                .sqrt()
        })
        .sum::<f64>()
        / count as f64;

    // The spread must stay distinguishable from rounding noise on the coordinates themselves.
    let magnitude = centroid.iter().fold(1.0f64, |acc, &c| acc.max(c.abs()));
    if !(mean_distance > f64::EPSILON * magnitude) {
        trace!(
            "rejecting point set of {} points with spread {}",
            count,
            mean_distance
        );
        return Err(EstimationError::ZeroSpread);
    }

    Ok((centroid, (D::dim() as f64).sqrt() / mean_distance))
}

fn apply<D>(
    points: &OMatrix<f64, D, Dynamic>,
    centroid: &OVector<f64, D>,
    scale: f64,
) -> OMatrix<f64, D, Dynamic>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D> + Allocator<f64, D, Dynamic>,
{
    let mut normalized = points.clone();
    for mut column in normalized.column_iter_mut() {
        for (value, &c) in column.iter_mut().zip(centroid.iter()) {
            *value = (*value - c) * scale;
        }
    }
    normalized
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3, Vector3, Vector4};
    use quickcheck_macros::quickcheck;

    fn mean_norm<D>(points: &OMatrix<f64, D, Dynamic>) -> f64
    where
        D: DimName,
        DefaultAllocator: Allocator<f64, D> + Allocator<f64, D, Dynamic>,
    {
        points.column_iter().map(|c| c.norm()).sum::<f64>() / points.ncols() as f64
    }

    #[test]
    fn pixel_coordinates_2d() {
        let points = Matrix2xX::from_points(&[
            Point2::new(1200.0, 800.0),
            Point2::new(1850.0, 300.0),
            Point2::new(2400.0, 1900.0),
            Point2::new(640.0, 1500.0),
        ]);
        let (normalized, transform) = points.normalize_isotropic().unwrap();

        assert_relative_eq!(normalized.column_mean().norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(mean_norm(&normalized), 2.0f64.sqrt(), epsilon = 1e-12);
        for (raw, expected) in points.column_iter().zip(normalized.column_iter()) {
            let mapped = transform * Vector3::new(raw[0], raw[1], 1.0);
            assert_relative_eq!(mapped.xy(), expected.into_owned(), epsilon = 1e-12);
            assert_relative_eq!(mapped.z, 1.0);
        }
    }

    #[test]
    fn points_3d() {
        let points = Matrix3xX::from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(3.0, 2.0, 1.0),
        ]);
        let (normalized, transform) = points.normalize_isotropic().unwrap();

        assert_relative_eq!(normalized.column_mean().norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(mean_norm(&normalized), 3.0f64.sqrt(), epsilon = 1e-12);
        let mapped = transform * Vector4::new(3.0, 2.0, 1.0, 1.0);
        assert_relative_eq!(mapped.xyz(), normalized.column(4).into_owned(), epsilon = 1e-12);
    }

    #[test]
    fn coincident_points_have_zero_spread() {
        let points = Matrix2xX::from_points(&[Point2::new(1e3, -4.0); 6]);
        assert_eq!(points.normalize_isotropic(), Err(EstimationError::ZeroSpread));
    }

    #[test]
    fn empty_point_set() {
        let points = Matrix3xX::<f64>::zeros(0);
        assert_eq!(points.normalize_isotropic(), Err(EstimationError::EmptyPointSet));
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let points = Matrix2xX::from_points(&[Point2::new(f64::NAN, 0.0), Point2::new(1.0, 2.0)]);
        assert_eq!(points.normalize_isotropic(), Err(EstimationError::ZeroSpread));
    }

    #[quickcheck]
    fn normalized_points_are_centered(coords: Vec<(i16, i16)>) -> bool {
        let points = Matrix2xX::from_points(
            &coords
                .iter()
                .map(|&(x, y)| Point2::new(x as f64, y as f64))
                .collect::<Vec<_>>(),
        );
        match points.normalize_isotropic() {
            Ok((normalized, _)) => {
                normalized.column_mean().norm() < 1e-9
                    && (mean_norm(&normalized) - 2.0f64.sqrt()).abs() < 1e-9
            }
            Err(EstimationError::EmptyPointSet) => coords.is_empty(),
            Err(EstimationError::ZeroSpread) => coords.iter().all(|&c| c == coords[0]),
            Err(_) => false,
        }
    }
}
