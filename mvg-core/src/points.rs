use nalgebra::{Matrix2xX, Matrix3, Matrix3xX, Matrix4, Point2, Point3};

/// An ordered collection of points stored one point per column.
///
/// Two point sets with the same number of columns form a set of correspondences: column `i`
/// of the first set matches column `i` of the second.
pub trait PointSet: Clone {
    /// A single point of the set.
    type Point: Copy;

    /// The homogeneous transform acting on the points, such as the similarity produced
    /// by [`Normalize`](crate::Normalize).
    type Transform: Copy;

    /// The dimension of every point.
    const DIMENSION: usize;

    /// Number of points (columns).
    ///
    /// Not to be confused with the inherent `Matrix::len`, which counts scalar entries.
    fn num_points(&self) -> usize;

    /// Retrieves the point in column `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn point(&self, index: usize) -> Self::Point;

    /// Extracts the given columns, in the given order, into a new point set.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    fn select(&self, indices: &[usize]) -> Self;

    /// Packs points into a point set, one point per column.
    fn from_points(points: &[Self::Point]) -> Self;
}

impl PointSet for Matrix2xX<f64> {
    type Point = Point2<f64>;
    type Transform = Matrix3<f64>;
    const DIMENSION: usize = 2;

    fn num_points(&self) -> usize {
        self.ncols()
    }

    fn point(&self, index: usize) -> Point2<f64> {
        Point2::new(self[(0, index)], self[(1, index)])
    }

    fn select(&self, indices: &[usize]) -> Self {
        self.select_columns(indices)
    }

    fn from_points(points: &[Point2<f64>]) -> Self {
        Self::from_iterator(points.len(), points.iter().flat_map(|p| [p.x, p.y]))
    }
}

impl PointSet for Matrix3xX<f64> {
    type Point = Point3<f64>;
    type Transform = Matrix4<f64>;
    const DIMENSION: usize = 3;

    fn num_points(&self) -> usize {
        self.ncols()
    }

    fn point(&self, index: usize) -> Point3<f64> {
        Point3::new(self[(0, index)], self[(1, index)], self[(2, index)])
    }

    fn select(&self, indices: &[usize]) -> Self {
        self.select_columns(indices)
    }

    fn from_points(points: &[Point3<f64>]) -> Self {
        Self::from_iterator(points.len(), points.iter().flat_map(|p| [p.x, p.y, p.z]))
    }
}
