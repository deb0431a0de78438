use crate::{EstimationError, PointSet};

/// A minimal (or slightly over-determined) solver mapping correspondences to candidate models.
pub trait Solver {
    /// The point sets the solver consumes.
    type Points: PointSet;

    /// The candidate model produced by the solver.
    type Model;

    /// The minimum number of correspondences needed to estimate a model.
    const MINIMUM_SAMPLES: usize;

    /// The maximum number of models a single call to [`Solver::solve`] may produce.
    const MAX_MODELS: usize;

    /// Estimates the models explaining the correspondences `x1[i] <-> x2[i]`.
    ///
    /// Candidates are appended to `models`; existing entries are left untouched. Finding no
    /// model is not an error: the solver returns `Ok(())` without appending anything.
    /// An error is only returned when the input itself is malformed or unusable, see
    /// [`EstimationError`].
    fn solve(
        &self,
        x1: &Self::Points,
        x2: &Self::Points,
        models: &mut Vec<Self::Model>,
    ) -> Result<(), EstimationError>;
}

/// Scores how well a model explains a single correspondence.
///
/// The returned value is non-negative and only depends on the three inputs.
pub trait Residual<M, P> {
    fn error(&self, model: &M, x1: &P, x2: &P) -> f64;
}

/// Maps a model estimated on normalized points back to the original coordinate frames.
pub trait Unnormalizer<M, T> {
    /// `t1` and `t2` are the normalization transforms applied to the first and second point set.
    ///
    /// Returns `None` if the transforms cannot be inverted.
    fn unnormalize(&self, model: &M, t1: &T, t2: &T) -> Option<M>;
}

/// The interface a robust estimation loop sees.
///
/// A kernel exposes how many correspondences there are, fits models to subsets of them and
/// scores models against individual correspondences. It never exposes the correspondences
/// themselves.
pub trait Kernel {
    type Model;

    /// Number of putative correspondences.
    fn num_samples(&self) -> usize;

    /// The minimal number of correspondences needed by [`Kernel::fit`].
    fn minimum_samples(&self) -> usize;

    /// The maximum number of models [`Kernel::fit`] may append per call.
    fn max_models(&self) -> usize;

    /// Fits models to the correspondences at `sample` and appends them to `models`.
    fn fit(&self, sample: &[usize], models: &mut Vec<Self::Model>) -> Result<(), EstimationError>;

    /// The error of the correspondence at `index` with respect to `model`.
    fn error(&self, index: usize, model: &Self::Model) -> f64;
}
