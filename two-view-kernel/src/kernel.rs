use mvg_core::{EstimationError, Kernel, PointSet, Residual, Solver};

/// A [`Kernel`] over the correspondences `x1[i] <-> x2[i]` of two views.
///
/// The kernel borrows both point sets for its whole lifetime and never modifies them, so any
/// number of kernels (and threads) may share the same correspondences.
pub struct TwoViewKernel<'a, S: Solver, E> {
    x1: &'a S::Points,
    x2: &'a S::Points,
    solver: S,
    residual: E,
}

impl<'a, S, E> TwoViewKernel<'a, S, E>
where
    S: Solver,
    E: Residual<S::Model, <S::Points as PointSet>::Point>,
{
    /// Binds `solver` and `residual` to the correspondences.
    ///
    /// Fails with [`EstimationError::MismatchedPointSets`] if the point sets differ in length.
    pub fn new(
        x1: &'a S::Points,
        x2: &'a S::Points,
        solver: S,
        residual: E,
    ) -> Result<Self, EstimationError> {
        let (left, right) = (x1.num_points(), x2.num_points());
        if left != right {
            return Err(EstimationError::MismatchedPointSets { left, right });
        }
        Ok(Self {
            x1,
            x2,
            solver,
            residual,
        })
    }

    /// Runs the kernel's solver on arbitrary point sets.
    pub fn solve(
        &self,
        x1: &S::Points,
        x2: &S::Points,
        models: &mut Vec<S::Model>,
    ) -> Result<(), EstimationError> {
        self.solver.solve(x1, x2, models)
    }

    pub fn x1(&self) -> &'a S::Points {
        self.x1
    }

    pub fn x2(&self) -> &'a S::Points {
        self.x2
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn residual(&self) -> &E {
        &self.residual
    }
}

impl<'a, S, E> Kernel for TwoViewKernel<'a, S, E>
where
    S: Solver,
    E: Residual<S::Model, <S::Points as PointSet>::Point>,
{
    type Model = S::Model;

    fn num_samples(&self) -> usize {
        self.x1.num_points()
    }

    fn minimum_samples(&self) -> usize {
        S::MINIMUM_SAMPLES
    }

    fn max_models(&self) -> usize {
        S::MAX_MODELS
    }

    /// Extracts the correspondences at `sample`, in order, and hands them to the solver.
    ///
    /// Models are appended to `models`. Fails with [`EstimationError::SampleTooSmall`] or
    /// [`EstimationError::IndexOutOfBounds`] without touching `models`.
    fn fit(&self, sample: &[usize], models: &mut Vec<S::Model>) -> Result<(), EstimationError> {
        if sample.len() < S::MINIMUM_SAMPLES {
            return Err(EstimationError::SampleTooSmall {
                minimum: S::MINIMUM_SAMPLES,
                got: sample.len(),
            });
        }
        let len = self.num_samples();
        if let Some(&index) = sample.iter().find(|&&index| index >= len) {
            return Err(EstimationError::IndexOutOfBounds { index, len });
        }
        let x1 = self.x1.select(sample);
        let x2 = self.x2.select(sample);
        self.solver.solve(&x1, &x2, models)
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn error(&self, index: usize, model: &S::Model) -> f64 {
        self.residual
            .error(model, &self.x1.point(index), &self.x2.point(index))
    }
}
