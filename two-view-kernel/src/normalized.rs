use log::trace;
use mvg_core::{
    check_correspondences, EstimationError, Normalize, PointSet, Solver, Unnormalizer,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Runs a solver on conditioned coordinates.
///
/// Both point sets are centered and scaled isotropically (see [`Normalize`]), the wrapped
/// solver estimates models in the normalized frames and each model is mapped back to the
/// original frames by the [`Unnormalizer`]. On exact correspondences the result is the
/// same relation the wrapped solver finds on the raw coordinates; only the numerical
/// conditioning differs.
///
/// The wrapped model must be invariant to similarities of the two views for this to be
/// meaningful. Affine maps and fundamental matrices are; essential matrices are not, since
/// normalization moves the points out of the calibrated frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedSolver<S, U> {
    pub solver: S,
    pub unnormalizer: U,
}

impl<S, U> NormalizedSolver<S, U> {
    pub fn new(solver: S, unnormalizer: U) -> Self {
        Self {
            solver,
            unnormalizer,
        }
    }
}

impl<S, U> Solver for NormalizedSolver<S, U>
where
    S: Solver,
    S::Points: Normalize,
    U: Unnormalizer<S::Model, <S::Points as PointSet>::Transform>,
{
    type Points = S::Points;
    type Model = S::Model;
    const MINIMUM_SAMPLES: usize = S::MINIMUM_SAMPLES;
    const MAX_MODELS: usize = S::MAX_MODELS;

    /// Fails with [`EstimationError::ZeroSpread`] if either point set cannot be normalized.
    fn solve(
        &self,
        x1: &S::Points,
        x2: &S::Points,
        models: &mut Vec<S::Model>,
    ) -> Result<(), EstimationError> {
        check_correspondences(x1.num_points(), x2.num_points(), S::MINIMUM_SAMPLES)?;
        let (x1, t1) = x1.normalize_isotropic()?;
        let (x2, t2) = x2.normalize_isotropic()?;

        let mut normalized = Vec::with_capacity(S::MAX_MODELS);
        self.solver.solve(&x1, &x2, &mut normalized)?;
        for model in &normalized {
            match self.unnormalizer.unnormalize(model, &t1, &t2) {
                Some(model) => models.push(model),
                None => trace!("dropping a model whose normalization cannot be undone"),
            }
        }
        Ok(())
    }
}
