use thiserror::Error;

/// Failures reported by solvers, conditioning and kernels.
///
/// Not finding a model is *not* an error: a solver that cannot explain a sample simply appends
/// nothing and returns `Ok(())`. The variants below are split in two groups. Contract
/// violations mean the caller handed over malformed input and retrying with another random
/// sample will not help. [`EstimationError::ZeroSpread`] means the particular sample is
/// numerically unusable and the caller should draw another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimationError {
    #[error("sample has {got} correspondences but at least {minimum} are required")]
    SampleTooSmall { minimum: usize, got: usize },
    #[error("point sets have different lengths ({left} and {right})")]
    MismatchedPointSets { left: usize, right: usize },
    #[error("sample index {index} is out of bounds for {len} correspondences")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("cannot condition an empty point set")]
    EmptyPointSet,
    #[error("point set has zero spread and cannot be normalized")]
    ZeroSpread,
}

impl EstimationError {
    /// Returns `true` if the error stems from malformed input rather than from an unlucky sample.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::ZeroSpread)
    }
}

/// Checks that two point sets can be handed to a solver needing `minimum` correspondences.
///
/// Returns the number of correspondences.
pub fn check_correspondences(
    left: usize,
    right: usize,
    minimum: usize,
) -> Result<usize, EstimationError> {
    if left != right {
        return Err(EstimationError::MismatchedPointSets { left, right });
    }
    if left < minimum {
        return Err(EstimationError::SampleTooSmall { minimum, got: left });
    }
    Ok(left)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_spread_is_not_a_contract_violation() {
        assert!(!EstimationError::ZeroSpread.is_contract_violation());
        assert!(EstimationError::EmptyPointSet.is_contract_violation());
        assert!(EstimationError::SampleTooSmall { minimum: 5, got: 4 }.is_contract_violation());
    }

    #[test]
    fn correspondence_checks() {
        assert_eq!(check_correspondences(5, 5, 5), Ok(5));
        assert_eq!(
            check_correspondences(5, 6, 5),
            Err(EstimationError::MismatchedPointSets { left: 5, right: 6 })
        );
        assert_eq!(
            check_correspondences(2, 2, 3),
            Err(EstimationError::SampleTooSmall { minimum: 3, got: 2 })
        );
    }
}
