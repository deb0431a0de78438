//! # `mvg`
//!
//! Two-view geometric estimation in one crate.
//!
//! This crate gathers the point set types, solvers, error functors and estimation kernels of
//! the workspace so that a robust estimation routine can be put together from a single
//! dependency. If you only need one solver, depend on its crate directly instead.
//!
//! All of the basic types and traits are included in the root of the crate.
//!
//! ## Modules
//! * [`consensus`] - finding the best estimated model from noisy data
//! * [`estimate`] - minimal solvers estimating models from correspondences
//! * [`kernel`] - binding solvers and error functors to correspondences

pub use mvg_core::{sample_consensus::*, *};

/// Consensus algorithms (RANSAC)
pub mod consensus {
    #[cfg(feature = "arrsac")]
    pub use arrsac::Arrsac;
}

/// Estimation algorithms
pub mod estimate {
    #[cfg(feature = "eight-point")]
    pub use eight_point::EightPoint;
    #[cfg(feature = "mvg-affine")]
    pub use mvg_affine::{
        affine2d_from_correspondences_linear, affine3d_from_correspondences_linear, Affine2d,
        Affine3d,
    };
    #[cfg(feature = "nister-stewenius")]
    pub use nister_stewenius::{
        five_points_nullspace_basis, five_points_polynomial_constraints, FivePoint,
    };
}

/// Estimation kernels for consensus loops driven by sample indices
pub mod kernel {
    #[cfg(feature = "two-view-kernel")]
    pub use two_view_kernel::{NormalizedSolver, TwoViewKernel};
}
