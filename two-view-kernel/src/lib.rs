//! Glue between two-view minimal solvers and robust estimation loops.
//!
//! [`TwoViewKernel`] binds a [`Solver`](mvg_core::Solver) and a
//! [`Residual`](mvg_core::Residual) to a pair of point sets and implements the
//! [`Kernel`](mvg_core::Kernel) trait, so that a consensus loop only deals with sample indices
//! and scalar errors.
//!
//! [`NormalizedSolver`] wraps a solver so that it runs on conditioned coordinates and maps the
//! resulting models back to the original frames.

mod kernel;
mod normalized;

pub use kernel::*;
pub use normalized::*;
