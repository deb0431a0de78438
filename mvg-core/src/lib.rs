//! # MVG Core
//!
//! Common types and abstractions shared by the two-view minimal solvers of this workspace.
//!
//! A robust estimation problem between two views is split into three pieces that can be
//! combined freely:
//!
//! * a [`Solver`] turns a handful of correspondences into zero or more candidate models,
//! * a [`Residual`] scores how well a model explains a single correspondence,
//! * a [`Kernel`] binds both to a pair of point sets so that an outer consensus loop
//!   (RANSAC and friends) only ever deals with sample indices and scalar errors.
//!
//! Point sets are stored one point per column ([`Matrix2xX`](nalgebra::Matrix2xX) or
//! [`Matrix3xX`](nalgebra::Matrix3xX)). The column index is the correspondence id: column
//! `i` of the left set matches column `i` of the right set.
//!
//! Solvers never clear the model list they are given. They only append, which lets a caller
//! accumulate the candidates of several fits into a single buffer.
//!
//! ## Conditioning
//!
//! Linear systems built from raw pixel coordinates are badly scaled. The [`Normalize`] trait
//! centers a point set on its centroid and scales it isotropically, returning the similarity
//! that was applied so that models estimated in the normalized frame can be mapped back with an
//! [`Unnormalizer`].

mod conditioning;
mod error;
mod matches;
mod model;
mod points;
mod residual;
mod solver;
mod unnormalize;

pub use conditioning::*;
pub use error::*;
pub use matches::*;
pub use model::*;
pub use nalgebra;
pub use points::*;
pub use residual::*;
pub use sample_consensus;
pub use solver::*;
pub use unnormalize::*;
