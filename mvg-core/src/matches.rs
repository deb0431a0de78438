/// A single correspondence between a point in the first view and a point in the second view.
///
/// This is the data item consumed by the [`sample_consensus`] estimators implemented by the
/// solver crates.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FeatureMatch<P>(pub P, pub P);
