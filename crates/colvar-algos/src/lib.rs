//! Differentiable structural-similarity collective variables
//!
//! This crate provides the numerical core behind RMSD-style collective
//! variables used to bias free-energy sampling:
//! - Weighted optimal superposition (quaternion / Kabsch) with analytic
//!   derivatives of the distance and of the rotation itself
//! - RMSD metrics with translation-only or full roto-translational fit
//! - Principal-component projections of the aligned structure
//! - Euclidean distances in collective-variable (argument) space
//! - Collections of reference frames with pairwise distance tables
//!
//! Every evaluation is a pure function of its inputs and the immutable
//! reference data, so metrics and projectors can be shared across threads.

pub mod align;
pub mod config;
pub mod linalg;
pub mod metric;
pub mod multi;
pub mod pca;
pub mod reference;

pub use align::{align, align_to, AlignOptions, Alignment, RotationDerivative};
pub use config::{AlignmentKind, RmsdConfig};
pub use metric::{
    ArgumentDistance, ArgumentValue, MetricValue, OptimalRmsd, RmsdMetric, SimpleRmsd,
};
pub use multi::MultiReference;
pub use pca::{BasisFrame, ComponentBasis, ComponentProjector, ComponentValue, Projection};
pub use reference::{ReferenceOptions, ReferenceStructure};

/// Errors from alignment algorithms
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlignError {
    // Evaluation inputs
    #[error("Coordinate arrays have different lengths: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Argument arrays have different lengths: {0} vs {1}")]
    ArgumentMismatch(usize, usize),

    // Reference and basis configuration
    #[error("Weight array has {actual} entries, expected {expected}")]
    WeightCount { expected: usize, actual: usize },

    #[error("Invalid weight {value} for point {index}: weights must be finite and non-negative")]
    InvalidWeight { index: usize, value: f64 },

    #[error("Non-finite coordinate for point {index}")]
    NonFiniteCoordinate { index: usize },

    #[error("Weights sum to zero")]
    ZeroTotalWeight,

    #[error("Number of atoms in a frame should be more than zero")]
    NoAtoms,

    #[error("At least one component vector is expected")]
    NoComponents,

    #[error("Component {component} has {actual} atoms, expected {expected}")]
    ComponentSizeMismatch {
        component: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Component {component} does not contain the same atoms in the same order")]
    ComponentOrderMismatch { component: usize },

    #[error("Unknown alignment type: {0} (expected SIMPLE or OPTIMAL)")]
    UnknownMetric(String),

    #[error("Frame index {0} is out of range (have {1} frames)")]
    FrameOutOfRange(usize, usize),

    // Numerical failure
    #[error("Diagonalization failed with error code {0}")]
    DiagonalizationFailed(i32),
}

impl AlignError {
    /// True for errors caused by malformed reference or basis data, as
    /// opposed to bad evaluation input or numerical failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AlignError::WeightCount { .. }
                | AlignError::InvalidWeight { .. }
                | AlignError::NonFiniteCoordinate { .. }
                | AlignError::ZeroTotalWeight
                | AlignError::NoAtoms
                | AlignError::NoComponents
                | AlignError::ComponentSizeMismatch { .. }
                | AlignError::ComponentOrderMismatch { .. }
                | AlignError::UnknownMetric(_)
        )
    }
}

/// Result type for alignment operations
pub type AlignResult<T> = Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_evaluators_are_send_sync() {
        assert_send_sync::<RmsdMetric>();
        assert_send_sync::<ComponentProjector>();
        assert_send_sync::<ReferenceStructure>();
        assert_send_sync::<MultiReference>();
        assert_send_sync::<ArgumentDistance>();
    }

    #[test]
    fn test_non_finite_coordinate_is_configuration() {
        assert!(AlignError::NonFiniteCoordinate { index: 0 }.is_configuration());
        assert!(!AlignError::DiagonalizationFailed(-1).is_configuration());
    }
}
