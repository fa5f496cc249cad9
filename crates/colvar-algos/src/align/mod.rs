//! Weighted optimal superposition
//!
//! - Quaternion (Kabsch-equivalent) fit with alignment and displacement weights
//! - Analytic derivatives of the fitted distance and of the rotation tensor

pub mod core;

pub use self::core::{align, align_to, AlignOptions, Alignment, RotationDerivative};
