//! Linear algebra utilities
//!
//! Small fixed-size operations used by the alignment core:
//!
//! - [`tensor`] - 3×3 row-major tensors over `lin_alg::f64::Vec3`
//! - [`eigen`] - symmetric 4×4 eigen-decomposition (Jacobi eigenvalue method)

pub mod eigen;
pub mod tensor;

pub use eigen::{symmetric_eigen4, SymmetricEigen4};
pub use tensor::Tensor3;
