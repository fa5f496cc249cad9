//! Symmetric 4×4 eigen-decomposition
//!
//! Cyclic Jacobi rotations, as in the 3×3 case, extended to the 4×4
//! quaternion matrix used by the alignment core. All matrices are
//! row-major: `m[row][col]`.

use crate::AlignError;

/// Upper bound on full Jacobi sweeps before giving up
pub const MAX_SWEEPS: usize = 50;

/// Convergence threshold on the off-diagonal sum of squares, relative to
/// the sum of squares of every entry
const RELATIVE_TOLERANCE: f64 = 1e-30;

/// Eigenvalues (ascending) and the matching unit eigenvectors
#[derive(Debug, Clone)]
pub struct SymmetricEigen4 {
    /// Eigenvalues sorted ascending
    pub values: [f64; 4],
    /// `vectors[k]` is the eigenvector of `values[k]`
    pub vectors: [[f64; 4]; 4],
}

impl SymmetricEigen4 {
    /// Eigenvector of the smallest eigenvalue
    pub fn lowest(&self) -> &[f64; 4] {
        &self.vectors[0]
    }
}

/// Diagonalize a symmetric 4×4 matrix.
///
/// Only the upper triangle is read; the lower triangle is assumed to mirror
/// it. Equal eigenvalues keep the order in which the rotations left them, so
/// a matrix that is already diagonal comes back with the identity basis.
///
/// Fails with [`AlignError::DiagonalizationFailed`] when the off-diagonal
/// part has not vanished after [`MAX_SWEEPS`] sweeps; the code is the number
/// of off-diagonal pairs still above tolerance.
pub fn symmetric_eigen4(m: &[[f64; 4]; 4]) -> Result<SymmetricEigen4, AlignError> {
    let mut a = [[0.0f64; 4]; 4];
    for p in 0..4 {
        for q in p..4 {
            a[p][q] = m[p][q];
            a[q][p] = m[p][q];
        }
    }

    if a.iter().flatten().any(|x| !x.is_finite()) {
        return Err(AlignError::DiagonalizationFailed(-1));
    }

    // Eigenvector matrix (starts as identity, accumulates rotations)
    let mut v = [[0.0f64; 4]; 4];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    let scale: f64 = a.iter().flatten().map(|x| x * x).sum();
    let threshold = RELATIVE_TOLERANCE * scale;

    for sweep in 0..MAX_SWEEPS {
        if off_diagonal_norm2(&a) <= threshold {
            return Ok(sorted(&a, &v));
        }

        for p in 0..3 {
            for q in (p + 1)..4 {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }
                // After a few sweeps, drop elements that no longer change
                // the diagonal at working precision
                let g = 100.0 * apq.abs();
                if sweep > 3
                    && a[p][p].abs() + g == a[p][p].abs()
                    && a[q][q].abs() + g == a[q][q].abs()
                {
                    a[p][q] = 0.0;
                    a[q][p] = 0.0;
                    continue;
                }
                jacobi_rotate(&mut a, &mut v, p, q);
            }
        }
    }

    if off_diagonal_norm2(&a) <= threshold {
        return Ok(sorted(&a, &v));
    }

    let unconverged = (0..3)
        .flat_map(|p| ((p + 1)..4).map(move |q| (p, q)))
        .filter(|&(p, q)| a[p][q] * a[p][q] > threshold / 6.0)
        .count();
    Err(AlignError::DiagonalizationFailed(unconverged.max(1) as i32))
}

fn off_diagonal_norm2(a: &[[f64; 4]; 4]) -> f64 {
    let mut off = 0.0;
    for p in 0..3 {
        for q in (p + 1)..4 {
            off += a[p][q] * a[p][q];
        }
    }
    off
}

/// Apply a single Jacobi rotation to eliminate a[p][q].
fn jacobi_rotate(a: &mut [[f64; 4]; 4], v: &mut [[f64; 4]; 4], p: usize, q: usize) {
    let app = a[p][p];
    let aqq = a[q][q];
    let apq = a[p][q];

    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };
    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;

    // A' = GᵀAG: columns first, then rows
    for row in a.iter_mut() {
        let akp = row[p];
        let akq = row[q];
        row[p] = c * akp - s * akq;
        row[q] = s * akp + c * akq;
    }
    for k in 0..4 {
        let apk = a[p][k];
        let aqk = a[q][k];
        a[p][k] = c * apk - s * aqk;
        a[q][k] = s * apk + c * aqk;
    }
    a[p][q] = 0.0;
    a[q][p] = 0.0;

    // Accumulate eigenvectors: V' = V · G
    for row in v.iter_mut() {
        let vkp = row[p];
        let vkq = row[q];
        row[p] = c * vkp - s * vkq;
        row[q] = s * vkp + c * vkq;
    }
}

/// Read eigenpairs off the diagonalized matrix, ascending by eigenvalue
fn sorted(a: &[[f64; 4]; 4], v: &[[f64; 4]; 4]) -> SymmetricEigen4 {
    let mut order = [0usize, 1, 2, 3];
    // stable: ties keep their index order
    order.sort_by(|&i, &j| a[i][i].total_cmp(&a[j][j]));

    let mut values = [0.0; 4];
    let mut vectors = [[0.0; 4]; 4];
    for (k, &i) in order.iter().enumerate() {
        values[k] = a[i][i];
        // column i of v is the eigenvector of a[i][i]
        vectors[k] = [v[0][i], v[1][i], v[2][i], v[3][i]];
    }
    SymmetricEigen4 { values, vectors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_eigenpairs(m: &[[f64; 4]; 4], eig: &SymmetricEigen4, tol: f64) {
        for k in 0..4 {
            let x = &eig.vectors[k];
            let norm: f64 = x.iter().map(|c| c * c).sum();
            assert!((norm - 1.0).abs() < tol, "eigenvector {k} not normalized: {norm}");
            for i in 0..4 {
                let mx: f64 = (0..4).map(|j| m[i][j] * x[j]).sum();
                assert!(
                    (mx - eig.values[k] * x[i]).abs() < tol,
                    "M·v != λ·v for pair {k}, row {i}: {} vs {}",
                    mx,
                    eig.values[k] * x[i]
                );
            }
        }
    }

    #[test]
    fn test_diagonal_matrix_keeps_identity_basis() {
        let m = [
            [-0.5, 0.0, 0.0, 0.0],
            [0.0, -0.5, 0.0, 0.0],
            [0.0, 0.0, 0.5, 0.0],
            [0.0, 0.0, 0.0, 0.5],
        ];
        let eig = symmetric_eigen4(&m).unwrap();
        assert_eq!(eig.values, [-0.5, -0.5, 0.5, 0.5]);
        assert_eq!(eig.lowest(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ascending_order() {
        let m = [
            [2.0, 1.0, 0.0, 0.0],
            [1.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 3.0, 0.0],
            [0.0, 0.0, 0.0, -1.0],
        ];
        let eig = symmetric_eigen4(&m).unwrap();
        let expected = [-1.0, 1.0, 3.0, 3.0];
        for k in 0..4 {
            assert!((eig.values[k] - expected[k]).abs() < 1e-12, "λ{k} = {}", eig.values[k]);
        }
        assert!((eig.lowest()[3].abs() - 1.0).abs() < 1e-12);
        assert_eigenpairs(&m, &eig, 1e-12);
    }

    #[test]
    fn test_dense_matrix() {
        let m = [
            [4.0, -2.0, 0.5, 1.0],
            [-2.0, 3.0, 0.25, -0.75],
            [0.5, 0.25, -1.0, 2.0],
            [1.0, -0.75, 2.0, 0.5],
        ];
        let eig = symmetric_eigen4(&m).unwrap();
        assert!(eig.values.windows(2).all(|w| w[0] <= w[1]));
        let trace = 4.0 + 3.0 - 1.0 + 0.5;
        let sum: f64 = eig.values.iter().sum();
        assert!((sum - trace).abs() < 1e-12);
        assert_eigenpairs(&m, &eig, 1e-10);
    }

    #[test]
    fn test_large_scale_converges() {
        let s = 1.0e6;
        let m = [
            [1.0 * s, 0.3 * s, -0.2 * s, 0.1 * s],
            [0.3 * s, -0.5 * s, 0.4 * s, 0.0],
            [-0.2 * s, 0.4 * s, 0.7 * s, -0.6 * s],
            [0.1 * s, 0.0, -0.6 * s, 0.2 * s],
        ];
        let eig = symmetric_eigen4(&m).unwrap();
        assert_eigenpairs(&m, &eig, 1e-6);
    }

    #[test]
    fn test_zero_matrix() {
        let eig = symmetric_eigen4(&[[0.0; 4]; 4]).unwrap();
        assert_eq!(eig.values, [0.0; 4]);
    }

    #[test]
    fn test_non_finite_input_fails() {
        let mut m = [[0.0; 4]; 4];
        m[1][2] = f64::NAN;
        assert!(matches!(
            symmetric_eigen4(&m),
            Err(AlignError::DiagonalizationFailed(_))
        ));
    }
}
