//! Weighted optimal superposition with analytic derivatives
//!
//! Given a moving point set and a reference point set, finds the rotation
//! `R` and the centroid shift that minimize
//! `Σ u_i |(x_i − c_x) − R·(r_i − c_r)|²`, where centroids use the
//! alignment weights `w` and the sum uses the displacement weights `u`.
//!
//! The rotation comes from the lowest eigenvector of a 4×4 symmetric matrix
//! built from the weighted cross-covariance `rr01 = Σ w_i (x_i − c_x) ⊗
//! (r_i − c_r)`, read as a quaternion. When `w ≠ u` the fitted rotation is no
//! longer stationary for the reported distance, so the derivative of `R`
//! with respect to `rr01` is propagated through first-order perturbation
//! theory of that eigenvector.

use lin_alg::f64::Vec3;

use crate::linalg::tensor::{self, from_rows, Tensor3};
use crate::linalg::{symmetric_eigen4, SymmetricEigen4};
use crate::reference::{weighted_centroid, ReferenceStructure};
use crate::{AlignError, AlignResult};

/// Per-call switches for [`align`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignOptions {
    /// Report the mean square deviation instead of its square root
    pub squared: bool,
    /// Recompute the deviation from the displacements instead of taking it
    /// from the lowest eigenvalue (less numerical noise, one extra pass)
    pub safe: bool,
    /// Also return `∂R_ab/∂x_i` for every moving point
    pub rotation_derivative: bool,
    /// Use the direct gradient when alignment and displacement weights are
    /// pointwise equal. Turning this off forces the general branch.
    pub equal_weight_shortcut: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            squared: false,
            safe: true,
            rotation_derivative: false,
            equal_weight_shortcut: true,
        }
    }
}

/// Derivative of the rotation tensor with respect to each moving point
#[derive(Debug, Clone)]
pub struct RotationDerivative {
    /// `per_point[i][a][b] = ∂R_ab/∂x_i`
    per_point: Vec<[[Vec3; 3]; 3]>,
}

impl RotationDerivative {
    /// All nine `∂R_ab/∂x_i` for point `i`
    pub fn at(&self, i: usize) -> &[[Vec3; 3]; 3] {
        &self.per_point[i]
    }

    /// `∂R_ab/∂x_i`
    pub fn component(&self, a: usize, b: usize, i: usize) -> Vec3 {
        self.per_point[i][a][b]
    }

    pub fn len(&self) -> usize {
        self.per_point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_point.is_empty()
    }
}

/// Result of one superposition
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Alignment-weighted centroid of the moving set
    pub moving_centroid: Vec3,
    /// Alignment-weighted centroid of the reference set
    pub reference_centroid: Vec3,
    /// Rotation carrying the centered reference onto the centered moving set
    pub rotation: Tensor3,
    /// Lowest eigenvector of the quaternion matrix
    pub quaternion: [f64; 4],
    /// Eigenvalues of the quaternion matrix, ascending
    pub eigenvalues: [f64; 4],
    /// `Σ w_i |x_i − c_x|²`
    pub rr00: f64,
    /// `Σ w_i |r_i − c_r|²`
    pub rr11: f64,
    /// Fitted mean square deviation
    pub msd: f64,
    /// `msd`, or its square root when not squared
    pub distance: f64,
    /// `x_i − c_x`
    pub centered_moving: Vec<Vec3>,
    /// `r_i − c_r`
    pub centered_reference: Vec<Vec3>,
    /// `d_i = (x_i − c_x) − R·(r_i − c_r)`
    pub displacements: Vec<Vec3>,
    /// `∂distance/∂x_i`
    pub derivatives: Vec<Vec3>,
    /// Present when requested through [`AlignOptions::rotation_derivative`]
    pub rotation_derivative: Option<RotationDerivative>,
    /// Whether the equal-weights gradient was used
    pub used_shortcut: bool,
    eigen: SymmetricEigen4,
}

impl Alignment {
    /// Moving points expressed in the reference frame: `Rᵀ·(x_i − c_x)`
    pub fn aligned_positions(&self) -> Vec<Vec3> {
        self.centered_moving
            .iter()
            .map(|&y| tensor::transpose_matvec(&self.rotation, y))
            .collect()
    }

    /// `∂R_ab/∂x_i` for every moving point, rebuilt from the stored
    /// eigen-decomposition. `align_weights` must be the weights the
    /// alignment was computed with.
    pub fn rotation_derivative_for(&self, align_weights: &[f64]) -> RotationDerivative {
        match &self.rotation_derivative {
            Some(drot) => drot.clone(),
            None => per_point_rotation_derivative(
                &rotation_derivative_wrt_covariance(&self.eigen),
                &self.centered_reference,
                align_weights,
            ),
        }
    }
}

/// Superpose `reference` onto `moving`.
///
/// All four slices must have the same length. Weights are used as given;
/// centroids are weighted means, so they need not be normalized.
pub fn align(
    moving: &[Vec3],
    reference: &[Vec3],
    align_weights: &[f64],
    displace_weights: &[f64],
    options: AlignOptions,
) -> AlignResult<Alignment> {
    let n = reference.len();
    if moving.len() != n {
        return Err(AlignError::LengthMismatch(moving.len(), n));
    }
    for weights in [align_weights, displace_weights] {
        if weights.len() != n {
            return Err(AlignError::WeightCount {
                expected: n,
                actual: weights.len(),
            });
        }
    }
    if n == 0 {
        return Err(AlignError::NoAtoms);
    }

    let al_eq_dis = options.equal_weight_shortcut && align_weights == displace_weights;

    // 1. Weighted centroids
    let total: f64 = align_weights.iter().sum();
    if total <= 0.0 {
        return Err(AlignError::ZeroTotalWeight);
    }
    let moving_centroid = weighted_centroid(moving, align_weights, total);
    let reference_centroid = weighted_centroid(reference, align_weights, total);

    // 2. Centered copies and second moments
    let centered_moving: Vec<Vec3> = moving.iter().map(|&x| x - moving_centroid).collect();
    let centered_reference: Vec<Vec3> =
        reference.iter().map(|&r| r - reference_centroid).collect();

    let mut rr00 = 0.0;
    let mut rr11 = 0.0;
    let mut rr01 = tensor::ZERO;
    for i in 0..n {
        let w = align_weights[i];
        let y = centered_moving[i];
        let z = centered_reference[i];
        rr00 += w * y.magnitude_squared();
        rr11 += w * z.magnitude_squared();
        tensor::add_scaled(&mut rr01, &tensor::outer(y, z), w);
    }

    // 3. Quaternion matrix and its lowest eigenvector
    let m = quaternion_matrix(&rr01);
    let eig = symmetric_eigen4(&m)?;
    let quaternion = *eig.lowest();
    let rotation = tensor::rotation_from_quaternion(&quaternion);

    let mut drotation_drr01 = options
        .rotation_derivative
        .then(|| rotation_derivative_wrt_covariance(&eig));

    // 4. Displacements, deviation and gradient
    let displacements: Vec<Vec3> = centered_moving
        .iter()
        .zip(&centered_reference)
        .map(|(&y, &z)| y - tensor::matvec(&rotation, z))
        .collect();

    let (msd, mut derivatives) = if al_eq_dis {
        let msd = if options.safe {
            weighted_square_sum(&displacements, align_weights)
        } else {
            eig.values[0] + rr00 + rr11
        };
        // The fit is stationary: rotation and shift contribute nothing
        let derivatives = displacements
            .iter()
            .zip(align_weights)
            .map(|(&d, &w)| d * (2.0 * w))
            .collect();
        (msd, derivatives)
    } else {
        let drot = drotation_drr01.get_or_insert_with(|| rotation_derivative_wrt_covariance(&eig));
        let msd = weighted_square_sum(&displacements, displace_weights);
        let derivatives = general_gradient(
            &displacements,
            &centered_reference,
            align_weights,
            displace_weights,
            total,
            drot,
        );
        (msd, derivatives)
    };
    let msd = msd.max(0.0);

    let distance = if options.squared {
        msd
    } else {
        let rmsd = msd.sqrt();
        // undefined at rmsd == 0; callers avoid coincident sets here
        let scale = 0.5 / rmsd;
        derivatives.iter_mut().for_each(|d| *d = *d * scale);
        rmsd
    };

    let rotation_derivative = drotation_drr01
        .as_ref()
        .filter(|_| options.rotation_derivative)
        .map(|drot| per_point_rotation_derivative(drot, &centered_reference, align_weights));

    log::trace!(
        "Aligned {} points: msd = {:.6e}, lowest eigenvalue = {:.6e}, shortcut = {}",
        n,
        msd,
        eig.values[0],
        al_eq_dis
    );

    Ok(Alignment {
        moving_centroid,
        reference_centroid,
        rotation,
        quaternion,
        eigenvalues: eig.values,
        rr00,
        rr11,
        msd,
        distance,
        centered_moving,
        centered_reference,
        displacements,
        derivatives,
        rotation_derivative,
        used_shortcut: al_eq_dis,
        eigen: eig,
    })
}

/// Superpose a prepared reference structure onto `moving`
pub fn align_to(
    reference: &ReferenceStructure,
    moving: &[Vec3],
    options: AlignOptions,
) -> AlignResult<Alignment> {
    align(
        moving,
        reference.positions(),
        reference.align_weights(),
        reference.displace_weights(),
        options,
    )
}

fn weighted_square_sum(vectors: &[Vec3], weights: &[f64]) -> f64 {
    vectors
        .iter()
        .zip(weights)
        .map(|(v, &w)| w * v.magnitude_squared())
        .sum()
}

/// Gradient of `Σ u_i |d_i|²` when alignment and displacement weights differ.
///
/// Rotation-frozen part: `2 u_j d_j` plus the shift of the moving centroid.
/// Rotation part: `∂D/∂R` contracted with `∂R/∂rr01`, then carried to the
/// points through `∂rr01/∂x_j = w_j · e ⊗ (r_j − c_r)`.
fn general_gradient(
    displacements: &[Vec3],
    centered_reference: &[Vec3],
    align_weights: &[f64],
    displace_weights: &[f64],
    total_align: f64,
    drotation_drr01: &[[Tensor3; 3]; 3],
) -> Vec<Vec3> {
    let mut ddist_drotation = tensor::ZERO;
    let mut ddist_dcentroid = Vec3::new_zero();
    for ((&d, &z), &u) in displacements
        .iter()
        .zip(centered_reference)
        .zip(displace_weights)
    {
        tensor::add_scaled(&mut ddist_drotation, &tensor::outer(d, z), -2.0 * u);
        ddist_dcentroid += d * (-2.0 * u);
    }

    let mut ddist_drr01 = tensor::ZERO;
    for a in 0..3 {
        for b in 0..3 {
            tensor::add_scaled(&mut ddist_drr01, &drotation_drr01[a][b], ddist_drotation[a][b]);
        }
    }

    displacements
        .iter()
        .zip(centered_reference)
        .zip(align_weights.iter().zip(displace_weights))
        .map(|((&d, &z), (&w, &u))| {
            d * (2.0 * u)
                + ddist_dcentroid * (w / total_align)
                + tensor::matvec(&ddist_drr01, z) * w
        })
        .collect()
}

fn per_point_rotation_derivative(
    drotation_drr01: &[[Tensor3; 3]; 3],
    centered_reference: &[Vec3],
    align_weights: &[f64],
) -> RotationDerivative {
    let per_point = centered_reference
        .iter()
        .zip(align_weights)
        .map(|(&z, &w)| {
            let mut d = [[Vec3::new_zero(); 3]; 3];
            for a in 0..3 {
                for b in 0..3 {
                    d[a][b] = tensor::matvec(&drotation_drr01[a][b], z) * w;
                }
            }
            d
        })
        .collect();
    RotationDerivative { per_point }
}

/// Symmetric 4×4 matrix whose lowest eigenvector is the optimal quaternion
fn quaternion_matrix(rr01: &Tensor3) -> [[f64; 4]; 4] {
    let r = rr01;
    let mut m = [[0.0f64; 4]; 4];
    m[0][0] = 2.0 * (-r[0][0] - r[1][1] - r[2][2]);
    m[1][1] = 2.0 * (-r[0][0] + r[1][1] + r[2][2]);
    m[2][2] = 2.0 * (r[0][0] - r[1][1] + r[2][2]);
    m[3][3] = 2.0 * (r[0][0] + r[1][1] - r[2][2]);
    m[0][1] = 2.0 * (-r[1][2] + r[2][1]);
    m[0][2] = 2.0 * (r[0][2] - r[2][0]);
    m[0][3] = 2.0 * (-r[0][1] + r[1][0]);
    m[1][2] = 2.0 * (-r[0][1] - r[1][0]);
    m[1][3] = 2.0 * (-r[0][2] - r[2][0]);
    m[2][3] = 2.0 * (-r[1][2] - r[2][1]);
    for i in 0..4 {
        for j in 0..i {
            m[i][j] = m[j][i];
        }
    }
    m
}

/// `∂m_jk/∂rr01` for the upper triangle of [`quaternion_matrix`]
const DM_DRR01_UPPER: [((usize, usize), Tensor3); 10] = [
    ((0, 0), from_rows([-2.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0, -2.0])),
    ((1, 1), from_rows([-2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0])),
    ((2, 2), from_rows([2.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0, 2.0])),
    ((3, 3), from_rows([2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, -2.0])),
    ((0, 1), from_rows([0.0, 0.0, 0.0, 0.0, 0.0, -2.0, 0.0, 2.0, 0.0])),
    ((0, 2), from_rows([0.0, 0.0, 2.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0])),
    ((0, 3), from_rows([0.0, -2.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
    ((1, 2), from_rows([0.0, -2.0, 0.0, -2.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
    ((1, 3), from_rows([0.0, 0.0, -2.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0])),
    ((2, 3), from_rows([0.0, 0.0, 0.0, 0.0, 0.0, -2.0, 0.0, -2.0, 0.0])),
];

fn quaternion_matrix_derivative() -> [[Tensor3; 4]; 4] {
    let mut dm = [[tensor::ZERO; 4]; 4];
    for ((j, k), t) in DM_DRR01_UPPER {
        dm[j][k] = t;
        dm[k][j] = t;
    }
    dm
}

/// `∂R_ab/∂rr01`, indexed `[a][b]`, each entry a tensor over `rr01`.
///
/// Undefined (infinite) when the lowest eigenvalue is degenerate.
fn rotation_derivative_wrt_covariance(eig: &SymmetricEigen4) -> [[Tensor3; 3]; 3] {
    let q = &eig.vectors[0];
    let dm = quaternion_matrix_derivative();

    // dq_i/dm_jk = Σ_{l>0} v_l[i] v_l[j] q_k / (λ_0 − λ_l)
    let mut dq_drr01 = [tensor::ZERO; 4];
    for (i, dq) in dq_drr01.iter_mut().enumerate() {
        for j in 0..4 {
            for k in 0..4 {
                let mut dq_dm = 0.0;
                for l in 1..4 {
                    dq_dm += eig.vectors[l][j] * eig.vectors[l][i] * q[k]
                        / (eig.values[0] - eig.values[l]);
                }
                tensor::add_scaled(dq, &dm[j][k], dq_dm);
            }
        }
    }

    // d(q_a q_b) = q_a dq_b + dq_a q_b
    let dqq = |a: usize, b: usize| {
        let mut t = tensor::ZERO;
        tensor::add_scaled(&mut t, &dq_drr01[b], q[a]);
        tensor::add_scaled(&mut t, &dq_drr01[a], q[b]);
        t
    };
    let combine = |terms: &[(f64, Tensor3)]| {
        let mut t = tensor::ZERO;
        for (s, term) in terms {
            tensor::add_scaled(&mut t, term, *s);
        }
        t
    };

    let mut d = [[tensor::ZERO; 3]; 3];
    d[0][0] = combine(&[(1.0, dqq(0, 0)), (1.0, dqq(1, 1)), (-1.0, dqq(2, 2)), (-1.0, dqq(3, 3))]);
    d[1][1] = combine(&[(1.0, dqq(0, 0)), (-1.0, dqq(1, 1)), (1.0, dqq(2, 2)), (-1.0, dqq(3, 3))]);
    d[2][2] = combine(&[(1.0, dqq(0, 0)), (-1.0, dqq(1, 1)), (-1.0, dqq(2, 2)), (1.0, dqq(3, 3))]);
    d[0][1] = combine(&[(2.0, dqq(0, 3)), (2.0, dqq(1, 2))]);
    d[0][2] = combine(&[(-2.0, dqq(0, 2)), (2.0, dqq(1, 3))]);
    d[1][2] = combine(&[(2.0, dqq(0, 1)), (2.0, dqq(2, 3))]);
    d[1][0] = combine(&[(-2.0, dqq(0, 3)), (2.0, dqq(1, 2))]);
    d[2][0] = combine(&[(2.0, dqq(0, 2)), (2.0, dqq(1, 3))]);
    d[2][1] = combine(&[(-2.0, dqq(0, 1)), (2.0, dqq(2, 3))]);
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.3, 0.2, 1.0),
        ]
    }

    fn rotate_z90(points: &[Vec3]) -> Vec<Vec3> {
        points.iter().map(|p| Vec3::new(-p.y, p.x, p.z)).collect()
    }

    fn assert_tensor_eq(a: &Tensor3, b: &Tensor3, tol: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (a[i][j] - b[i][j]).abs() < tol,
                    "[{i}][{j}]: {} vs {}",
                    a[i][j],
                    b[i][j]
                );
            }
        }
    }

    #[test]
    fn test_identity_case() {
        let points = tetrahedron();
        let w = vec![0.2; 5];
        let opts = AlignOptions {
            squared: true,
            ..Default::default()
        };
        let result = align(&points, &points, &w, &w, opts).unwrap();
        assert!(result.distance < 1e-12, "MSD should be ~0, got {}", result.distance);
        assert_tensor_eq(&result.rotation, &tensor::IDENTITY, 1e-8);
        assert!(result.used_shortcut);
    }

    #[test]
    fn test_two_point_scenario() {
        let points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let w = vec![0.5, 0.5];
        let opts = AlignOptions {
            squared: true,
            ..Default::default()
        };
        let result = align(&points, &points, &w, &w, opts).unwrap();
        assert_eq!(result.distance, 0.0);
        assert_tensor_eq(&result.rotation, &tensor::IDENTITY, 1e-15);
        for d in &result.derivatives {
            assert_eq!(d.magnitude_squared(), 0.0);
        }
    }

    #[test]
    fn test_known_rotation() {
        let reference = tetrahedron();
        let moving = rotate_z90(&reference);
        let w = vec![0.2; 5];
        let result = align(&moving, &reference, &w, &w, AlignOptions::default()).unwrap();
        let expected = from_rows([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_tensor_eq(&result.rotation, &expected, 1e-8);
        assert!(result.msd < 1e-12);
    }

    #[test]
    fn test_translation_invariance() {
        let reference = tetrahedron();
        let moving: Vec<Vec3> = rotate_z90(&reference)
            .iter()
            .enumerate()
            .map(|(i, p)| *p + Vec3::new(0.1 * i as f64, -0.05, 0.02 * i as f64))
            .collect();
        let shifted: Vec<Vec3> = moving.iter().map(|p| *p + Vec3::new(5.0, -3.0, 1.5)).collect();
        let w = vec![0.1, 0.3, 0.2, 0.15, 0.25];
        let u = vec![0.3, 0.1, 0.2, 0.2, 0.2];
        let a = align(&moving, &reference, &w, &u, AlignOptions::default()).unwrap();
        let b = align(&shifted, &reference, &w, &u, AlignOptions::default()).unwrap();
        assert!((a.distance - b.distance).abs() < 1e-10);
        assert_tensor_eq(&a.rotation, &b.rotation, 1e-10);
    }

    #[test]
    fn test_eigenvalue_and_direct_deviation_agree() {
        let reference = tetrahedron();
        let moving = vec![
            Vec3::new(0.9, 0.1, 0.0),
            Vec3::new(-0.2, 1.8, 0.3),
            Vec3::new(-1.1, -0.2, 0.4),
            Vec3::new(0.1, -0.9, -0.2),
            Vec3::new(0.2, 0.4, 1.1),
        ];
        let w = vec![0.2; 5];
        let safe = AlignOptions {
            squared: true,
            ..Default::default()
        };
        let fast = AlignOptions { safe: false, ..safe };
        let a = align(&moving, &reference, &w, &w, safe).unwrap();
        let b = align(&moving, &reference, &w, &w, fast).unwrap();
        assert!((a.msd - b.msd).abs() < 1e-12, "{} vs {}", a.msd, b.msd);
        assert!((b.msd - (b.eigenvalues[0] + b.rr00 + b.rr11)).abs() < 1e-12);
    }

    #[test]
    fn test_aligned_positions_match_reference_frame() {
        let reference = tetrahedron();
        let moving = rotate_z90(&reference);
        let w = vec![0.2; 5];
        let result = align(&moving, &reference, &w, &w, AlignOptions::default()).unwrap();
        for (a, z) in result.aligned_positions().iter().zip(&result.centered_reference) {
            assert!((*a - *z).magnitude() < 1e-8);
        }
    }

    #[test]
    fn test_rotation_derivative_only_on_request() {
        let reference = tetrahedron();
        let moving = rotate_z90(&reference);
        let w = vec![0.2; 5];
        let plain = align(&moving, &reference, &w, &w, AlignOptions::default()).unwrap();
        assert!(plain.rotation_derivative.is_none());

        let opts = AlignOptions {
            rotation_derivative: true,
            ..Default::default()
        };
        let with = align(&moving, &reference, &w, &w, opts).unwrap();
        let drot = with.rotation_derivative.unwrap();
        assert_eq!(drot.len(), 5);
    }

    #[test]
    fn test_length_mismatch() {
        let a = vec![Vec3::new_zero(); 5];
        let b = vec![Vec3::new_zero(); 4];
        let w = vec![1.0; 4];
        assert_eq!(
            align(&a, &b, &w, &w, AlignOptions::default()).unwrap_err(),
            AlignError::LengthMismatch(5, 4)
        );
    }

    #[test]
    fn test_non_finite_moving_point_fails_diagonalization() {
        let reference = tetrahedron();
        let mut moving = rotate_z90(&reference);
        moving[2].x = f64::NAN;
        let w = vec![0.2; 5];
        let err = align(&moving, &reference, &w, &w, AlignOptions::default()).unwrap_err();
        assert_eq!(err, AlignError::DiagonalizationFailed(-1));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_quaternion_matrix_is_traceless() {
        let rr01 = from_rows([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let m = quaternion_matrix(&rr01);
        let trace: f64 = (0..4).map(|i| m[i][i]).sum();
        assert!(trace.abs() < 1e-12);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }
}
