//! 3×3 row-major tensor utilities
//!
//! Tensors are stored as `t[row][col]`. Vectors use `lin_alg::f64::Vec3`;
//! the helpers here convert between the two where index access is needed.

use lin_alg::f64::Vec3;

/// Row-major 3×3 tensor: `t[row][col]`
pub type Tensor3 = [[f64; 3]; 3];

pub const ZERO: Tensor3 = [[0.0; 3]; 3];

pub const IDENTITY: Tensor3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Components of a vector as an array, for index access
#[inline]
pub fn to_array(v: Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[inline]
pub fn from_array(a: [f64; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

/// Build a tensor from nine values given row by row
pub const fn from_rows(v: [f64; 9]) -> Tensor3 {
    [[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]]
}

/// Outer product `a ⊗ b`: `t[i][j] = a_i · b_j`
pub fn outer(a: Vec3, b: Vec3) -> Tensor3 {
    let a = to_array(a);
    let b = to_array(b);
    let mut t = ZERO;
    for i in 0..3 {
        for j in 0..3 {
            t[i][j] = a[i] * b[j];
        }
    }
    t
}

/// `t · v`
pub fn matvec(t: &Tensor3, v: Vec3) -> Vec3 {
    Vec3::new(
        t[0][0] * v.x + t[0][1] * v.y + t[0][2] * v.z,
        t[1][0] * v.x + t[1][1] * v.y + t[1][2] * v.z,
        t[2][0] * v.x + t[2][1] * v.y + t[2][2] * v.z,
    )
}

/// `tᵀ · v`, without building the transpose
pub fn transpose_matvec(t: &Tensor3, v: Vec3) -> Vec3 {
    Vec3::new(
        t[0][0] * v.x + t[1][0] * v.y + t[2][0] * v.z,
        t[0][1] * v.x + t[1][1] * v.y + t[2][1] * v.z,
        t[0][2] * v.x + t[1][2] * v.y + t[2][2] * v.z,
    )
}

pub fn transpose(t: &Tensor3) -> Tensor3 {
    [
        [t[0][0], t[1][0], t[2][0]],
        [t[0][1], t[1][1], t[2][1]],
        [t[0][2], t[1][2], t[2][2]],
    ]
}

/// `a · b`
pub fn matmul(a: &Tensor3, b: &Tensor3) -> Tensor3 {
    let mut c = ZERO;
    for i in 0..3 {
        for j in 0..3 {
            c[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    c
}

pub fn determinant(t: &Tensor3) -> f64 {
    t[0][0] * (t[1][1] * t[2][2] - t[1][2] * t[2][1])
        - t[0][1] * (t[1][0] * t[2][2] - t[1][2] * t[2][0])
        + t[0][2] * (t[1][0] * t[2][1] - t[1][1] * t[2][0])
}

/// `acc += s · t`
pub fn add_scaled(acc: &mut Tensor3, t: &Tensor3, s: f64) {
    for i in 0..3 {
        for j in 0..3 {
            acc[i][j] += s * t[i][j];
        }
    }
}

/// Full contraction `Σ_ij a_ij · b_ij`
pub fn contract(a: &Tensor3, b: &Tensor3) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            sum += a[i][j] * b[i][j];
        }
    }
    sum
}

/// Rotation tensor of a unit quaternion `(q0, q1, q2, q3)`.
///
/// This is the rotation that carries the reference frame onto the moving
/// frame for the quaternion matrix built in [`crate::align::core`]; `q` and
/// `-q` give the same tensor.
pub fn rotation_from_quaternion(q: &[f64; 4]) -> Tensor3 {
    let mut r = ZERO;
    r[0][0] = q[0] * q[0] + q[1] * q[1] - q[2] * q[2] - q[3] * q[3];
    r[1][1] = q[0] * q[0] - q[1] * q[1] + q[2] * q[2] - q[3] * q[3];
    r[2][2] = q[0] * q[0] - q[1] * q[1] - q[2] * q[2] + q[3] * q[3];
    r[0][1] = 2.0 * (q[0] * q[3] + q[1] * q[2]);
    r[0][2] = 2.0 * (-q[0] * q[2] + q[1] * q[3]);
    r[1][2] = 2.0 * (q[0] * q[1] + q[2] * q[3]);
    r[1][0] = 2.0 * (-q[0] * q[3] + q[1] * q[2]);
    r[2][0] = 2.0 * (q[0] * q[2] + q[1] * q[3]);
    r[2][1] = 2.0 * (-q[0] * q[1] + q[2] * q[3]);
    r
}
