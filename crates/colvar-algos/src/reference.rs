//! Immutable weighted reference structures

use lin_alg::f64::Vec3;
use serde::{Deserialize, Serialize};

use crate::{AlignError, AlignResult};

/// How reference weights and positions are prepared at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceOptions {
    /// Divide each weight vector by its own sum
    pub normalize_weights: bool,
    /// Translate the reference so its alignment-weighted centroid is the origin
    pub reset_com: bool,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            normalize_weights: true,
            reset_com: true,
        }
    }
}

/// Reference point set with alignment and displacement weights.
///
/// Built once and never mutated; evaluations only borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceStructure {
    positions: Vec<Vec3>,
    align: Vec<f64>,
    displace: Vec<f64>,
    atom_ids: Vec<usize>,
    al_eq_dis: bool,
}

impl ReferenceStructure {
    /// Validate and prepare a reference structure.
    ///
    /// `align` weights drive the centroids and the rotational fit,
    /// `displace` weights the accumulated deviation.
    pub fn new(
        mut positions: Vec<Vec3>,
        mut align: Vec<f64>,
        mut displace: Vec<f64>,
        options: ReferenceOptions,
    ) -> AlignResult<Self> {
        let n = positions.len();
        if n == 0 {
            return Err(AlignError::NoAtoms);
        }
        check_finite(&positions)?;
        let align_total = checked_total(&align, n)?;
        let displace_total = checked_total(&displace, n)?;

        if options.normalize_weights {
            align.iter_mut().for_each(|w| *w /= align_total);
            displace.iter_mut().for_each(|w| *w /= displace_total);
        }

        if options.reset_com {
            let total: f64 = align.iter().sum();
            let center = weighted_centroid(&positions, &align, total);
            for p in positions.iter_mut() {
                *p = *p - center;
            }
        }

        let al_eq_dis = align == displace;
        log::debug!(
            "Reference with {} atoms (normalized: {}, centered: {}, align == displace: {})",
            n,
            options.normalize_weights,
            options.reset_com,
            al_eq_dis
        );

        Ok(Self {
            positions,
            align,
            displace,
            atom_ids: (1..=n).collect(),
            al_eq_dis,
        })
    }

    /// Reference with unit alignment and displacement weights
    pub fn uniform(positions: Vec<Vec3>, options: ReferenceOptions) -> AlignResult<Self> {
        let n = positions.len();
        Self::new(positions, vec![1.0; n], vec![1.0; n], options)
    }

    /// Replace the default `1..=N` point identities (e.g. with atom serials)
    pub fn with_atom_ids(mut self, atom_ids: Vec<usize>) -> AlignResult<Self> {
        if atom_ids.len() != self.positions.len() {
            return Err(AlignError::LengthMismatch(atom_ids.len(), self.positions.len()));
        }
        self.atom_ids = atom_ids;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn align_weights(&self) -> &[f64] {
        &self.align
    }

    pub fn displace_weights(&self) -> &[f64] {
        &self.displace
    }

    pub fn atom_ids(&self) -> &[usize] {
        &self.atom_ids
    }

    /// Whether alignment and displacement weights are pointwise equal
    pub fn al_eq_dis(&self) -> bool {
        self.al_eq_dis
    }
}

/// Weighted mean `Σ w_i x_i / total`
pub(crate) fn weighted_centroid(points: &[Vec3], weights: &[f64], total: f64) -> Vec3 {
    let mut sum = Vec3::new_zero();
    for (p, &w) in points.iter().zip(weights) {
        sum += *p * w;
    }
    sum * (1.0 / total)
}

/// Reject NaN or infinite components
pub(crate) fn check_finite(points: &[Vec3]) -> AlignResult<()> {
    match points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        Some(index) => Err(AlignError::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

fn checked_total(weights: &[f64], n: usize) -> AlignResult<f64> {
    if weights.len() != n {
        return Err(AlignError::WeightCount {
            expected: n,
            actual: weights.len(),
        });
    }
    if let Some((index, &value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(AlignError::InvalidWeight { index, value });
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(AlignError::ZeroTotalWeight);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
        ]
    }

    #[test]
    fn test_normalizes_each_weight_vector() {
        let r = ReferenceStructure::new(
            points(),
            vec![1.0, 1.0, 2.0],
            vec![3.0, 3.0, 6.0],
            ReferenceOptions::default(),
        )
        .unwrap();
        assert_eq!(r.align_weights(), &[0.25, 0.25, 0.5]);
        assert_eq!(r.displace_weights(), &[0.25, 0.25, 0.5]);
        assert!(r.al_eq_dis());
    }

    #[test]
    fn test_reset_com_centers_on_alignment_weights() {
        let r = ReferenceStructure::new(
            points(),
            vec![1.0, 1.0, 2.0],
            vec![1.0, 0.0, 0.0],
            ReferenceOptions::default(),
        )
        .unwrap();
        let c = weighted_centroid(r.positions(), r.align_weights(), 1.0);
        assert!(c.magnitude_squared() < 1e-24);
        assert!(!r.al_eq_dis());
    }

    #[test]
    fn test_keeps_raw_input_when_disabled() {
        let opts = ReferenceOptions {
            normalize_weights: false,
            reset_com: false,
        };
        let r = ReferenceStructure::new(points(), vec![2.0; 3], vec![2.0; 3], opts).unwrap();
        assert_eq!(r.align_weights(), &[2.0; 3]);
        assert_eq!(r.positions()[1].x, 2.0);
        assert_eq!(r.atom_ids(), &[1, 2, 3]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let opts = ReferenceOptions::default();
        assert_eq!(
            ReferenceStructure::new(vec![], vec![], vec![], opts),
            Err(AlignError::NoAtoms)
        );
        assert_eq!(
            ReferenceStructure::new(points(), vec![1.0; 2], vec![1.0; 3], opts),
            Err(AlignError::WeightCount {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            ReferenceStructure::new(points(), vec![1.0, -1.0, 1.0], vec![1.0; 3], opts),
            Err(AlignError::InvalidWeight {
                index: 1,
                value: -1.0
            })
        );
        assert_eq!(
            ReferenceStructure::new(points(), vec![1.0; 3], vec![0.0; 3], opts),
            Err(AlignError::ZeroTotalWeight)
        );
    }

    #[test]
    fn test_rejects_non_finite_positions() {
        let opts = ReferenceOptions::default();
        let mut p = points();
        p[1].y = f64::NAN;
        let err = ReferenceStructure::uniform(p, opts).unwrap_err();
        assert_eq!(err, AlignError::NonFiniteCoordinate { index: 1 });
        assert!(err.is_configuration());

        let mut p = points();
        p[2].z = f64::INFINITY;
        assert_eq!(
            ReferenceStructure::new(p, vec![1.0; 3], vec![1.0; 3], opts),
            Err(AlignError::NonFiniteCoordinate { index: 2 })
        );
    }

    #[test]
    fn test_atom_ids_must_match_length() {
        let r = ReferenceStructure::uniform(points(), ReferenceOptions::default()).unwrap();
        assert!(r.clone().with_atom_ids(vec![10, 20]).is_err());
        let r = r.with_atom_ids(vec![10, 20, 30]).unwrap();
        assert_eq!(r.atom_ids(), &[10, 20, 30]);
    }
}
