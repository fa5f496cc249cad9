//! RMSD after the optimal rotation and translation

use lin_alg::f64::Vec3;

use super::MetricValue;
use crate::align::{align_to, AlignOptions, Alignment};
use crate::reference::ReferenceStructure;
use crate::AlignResult;

/// Kabsch-style RMSD; picks the equal-weights gradient automatically
#[derive(Debug, Clone)]
pub struct OptimalRmsd {
    reference: ReferenceStructure,
    pub(crate) squared: bool,
    fast: bool,
}

impl OptimalRmsd {
    /// `fast` takes the deviation from the lowest eigenvalue instead of
    /// recomputing it from the displacements
    pub fn new(reference: ReferenceStructure, squared: bool, fast: bool) -> Self {
        Self {
            reference,
            squared,
            fast,
        }
    }

    pub fn reference(&self) -> &ReferenceStructure {
        &self.reference
    }

    pub fn is_fast(&self) -> bool {
        self.fast
    }

    fn options(&self, squared: bool) -> AlignOptions {
        AlignOptions {
            squared,
            safe: !self.fast,
            ..Default::default()
        }
    }

    pub fn calc(&self, positions: &[Vec3], squared: bool) -> AlignResult<MetricValue> {
        let alignment = self.align(positions, squared)?;
        Ok(MetricValue {
            distance: alignment.distance,
            derivatives: alignment.derivatives,
            displacements: alignment.displacements,
        })
    }

    /// Full alignment result, for callers that need the rotation as well
    pub fn align(&self, positions: &[Vec3], squared: bool) -> AlignResult<Alignment> {
        align_to(&self.reference, positions, self.options(squared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceOptions;
    use crate::AlignError;

    fn reference() -> ReferenceStructure {
        ReferenceStructure::uniform(
            vec![
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(-1.0, 0.0, 0.5),
                Vec3::new(0.0, -1.0, 0.0),
            ],
            ReferenceOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rotated_copy_is_zero() {
        let metric = OptimalRmsd::new(reference(), true, false);
        let rotated: Vec<Vec3> = reference()
            .positions()
            .iter()
            .map(|p| Vec3::new(p.y, -p.x, p.z) + Vec3::new(2.0, 2.0, 2.0))
            .collect();
        let value = metric.calc(&rotated, true).unwrap();
        assert!(value.distance < 1e-12, "{}", value.distance);
    }

    #[test]
    fn test_fast_and_safe_agree() {
        let moving = vec![
            Vec3::new(0.9, 0.2, 0.1),
            Vec3::new(0.1, 1.8, -0.2),
            Vec3::new(-1.2, 0.1, 0.4),
            Vec3::new(0.2, -0.9, 0.1),
        ];
        let safe = OptimalRmsd::new(reference(), false, false);
        let fast = OptimalRmsd::new(reference(), false, true);
        assert!(fast.is_fast());
        let a = safe.calc(&moving, false).unwrap();
        let b = fast.calc(&moving, false).unwrap();
        assert!((a.distance - b.distance).abs() < 1e-10);
        for (x, y) in a.derivatives.iter().zip(&b.derivatives) {
            assert!((*x - *y).magnitude() < 1e-8);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let metric = OptimalRmsd::new(reference(), true, false);
        assert_eq!(
            metric.calc(&[Vec3::new_zero()], true).unwrap_err(),
            AlignError::LengthMismatch(1, 4)
        );
    }
}
