//! Translation-only RMSD

use lin_alg::f64::Vec3;

use super::{to_rmsd, MetricValue};
use crate::reference::{weighted_centroid, ReferenceStructure};
use crate::{AlignError, AlignResult};

/// RMSD after superposing the alignment-weighted centroids, no rotation
#[derive(Debug, Clone)]
pub struct SimpleRmsd {
    reference: ReferenceStructure,
    pub(crate) squared: bool,
}

impl SimpleRmsd {
    pub fn new(reference: ReferenceStructure, squared: bool) -> Self {
        Self { reference, squared }
    }

    pub fn reference(&self) -> &ReferenceStructure {
        &self.reference
    }

    /// `D = Σ u_i |(x_i − a_x) − (r_i − a_r)|²` and its gradient.
    ///
    /// Moving the centroid spreads `−2 (w_j/W) Σ u_i d_i` over every point.
    pub fn calc(&self, positions: &[Vec3], squared: bool) -> AlignResult<MetricValue> {
        let reference = self.reference.positions();
        if positions.len() != reference.len() {
            return Err(AlignError::LengthMismatch(positions.len(), reference.len()));
        }
        let align = self.reference.align_weights();
        let displace = self.reference.displace_weights();

        let total: f64 = align.iter().sum();
        let moving_centroid = weighted_centroid(positions, align, total);
        let reference_centroid = weighted_centroid(reference, align, total);

        let displacements: Vec<Vec3> = positions
            .iter()
            .zip(reference)
            .map(|(&x, &r)| (x - moving_centroid) - (r - reference_centroid))
            .collect();

        let mut msd = 0.0;
        let mut weighted_sum = Vec3::new_zero();
        for (d, &u) in displacements.iter().zip(displace) {
            msd += u * d.magnitude_squared();
            weighted_sum += *d * u;
        }

        let mut derivatives: Vec<Vec3> = displacements
            .iter()
            .zip(align.iter().zip(displace))
            .map(|(&d, (&w, &u))| d * (2.0 * u) + weighted_sum * (-2.0 * w / total))
            .collect();

        let distance = if squared {
            msd
        } else {
            to_rmsd(msd, &mut derivatives)
        };
        log::trace!("Simple RMSD over {} atoms: msd = {:.6e}", positions.len(), msd);

        Ok(MetricValue {
            distance,
            derivatives,
            displacements,
        })
    }
}
