//! Distance metrics against a fixed reference
//!
//! - [`SimpleRmsd`]: translation-only fit
//! - [`OptimalRmsd`]: full roto-translational fit through [`crate::align`]
//! - [`ArgumentDistance`]: Euclidean distance between argument vectors

pub mod euclidean;
pub mod optimal;
pub mod simple;

pub use euclidean::{ArgumentDistance, ArgumentValue};
pub use optimal::OptimalRmsd;
pub use simple::SimpleRmsd;

use lin_alg::f64::Vec3;

use crate::config::{AlignmentKind, RmsdConfig};
use crate::reference::ReferenceStructure;
use crate::AlignResult;

/// Distance between a configuration and the reference, with derivatives
#[derive(Debug, Clone)]
pub struct MetricValue {
    /// MSD when squared, RMSD otherwise
    pub distance: f64,
    /// `∂distance/∂x_i` for every point
    pub derivatives: Vec<Vec3>,
    /// Per-point deviation after the fit
    pub displacements: Vec<Vec3>,
}

/// RMSD metric with its fit policy chosen at construction
#[derive(Debug, Clone)]
pub enum RmsdMetric {
    Simple(SimpleRmsd),
    Optimal(OptimalRmsd),
}

impl RmsdMetric {
    /// Metric with default flags: not squared, safe deviation
    pub fn new(kind: AlignmentKind, reference: ReferenceStructure) -> Self {
        let config = RmsdConfig {
            kind,
            ..Default::default()
        };
        Self::from_config(&config, reference)
    }

    /// Metric described by `config`.
    ///
    /// The reference is taken as built; use [`RmsdConfig::reference_options`]
    /// when constructing it so that weight and centering flags agree.
    pub fn from_config(config: &RmsdConfig, reference: ReferenceStructure) -> Self {
        log::debug!(
            "{} RMSD metric over {} atoms (squared: {}, fast: {})",
            config.kind,
            reference.len(),
            config.squared,
            config.fast
        );
        match config.kind {
            AlignmentKind::Simple => RmsdMetric::Simple(SimpleRmsd::new(reference, config.squared)),
            AlignmentKind::Optimal => RmsdMetric::Optimal(OptimalRmsd::new(
                reference,
                config.squared,
                config.fast,
            )),
        }
    }

    pub fn kind(&self) -> AlignmentKind {
        match self {
            RmsdMetric::Simple(_) => AlignmentKind::Simple,
            RmsdMetric::Optimal(_) => AlignmentKind::Optimal,
        }
    }

    pub fn reference(&self) -> &ReferenceStructure {
        match self {
            RmsdMetric::Simple(m) => m.reference(),
            RmsdMetric::Optimal(m) => m.reference(),
        }
    }

    /// Whether [`RmsdMetric::calculate`] reports MSD
    pub fn squared(&self) -> bool {
        match self {
            RmsdMetric::Simple(m) => m.squared,
            RmsdMetric::Optimal(m) => m.squared,
        }
    }

    /// Distance from `positions` to the reference
    pub fn calc(&self, positions: &[Vec3], squared: bool) -> AlignResult<MetricValue> {
        match self {
            RmsdMetric::Simple(m) => m.calc(positions, squared),
            RmsdMetric::Optimal(m) => m.calc(positions, squared),
        }
    }

    /// [`RmsdMetric::calc`] with the configured `squared` flag
    pub fn calculate(&self, positions: &[Vec3]) -> AlignResult<MetricValue> {
        self.calc(positions, self.squared())
    }
}

/// Convert an MSD and its derivatives to an RMSD in place.
///
/// The derivative scale `1/(2·rmsd)` is infinite at zero distance.
pub(crate) fn to_rmsd(msd: f64, derivatives: &mut [Vec3]) -> f64 {
    let rmsd = msd.max(0.0).sqrt();
    let scale = 0.5 / rmsd;
    derivatives.iter_mut().for_each(|d| *d = *d * scale);
    rmsd
}
