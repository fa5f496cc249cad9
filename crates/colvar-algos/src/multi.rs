//! Ordered collections of weighted reference frames

use lin_alg::f64::Vec3;

use crate::metric::{MetricValue, RmsdMetric};
use crate::{AlignError, AlignResult};

/// Reference frames, each with its own metric and a frame weight
#[derive(Debug, Clone, Default)]
pub struct MultiReference {
    frames: Vec<RmsdMetric>,
    weights: Vec<f64>,
}

impl MultiReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame with weight 1; returns its index
    pub fn add_frame(&mut self, metric: RmsdMetric) -> usize {
        self.frames.push(metric);
        self.weights.push(1.0);
        self.frames.len() - 1
    }

    pub fn set_weight(&mut self, index: usize, weight: f64) -> AlignResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AlignError::InvalidWeight {
                index,
                value: weight,
            });
        }
        let len = self.frames.len();
        let slot = self
            .weights
            .get_mut(index)
            .ok_or(AlignError::FrameOutOfRange(index, len))?;
        *slot = weight;
        Ok(())
    }

    pub fn frame(&self, index: usize) -> Option<&RmsdMetric> {
        self.frames.get(index)
    }

    pub fn weight(&self, index: usize) -> Option<f64> {
        self.weights.get(index).copied()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn frames(&self) -> impl Iterator<Item = &RmsdMetric> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Distance from `positions` to frame `index`
    pub fn calc_distance_from(
        &self,
        index: usize,
        positions: &[Vec3],
        squared: bool,
    ) -> AlignResult<MetricValue> {
        self.frames
            .get(index)
            .ok_or(AlignError::FrameOutOfRange(index, self.frames.len()))?
            .calc(positions, squared)
    }

    /// Symmetric table of distances between every pair of stored frames.
    ///
    /// Entry `[i][j]` evaluates frame `j`'s reference positions with frame
    /// `i`'s metric; the upper triangle is computed and mirrored.
    pub fn all_distances(&self, squared: bool) -> AlignResult<Vec<Vec<f64>>> {
        let n = self.frames.len();
        let mut table = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let other = self.frames[j].reference().positions();
                let d = self.frames[i].calc(other, squared)?.distance;
                table[i][j] = d;
                table[j][i] = d;
            }
        }
        log::debug!("Computed {}x{} frame distance table", n, n);
        Ok(table)
    }
}
