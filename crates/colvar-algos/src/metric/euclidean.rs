//! Euclidean distance in argument space

use crate::{AlignError, AlignResult};

/// Distance between a vector of scalar arguments and a reference vector
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDistance {
    reference: Vec<f64>,
}

/// Argument-space distance and `∂distance/∂arg_k`
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentValue {
    pub distance: f64,
    pub derivatives: Vec<f64>,
}

impl ArgumentDistance {
    pub fn new(reference: Vec<f64>) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &[f64] {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// `D = Σ_k (arg_k − ref_k)²`, or `sqrt(D)` when not squared
    pub fn calc(&self, args: &[f64], squared: bool) -> AlignResult<ArgumentValue> {
        if args.len() != self.reference.len() {
            return Err(AlignError::ArgumentMismatch(args.len(), self.reference.len()));
        }
        let mut distance = 0.0;
        let mut derivatives = Vec::with_capacity(args.len());
        for (&a, &r) in args.iter().zip(&self.reference) {
            let diff = a - r;
            distance += diff * diff;
            derivatives.push(2.0 * diff);
        }
        if !squared {
            distance = distance.sqrt();
            let scale = 0.5 / distance;
            derivatives.iter_mut().for_each(|d| *d *= scale);
        }
        Ok(ArgumentValue {
            distance,
            derivatives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_distance() {
        let metric = ArgumentDistance::new(vec![1.0, 2.0]);
        let value = metric.calc(&[4.0, 6.0], true).unwrap();
        assert_eq!(value.distance, 25.0);
        assert_eq!(value.derivatives, vec![6.0, 8.0]);
    }

    #[test]
    fn test_linear_distance() {
        let metric = ArgumentDistance::new(vec![1.0, 2.0]);
        let value = metric.calc(&[4.0, 6.0], false).unwrap();
        assert!((value.distance - 5.0).abs() < 1e-15);
        assert!((value.derivatives[0] - 0.6).abs() < 1e-15);
        assert!((value.derivatives[1] - 0.8).abs() < 1e-15);
    }

    #[test]
    fn test_argument_mismatch() {
        let metric = ArgumentDistance::new(vec![0.0; 3]);
        assert_eq!(
            metric.calc(&[1.0], true),
            Err(AlignError::ArgumentMismatch(1, 3))
        );
    }
}
