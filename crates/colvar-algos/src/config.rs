//! RMSD metric configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reference::ReferenceOptions;
use crate::AlignError;

/// How the moving structure is fitted to the reference before measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlignmentKind {
    /// Translation-only fit (centroids superposed, no rotation)
    Simple,
    /// Full roto-translational fit
    #[default]
    Optimal,
}

impl AlignmentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlignmentKind::Simple => "SIMPLE",
            AlignmentKind::Optimal => "OPTIMAL",
        }
    }
}

impl fmt::Display for AlignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlignmentKind {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(AlignmentKind::Simple),
            "OPTIMAL" => Ok(AlignmentKind::Optimal),
            _ => Err(AlignError::UnknownMetric(s.to_string())),
        }
    }
}

/// Settings for an RMSD metric against one reference structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmsdConfig {
    /// Fit policy
    #[serde(rename = "type")]
    pub kind: AlignmentKind,
    /// Report MSD instead of RMSD by default
    pub squared: bool,
    /// Take the optimal-fit deviation from the eigenvalue instead of
    /// recomputing it from the displacements
    pub fast: bool,
    /// Divide alignment and displacement weights by their sums
    pub normalize_weights: bool,
    /// Center the reference on its alignment-weighted centroid
    pub reset_com: bool,
}

impl Default for RmsdConfig {
    fn default() -> Self {
        Self {
            kind: AlignmentKind::Optimal,
            squared: false,
            fast: false,
            normalize_weights: true,
            reset_com: true,
        }
    }
}

impl RmsdConfig {
    /// Reference preparation implied by this configuration
    pub fn reference_options(&self) -> ReferenceOptions {
        ReferenceOptions {
            normalize_weights: self.normalize_weights,
            reset_com: self.reset_com,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("OPTIMAL".parse::<AlignmentKind>().unwrap(), AlignmentKind::Optimal);
        assert_eq!("simple".parse::<AlignmentKind>().unwrap(), AlignmentKind::Simple);
        assert_eq!(
            "DRMSD".parse::<AlignmentKind>(),
            Err(AlignError::UnknownMetric("DRMSD".to_string()))
        );
    }

    #[test]
    fn test_kind_display_roundtrips() {
        for kind in [AlignmentKind::Simple, AlignmentKind::Optimal] {
            assert_eq!(kind.to_string().parse::<AlignmentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_config() {
        let config = RmsdConfig::default();
        assert_eq!(config.kind, AlignmentKind::Optimal);
        assert!(!config.squared);
        assert!(!config.fast);
        assert_eq!(config.reference_options(), ReferenceOptions::default());
    }
}
