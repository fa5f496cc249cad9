//! PDB record types

use lin_alg::f64::Vec3;

/// Parsed ATOM or HETATM record
#[derive(Debug, Clone, PartialEq)]
pub struct PdbAtom {
    /// Atom serial number, used as the point identity
    pub serial: usize,
    /// Coordinates, already multiplied by the reader's length scale
    pub position: Vec3,
    /// Occupancy column; alignment weight for reference structures
    pub occupancy: f64,
    /// Temperature factor column; displacement weight for reference structures
    pub b_factor: f64,
}

/// Atoms between two END/ENDMDL records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbFrame {
    pub atoms: Vec<PdbAtom>,
}

impl PdbFrame {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn serials(&self) -> Vec<usize> {
        self.atoms.iter().map(|a| a.serial).collect()
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn occupancies(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.occupancy).collect()
    }

    pub fn b_factors(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.b_factor).collect()
    }
}
