//! Principal-component projections of an aligned structure
//!
//! The moving structure is superposed on an average structure with uniform
//! weights; the aligned deviation from the average is then projected on
//! each basis field. Derivatives differentiate through the rotation.

use lin_alg::f64::Vec3;

use crate::align::{align_to, AlignOptions};
use crate::linalg::tensor;
use crate::reference::{check_finite, ReferenceOptions, ReferenceStructure};
use crate::{AlignError, AlignResult};

/// One displacement field of the basis, with the atom identities it covers
#[derive(Debug, Clone, PartialEq)]
pub struct BasisFrame {
    atom_ids: Vec<usize>,
    vectors: Vec<Vec3>,
}

impl BasisFrame {
    pub fn new(atom_ids: Vec<usize>, vectors: Vec<Vec3>) -> AlignResult<Self> {
        if atom_ids.len() != vectors.len() {
            return Err(AlignError::LengthMismatch(atom_ids.len(), vectors.len()));
        }
        check_finite(&vectors)?;
        Ok(Self { atom_ids, vectors })
    }

    pub fn atom_ids(&self) -> &[usize] {
        &self.atom_ids
    }

    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Validated, named set of basis fields over one atom list
#[derive(Debug, Clone)]
pub struct ComponentBasis {
    names: Vec<String>,
    frames: Vec<BasisFrame>,
}

impl ComponentBasis {
    /// Every frame must list the first frame's atoms, in the same order
    pub fn new(frames: Vec<BasisFrame>) -> AlignResult<Self> {
        let first = frames.first().ok_or(AlignError::NoComponents)?;
        if first.is_empty() {
            return Err(AlignError::NoAtoms);
        }
        for (component, frame) in frames.iter().enumerate().skip(1) {
            if frame.is_empty() {
                return Err(AlignError::NoAtoms);
            }
            if frame.len() != first.len() {
                return Err(AlignError::ComponentSizeMismatch {
                    component,
                    expected: first.len(),
                    actual: frame.len(),
                });
            }
            if frame.atom_ids != first.atom_ids {
                return Err(AlignError::ComponentOrderMismatch { component });
            }
        }

        let names = (0..frames.len()).map(|k| format!("pca-{}", k)).collect();
        log::debug!(
            "Component basis with {} fields over {} atoms",
            frames.len(),
            first.len()
        );
        Ok(Self { names, frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn frame(&self, index: usize) -> Option<&BasisFrame> {
        self.frames.get(index)
    }

    /// Atom identities shared by every field
    pub fn atom_ids(&self) -> &[usize] {
        self.frames.first().map(|f| f.atom_ids()).unwrap_or(&[])
    }

    /// Atoms per field
    pub fn atom_count(&self) -> usize {
        self.frames.first().map_or(0, |f| f.len())
    }
}

/// Projection on one basis field
#[derive(Debug, Clone)]
pub struct ComponentValue {
    pub name: String,
    pub value: f64,
    /// `∂value/∂x_i` for every moving point
    pub derivatives: Vec<Vec3>,
}

/// All projections from one alignment
#[derive(Debug, Clone)]
pub struct Projection {
    /// Mean square deviation from the average structure after the fit
    pub msd: f64,
    pub components: Vec<ComponentValue>,
}

/// Projects configurations on a fixed basis after aligning them to an
/// average structure
#[derive(Debug, Clone)]
pub struct ComponentProjector {
    average: ReferenceStructure,
    basis: ComponentBasis,
}

impl ComponentProjector {
    /// The average's weights are replaced by uniform ones and it is centered.
    pub fn new(average: ReferenceStructure, basis: ComponentBasis) -> AlignResult<Self> {
        if basis.atom_count() != average.len() {
            return Err(AlignError::ComponentSizeMismatch {
                component: 0,
                expected: average.len(),
                actual: basis.atom_count(),
            });
        }
        if basis.atom_ids() != average.atom_ids() {
            return Err(AlignError::ComponentOrderMismatch { component: 0 });
        }

        let average =
            ReferenceStructure::uniform(average.positions().to_vec(), ReferenceOptions::default())?
                .with_atom_ids(average.atom_ids().to_vec())?;
        log::debug!(
            "Component projector: {} components over {} atoms",
            basis.len(),
            average.len()
        );
        Ok(Self { average, basis })
    }

    pub fn average(&self) -> &ReferenceStructure {
        &self.average
    }

    pub fn basis(&self) -> &ComponentBasis {
        &self.basis
    }

    /// Project `positions` on every basis field.
    ///
    /// One alignment serves all fields. With `y_i` the centered moving
    /// points, `z_i` the centered average and `v_i` the field:
    /// `value = Σ_i (Rᵀ y_i − z_i)·v_i` and
    /// `∂value/∂x_j = Σ_ab ∂R_ab/∂x_j · Σ_n y_n[a] v_n[b] + R v_j − (1/N) Σ_n R v_n`.
    pub fn project(&self, positions: &[Vec3]) -> AlignResult<Projection> {
        let options = AlignOptions {
            squared: true,
            ..Default::default()
        };
        let alignment = align_to(&self.average, positions, options)?;
        let weights = self.average.align_weights();
        let drot = alignment.rotation_derivative_for(weights);
        let aligned = alignment.aligned_positions();
        let centered = &alignment.centered_moving;
        let rotation = &alignment.rotation;

        let components = self
            .basis
            .frames
            .iter()
            .zip(&self.basis.names)
            .map(|(frame, name)| {
                let vectors = frame.vectors();

                let mut value = 0.0;
                // Σ_n y_n ⊗ v_n, contracted with ∂R below
                let mut cross = tensor::ZERO;
                for ((a, z), (&y, &v)) in aligned
                    .iter()
                    .zip(self.average.positions())
                    .zip(centered.iter().zip(vectors))
                {
                    value += (*a - *z).dot(v);
                    tensor::add_scaled(&mut cross, &tensor::outer(y, v), 1.0);
                }

                let rotated: Vec<Vec3> =
                    vectors.iter().map(|&v| tensor::matvec(rotation, v)).collect();
                let mut mean_rotated = Vec3::new_zero();
                for (r, &w) in rotated.iter().zip(weights) {
                    mean_rotated += *r * w;
                }

                let derivatives = rotated
                    .iter()
                    .enumerate()
                    .map(|(j, &rv)| {
                        let dr = drot.at(j);
                        let mut d = rv - mean_rotated;
                        for (a, row) in dr.iter().enumerate() {
                            for (b, dab) in row.iter().enumerate() {
                                d += *dab * cross[a][b];
                            }
                        }
                        d
                    })
                    .collect();

                ComponentValue {
                    name: name.clone(),
                    value,
                    derivatives,
                }
            })
            .collect();

        log::trace!(
            "Projected {} atoms on {} components (msd = {:.6e})",
            positions.len(),
            self.basis.len(),
            alignment.msd
        );

        Ok(Projection {
            msd: alignment.msd,
            components,
        })
    }
}
