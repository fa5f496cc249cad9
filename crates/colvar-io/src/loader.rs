//! Build validated reference types from parsed PDB frames
//!
//! Occupancy becomes the alignment weight and the B-factor the displacement
//! weight; atom serials become point identities.

use std::path::Path;

use colvar_algos::{
    BasisFrame, ComponentBasis, ComponentProjector, MultiReference, ReferenceOptions,
    ReferenceStructure, RmsdConfig, RmsdMetric,
};

use crate::error::{IoError, IoResult};
use crate::pdb::{read_pdb, PdbFrame, ReadOptions};

/// Reference structure from one frame
pub fn reference_from_frame(
    frame: &PdbFrame,
    options: ReferenceOptions,
) -> IoResult<ReferenceStructure> {
    let reference = ReferenceStructure::new(
        frame.positions(),
        frame.occupancies(),
        frame.b_factors(),
        options,
    )?
    .with_atom_ids(frame.serials())?;
    Ok(reference)
}

/// PCA average structure from one frame; its weight columns are ignored
/// and every atom carries unit weight
pub fn average_from_frame(frame: &PdbFrame) -> IoResult<ReferenceStructure> {
    let average = ReferenceStructure::uniform(frame.positions(), ReferenceOptions::default())?
        .with_atom_ids(frame.serials())?;
    Ok(average)
}

/// Basis fields from consecutive frames; each frame's coordinates are one
/// displacement field
pub fn basis_from_frames(frames: &[PdbFrame]) -> IoResult<ComponentBasis> {
    let fields = frames
        .iter()
        .map(|frame| BasisFrame::new(frame.serials(), frame.positions()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ComponentBasis::new(fields)?)
}

/// Reference structure from the first frame of a PDB file
pub fn load_reference(
    path: &Path,
    read_options: ReadOptions,
    options: ReferenceOptions,
) -> IoResult<ReferenceStructure> {
    let frames = read_pdb(path, read_options)?;
    let first = frames.first().ok_or(IoError::EmptyFile)?;
    if frames.len() > 1 {
        log::debug!(
            "{}: using the first of {} frames as reference",
            path.display(),
            frames.len()
        );
    }
    reference_from_frame(first, options)
}

/// RMSD metric against the first frame of a PDB file
pub fn load_metric(
    path: &Path,
    read_options: ReadOptions,
    config: &RmsdConfig,
) -> IoResult<RmsdMetric> {
    let reference = load_reference(path, read_options, config.reference_options())?;
    Ok(RmsdMetric::from_config(config, reference))
}

/// One metric per frame of a PDB file, all with unit frame weight
pub fn load_multi_reference(
    path: &Path,
    read_options: ReadOptions,
    config: &RmsdConfig,
) -> IoResult<MultiReference> {
    let frames = read_pdb(path, read_options)?;
    if frames.is_empty() {
        return Err(IoError::EmptyFile);
    }
    let mut multi = MultiReference::new();
    for frame in &frames {
        let reference = reference_from_frame(frame, config.reference_options())?;
        multi.add_frame(RmsdMetric::from_config(config, reference));
    }
    log::debug!("{}: {} reference frames", path.display(), multi.len());
    Ok(multi)
}

/// Basis fields from every frame of a PDB file
pub fn load_components(path: &Path, read_options: ReadOptions) -> IoResult<ComponentBasis> {
    let frames = read_pdb(path, read_options)?;
    log::debug!("{}: found {} component frames", path.display(), frames.len());
    basis_from_frames(&frames)
}

/// Projector from an average structure file and a basis file
pub fn load_projector(
    average: &Path,
    components: &Path,
    read_options: ReadOptions,
) -> IoResult<ComponentProjector> {
    let frames = read_pdb(average, read_options)?;
    let average = average_from_frame(frames.first().ok_or(IoError::EmptyFile)?)?;
    let basis = load_components(components, read_options)?;
    Ok(ComponentProjector::new(average, basis)?)
}
