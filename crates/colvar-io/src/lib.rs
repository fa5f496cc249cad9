//! Reference data ingestion for structural collective variables
//!
//! Reads the files that define a collective variable once, before any
//! evaluation:
//!
//! - **Reference structures** - PDB frames whose occupancy and B-factor
//!   columns carry the alignment and displacement weights
//! - **Basis files** - consecutive PDB frames, one displacement field each,
//!   all over the same atoms in the same order
//!
//! Files may be gzip-compressed; compression is detected from the content.
//!
//! # Quick Start
//!
//! ```no_run
//! use colvar_algos::RmsdConfig;
//! use colvar_io::{load_metric, ReadOptions};
//! use std::path::Path;
//!
//! let metric = load_metric(
//!     Path::new("reference.pdb"),
//!     ReadOptions::default(),
//!     &RmsdConfig::default(),
//! )
//! .unwrap();
//! println!("{} atoms", metric.reference().len());
//! ```

pub mod compress;
pub mod error;
pub mod loader;
pub mod pdb;

// Re-exports
pub use error::{IoError, IoResult};
pub use loader::{
    average_from_frame, basis_from_frames, load_components, load_metric, load_multi_reference,
    load_projector, load_reference, reference_from_frame,
};
pub use pdb::{read_pdb, read_pdb_from, read_pdb_str, PdbAtom, PdbFrame, PdbReader, ReadOptions};
