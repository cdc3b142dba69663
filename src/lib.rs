//! Excitation–emission spectral phasor analysis and unmixing.
//!
//! The crate turns two-dimensional excitation–emission intensity maps into
//! phasor coordinates (an intensity-weighted harmonic decomposition reduced
//! to a single `(G, S)` point per spectrum) and unmixes measured spectra
//! into per-component fractions by solving small linear systems built from
//! reference phasor coordinates.
//!
//! Everything here is pure data-in/data-out: plotting, dialogs and file
//! choosers live in downstream applications that pull from this API.

pub mod data;
pub mod logging;
pub mod math;
pub mod unmix;

pub use data::assay::{Harmonic, MarkerShape, Phasor, PhasorAssay, RangeTriple, ZoomWindow};
pub use data::model::{RawGrid, Spectrum, XUnit};
pub use unmix::equation::{Axis, EquationKind, LinearEquation};
pub use unmix::reference::{HarmonicSlot, ReferencePoint};
pub use unmix::solver::{SolveError, SystemState, UnmixingModel, UnmixingSolver};

/// A displayable name, the one capability shared by every entity a list
/// widget or legend might show (spectra, assays, reference points,
/// equations).
pub trait DisplayName {
    fn display_name(&self) -> String;
}
