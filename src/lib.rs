//! Staggered-grid acoustic FDTD core with convolutional-PML absorbing
//! boundaries: the computational kernel of a seismic forward-modeling and
//! full-waveform-inversion toolbox.
//!
//! This crate is the propagation core only. Medium-gallery construction,
//! CLI/REPL front-ends, plotting, and file I/O (SEG-Y or otherwise) are
//! deliberately out of scope; callers hand in already-built `Medium`,
//! `AcquisitionGeometry`, and `Options` values and get back traces,
//! gradients, and illumination maps.

#[macro_use]
extern crate error_chain;

pub mod ageom;
pub mod attrib;
pub mod boundary;
pub mod born;
pub mod coupling;
pub mod errors;
pub mod experiment;
pub mod gradient;
pub mod grid;
pub mod illumination;
pub mod medium;
pub mod misfit;
pub mod options;
pub mod pml;
pub mod scheduler;
pub mod stability;
pub mod stepper;
pub mod wavefield;

pub use ageom::{AcquisitionGeometry, Point, RecordField, Supersource};
pub use attrib::AttribMod;
pub use errors::{Error, ErrorKind, Result};
pub use experiment::{build, BuildParameters, Checkpoint, Experiment, ExperimentOutput, Snapshot, Trace};
pub use grid::{Face, Grid, NPML};
pub use medium::{Medium, Perturbation};
pub use options::Options;
pub use stability::{FrequencyBand, VelocityBounds};
