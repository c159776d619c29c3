//! Acquisition geometry: source/receiver coordinates, wavelets, and the
//! per-supersource work package handed to a worker (spec.md §3, §6).

use crate::errors::*;

/// A single point location in physical-domain coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub z: f64,
    pub x: f64,
}

/// Which field a receiver records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Pressure,
    Vx,
    Vz,
}

/// One supersource: a set of simultaneously-fired sources and the receivers
/// that record its response. Supersources are the unit of parallel dispatch
/// (spec.md §5); nothing about one supersource depends on another.
#[derive(Debug, Clone)]
pub struct Supersource {
    pub sources: Vec<Point>,
    /// One wavelet per source, sampled at the simulation time step, equal
    /// length to the run's `nt`.
    pub wavelets: Vec<Vec<f64>>,
    pub receivers: Vec<Point>,
    /// Which fields each receiver records; same length as `receivers`.
    pub record_fields: Vec<RecordField>,
    /// Receiver-residual forcing for the adjoint pass, one wavelet per
    /// entry in `receivers`. Empty means this supersource contributes no
    /// gradient (a plain forward-only run).
    pub adjoint_wavelets: Vec<Vec<f64>>,
}

impl Supersource {
    pub fn validate(&self, nt: usize) -> Result<()> {
        if self.sources.len() != self.wavelets.len() {
            bail!(ErrorKind::ConfigError(format!(
                "{} sources but {} wavelets",
                self.sources.len(),
                self.wavelets.len()
            )));
        }
        if self.receivers.len() != self.record_fields.len() {
            bail!(ErrorKind::ConfigError(format!(
                "{} receivers but {} record field tags",
                self.receivers.len(),
                self.record_fields.len()
            )));
        }
        if !self.adjoint_wavelets.is_empty() && self.adjoint_wavelets.len() != self.receivers.len() {
            bail!(ErrorKind::ConfigError(format!(
                "{} adjoint wavelets but {} receivers",
                self.adjoint_wavelets.len(),
                self.receivers.len()
            )));
        }
        for w in self.wavelets.iter().chain(self.adjoint_wavelets.iter()) {
            if w.len() != nt {
                bail!(ErrorKind::ConfigError(format!(
                    "wavelet length {} does not match run length nt={}",
                    w.len(),
                    nt
                )));
            }
        }
        if self.sources.is_empty() {
            bail!(ErrorKind::ConfigError("supersource has no sources".to_string()));
        }
        Ok(())
    }

    /// Whether this supersource should drive an adjoint pass and
    /// contribute to the gradient accumulator.
    pub fn wants_gradient(&self) -> bool {
        !self.adjoint_wavelets.is_empty()
    }
}

/// A full acquisition geometry: every supersource in the experiment.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionGeometry {
    pub supersources: Vec<Supersource>,
}

impl AcquisitionGeometry {
    pub fn validate(&self, nt: usize) -> Result<()> {
        if self.supersources.is_empty() {
            bail!(ErrorKind::ConfigError("acquisition geometry has no supersources".to_string()));
        }
        for s in &self.supersources {
            s.validate(nt)?;
        }
        Ok(())
    }
}
