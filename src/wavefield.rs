//! Per-propagating-wavefield state (spec.md §3, §4.5).
//!
//! One `WavefieldState` exists per element of `npw` (1 for pure forward, 2
//! for gradient/Born). Allocated once per worker and reused across
//! supersources via `reset()`, mirroring the reuse-and-explicit-reset
//! discipline of the reference simulation's per-worker particle/rng state.

use crate::grid::Grid;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Named bundle of the three staggered field components, so inner loops
/// never index through a string-keyed map (spec.md §9 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PVelocity {
    pub p: Array2<f64>,
    pub vx: Array2<f64>,
    pub vz: Array2<f64>,
}

impl PVelocity {
    fn zeros(nz: usize, nx: usize) -> PVelocity {
        PVelocity {
            p: Array2::zeros((nz, nx)),
            vx: Array2::zeros((nz, nx)),
            vz: Array2::zeros((nz, nx)),
        }
    }

    fn reset(&mut self) {
        self.p.fill(0.);
        self.vx.fill(0.);
        self.vz.fill(0.);
    }
}

/// The four PML memory variables, recursively updated each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmlMemory {
    pub m_dpdx: Array2<f64>,
    pub m_dpdz: Array2<f64>,
    pub m_dvxdx: Array2<f64>,
    pub m_dvzdz: Array2<f64>,
}

impl PmlMemory {
    fn zeros(nz: usize, nx: usize) -> PmlMemory {
        PmlMemory {
            m_dpdx: Array2::zeros((nz, nx)),
            m_dpdz: Array2::zeros((nz, nx)),
            m_dvxdx: Array2::zeros((nz, nx)),
            m_dvzdz: Array2::zeros((nz, nx)),
        }
    }

    fn reset(&mut self) {
        self.m_dpdx.fill(0.);
        self.m_dpdz.fill(0.);
        self.m_dvxdx.fill(0.);
        self.m_dvzdz.fill(0.);
    }
}

/// Spatial-derivative scratch, recomputed every step; kept as part of the
/// state purely to avoid reallocating every call to `stepper::advance`.
#[derive(Debug, Clone)]
pub struct DerivativeScratch {
    pub dpdx: Array2<f64>,
    pub dpdz: Array2<f64>,
    pub dvxdx: Array2<f64>,
    pub dvzdz: Array2<f64>,
}

impl DerivativeScratch {
    fn zeros(nz: usize, nx: usize) -> DerivativeScratch {
        DerivativeScratch {
            dpdx: Array2::zeros((nz, nx)),
            dpdz: Array2::zeros((nz, nx)),
            dvxdx: Array2::zeros((nz, nx)),
            dvzdz: Array2::zeros((nz, nx)),
        }
    }
}

/// One propagating wavefield's full state.
#[derive(Debug, Clone)]
pub struct WavefieldState {
    pub fields: PVelocity,
    pub memory: PmlMemory,
    pub scratch: DerivativeScratch,
}

impl WavefieldState {
    pub fn zeros(grid: &Grid) -> WavefieldState {
        let (nz, nx) = (grid.nz(), grid.nx());
        WavefieldState {
            fields: PVelocity::zeros(nz, nx),
            memory: PmlMemory::zeros(nz, nx),
            scratch: DerivativeScratch::zeros(nz, nx),
        }
    }

    /// Zeroes every array in place, reusing the allocation for the next
    /// supersource assigned to this worker.
    pub fn reset(&mut self) {
        self.fields.reset();
        self.memory.reset();
    }
}
