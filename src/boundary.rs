//! Time-reversal boundary storage and replay (spec.md §4.6).
//!
//! During a forward run with `backprop_flag = +1`, a thin halo wrapping the
//! physical domain is saved every step so the adjoint pass can later replay
//! the forward wavefield at those same cells, instead of storing the full
//! (lossy, PML-extended) mesh at every step. `backprop_flag = -1` selects
//! replay; `0` disables the mechanism entirely. The halo sits just inside
//! the physical/PML interface rather than deep in the absorbing layer: the
//! PML is dissipative and not exactly invertible, so the reconstructed
//! interior can only be exact if the replayed values reach it before any
//! step has passed through the PML.

use crate::grid::Grid;
use ndarray::{Array2, Array3};

/// Width of the saved/replayed halo strip, in cells.
pub const HALO: usize = 3;

/// Selects whether `BoundaryStore` is inert, saving, or replaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpropMode {
    Disabled,
    Save,
    Replay,
}

impl BackpropMode {
    pub fn from_flag(flag: i32) -> BackpropMode {
        match flag {
            0 => BackpropMode::Disabled,
            f if f > 0 => BackpropMode::Save,
            _ => BackpropMode::Replay,
        }
    }
}

/// The four-strip halo of a single field, wrapping the physical domain at
/// `grid.pad()..grid.pad()+HALO` inward from each face. `top`/`bottom` run
/// the full padded width `nxd + 2*HALO` so the corners are covered by both
/// the horizontal and vertical strips; `left`/`right` run the full padded
/// height `nzd + 2*HALO` for the same reason.
#[derive(Debug, Clone)]
struct FieldStrip {
    /// `(HALO, nxd + 2*HALO, nt)`
    top: Array3<f64>,
    bottom: Array3<f64>,
    /// `(nzd + 2*HALO, HALO, nt)`
    left: Array3<f64>,
    right: Array3<f64>,
}

impl FieldStrip {
    fn empty() -> FieldStrip {
        FieldStrip {
            top: Array3::zeros((0, 0, 0)),
            bottom: Array3::zeros((0, 0, 0)),
            left: Array3::zeros((0, 0, 0)),
            right: Array3::zeros((0, 0, 0)),
        }
    }

    fn zeros(grid: &Grid, nt: usize) -> FieldStrip {
        let width = grid.nxd + 2 * HALO;
        let height = grid.nzd + 2 * HALO;
        FieldStrip {
            top: Array3::zeros((HALO, width, nt)),
            bottom: Array3::zeros((HALO, width, nt)),
            left: Array3::zeros((height, HALO, nt)),
            right: Array3::zeros((height, HALO, nt)),
        }
    }

    /// Saves this field's halo at time step `it`. `pad` is the physical/PML
    /// interface offset (`grid.pad()`); the strips sit at
    /// `pad..pad+HALO` (top/left) and mirror at `pad+nxd/nzd-HALO..` on the
    /// far side, extending `HALO` cells into the PML on the perpendicular
    /// axis to cover the corners.
    fn save(&mut self, field: &Array2<f64>, grid: &Grid, it: usize) {
        let pad = grid.pad();
        let (col_lo, col_hi) = (pad - HALO, pad + grid.nxd + HALO);
        let (row_lo, row_hi) = (pad - HALO, pad + grid.nzd + HALO);

        for h in 0..HALO {
            for (j, ix) in (col_lo..col_hi).enumerate() {
                self.top[[h, j, it]] = field[[pad + h, ix]];
                self.bottom[[h, j, it]] = field[[pad + grid.nzd - 1 - h, ix]];
            }
        }
        for (j, iz) in (row_lo..row_hi).enumerate() {
            for h in 0..HALO {
                self.left[[j, h, it]] = field[[iz, pad + h]];
                self.right[[j, h, it]] = field[[iz, pad + grid.nxd - 1 - h]];
            }
        }
    }

    /// Overwrites this field's halo with the values saved at time step `it`.
    fn replay(&self, field: &mut Array2<f64>, grid: &Grid, it: usize) {
        let pad = grid.pad();
        let (col_lo, col_hi) = (pad - HALO, pad + grid.nxd + HALO);
        let (row_lo, row_hi) = (pad - HALO, pad + grid.nzd + HALO);

        for h in 0..HALO {
            for (j, ix) in (col_lo..col_hi).enumerate() {
                field[[pad + h, ix]] = self.top[[h, j, it]];
                field[[pad + grid.nzd - 1 - h, ix]] = self.bottom[[h, j, it]];
            }
        }
        for (j, iz) in (row_lo..row_hi).enumerate() {
            for h in 0..HALO {
                field[[iz, pad + h]] = self.left[[j, h, it]];
                field[[iz, pad + grid.nxd - 1 - h]] = self.right[[j, h, it]];
            }
        }
    }
}

/// Saved halo strips of `p`, `vx`, `vz`, plus the final full-domain
/// snapshot, indexed by time step. Allocated once per worker for `nt`
/// steps and reused across supersources (the strip shapes depend only on
/// the grid and `nt`).
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    mode: BackpropMode,
    p: FieldStrip,
    vx: FieldStrip,
    vz: FieldStrip,
    /// Full extended-mesh snapshot at the last step, the replay seed.
    final_snapshot: Array3<f64>,
}

impl BoundaryStore {
    /// `mode` only gates allocation: `Disabled` keeps the store
    /// zero-sized. A single `Save`/`Replay`-mode store is meant to be
    /// filled by `save_step` during a supersource's forward pass and then
    /// drained by `replay_step` during that same supersource's immediately
    /// following adjoint pass, so both methods operate unconditionally
    /// once the store is allocated.
    pub fn new(grid: &Grid, nt: usize, mode: BackpropMode) -> BoundaryStore {
        if mode == BackpropMode::Disabled {
            return BoundaryStore {
                mode,
                p: FieldStrip::empty(),
                vx: FieldStrip::empty(),
                vz: FieldStrip::empty(),
                final_snapshot: Array3::zeros((0, 0, 0)),
            };
        }
        BoundaryStore {
            mode,
            p: FieldStrip::zeros(grid, nt),
            vx: FieldStrip::zeros(grid, nt),
            vz: FieldStrip::zeros(grid, nt),
            final_snapshot: Array3::zeros((grid.nz(), grid.nx(), 3)),
        }
    }

    pub fn mode(&self) -> BackpropMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != BackpropMode::Disabled
    }

    /// Saves the halos of `p`, `vx`, `vz` at time step `it` (forward,
    /// saving pass).
    pub fn save_step(&mut self, grid: &Grid, p: &Array2<f64>, vx: &Array2<f64>, vz: &Array2<f64>, it: usize) {
        if !self.is_enabled() {
            return;
        }
        self.p.save(p, grid, it);
        self.vx.save(vx, grid, it);
        self.vz.save(vz, grid, it);
    }

    /// Saves the full-domain snapshot at the final step, the replay seed.
    pub fn save_final(&mut self, p: &Array2<f64>, vx: &Array2<f64>, vz: &Array2<f64>) {
        if !self.is_enabled() {
            return;
        }
        self.final_snapshot.index_axis_mut(ndarray::Axis(2), 0).assign(p);
        self.final_snapshot.index_axis_mut(ndarray::Axis(2), 1).assign(vx);
        self.final_snapshot.index_axis_mut(ndarray::Axis(2), 2).assign(vz);
    }

    /// Overwrites `p`, `vx`, `vz`'s halos with the values saved at time
    /// step `it` (replay pass, run in reverse time order from the caller).
    pub fn replay_step(&self, grid: &Grid, p: &mut Array2<f64>, vx: &mut Array2<f64>, vz: &mut Array2<f64>, it: usize) {
        if !self.is_enabled() {
            return;
        }
        self.p.replay(p, grid, it);
        self.vx.replay(vx, grid, it);
        self.vz.replay(vz, grid, it);
    }

    /// The final-step snapshot, used to seed the adjoint run's initial state.
    pub fn final_snapshot(&self) -> (ndarray::ArrayView2<f64>, ndarray::ArrayView2<f64>, ndarray::ArrayView2<f64>) {
        (
            self.final_snapshot.index_axis(ndarray::Axis(2), 0),
            self.final_snapshot.index_axis(ndarray::Axis(2), 1),
            self.final_snapshot.index_axis(ndarray::Axis(2), 2),
        )
    }
}
