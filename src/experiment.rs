//! The external surface (spec.md §6): `build`, `run`, and the output
//! accessors, plus an opaque checkpoint type (SPEC_FULL.md §4.13).

use crate::ageom::{AcquisitionGeometry, RecordField, Supersource};
use crate::boundary::{BackpropMode, BoundaryStore};
use crate::born;
use crate::coupling::{bilinear_weights, BilinearWeights};
use crate::errors::*;
use crate::gradient::GradientAccumulator;
use crate::grid::Grid;
use crate::illumination::Illumination;
use crate::medium::{Medium, Perturbation};
use crate::options::Options;
use crate::pml::PmlProfiles;
use crate::scheduler;
use crate::stability::{self, FrequencyBand, VelocityBounds};
use crate::stepper;
use crate::wavefield::{PVelocity, PmlMemory, WavefieldState};
use log::info;
use ndarray::Array2;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

/// One receiver's recording over the full run.
#[derive(Debug, Clone)]
pub struct Trace {
    pub field: RecordField,
    pub samples: Vec<f64>,
}

/// A periodic full-wavefield snapshot (only populated when `snaps_flag`).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step: usize,
    pub p: Array2<f64>,
}

/// Everything one supersource's pass produces.
#[derive(Debug, Clone)]
struct SupersourceOutput {
    traces: Vec<Trace>,
    gradient: Option<GradientAccumulator>,
    illumination: Option<Illumination>,
    snapshots: Vec<Snapshot>,
}

/// Accumulated outputs of a full `Experiment::run`.
#[derive(Debug, Clone)]
pub struct ExperimentOutput {
    /// Per-supersource recorded traces, in geometry order.
    pub records: Vec<Vec<Trace>>,
    pub snapshots: Vec<Vec<Snapshot>>,
    gradient: Option<GradientAccumulator>,
    illumination: Option<Illumination>,
}

impl ExperimentOutput {
    /// The bulk-modulus and density gradients, pulled back onto the
    /// pressure-node grid. `None` if no supersource requested a gradient.
    pub fn gradient(&self) -> Option<(Array2<f64>, Array2<f64>)> {
        self.gradient.as_ref().map(|g| g.pulled_back())
    }

    /// The accumulated source illumination. `None` unless `illum_flag` was set.
    pub fn illumination(&self) -> Option<&Array2<f64>> {
        self.illumination.as_ref().map(|i| &i.energy)
    }
}

/// A resolved, validated acoustic FDTD experiment ready to run.
pub struct Experiment {
    grid: Grid,
    medium: Medium,
    perturbation: Option<Perturbation>,
    pml: PmlProfiles,
    geometry: AcquisitionGeometry,
    options: Options,
    dt: f64,
    nt: usize,
    pool: ThreadPool,
}

/// Everything `build` needs beyond the medium itself: the quantities the
/// stability check and PML construction require but medium-gallery
/// construction (out of scope here) would otherwise derive automatically.
#[derive(Debug, Clone, Copy)]
pub struct BuildParameters {
    pub bounds: VelocityBounds,
    pub band: FrequencyBand,
    pub fpeak: f64,
    pub dt: f64,
    pub nt: usize,
}

/// Validates every input and constructs an `Experiment`, failing fast with
/// a `ConfigError`/`StabilityError`/`ResourceError` rather than partway
/// through a run (spec.md §6, §7).
pub fn build(
    grid: Grid,
    medium: Medium,
    perturbation: Option<Perturbation>,
    geometry: AcquisitionGeometry,
    options: Options,
    params: BuildParameters,
) -> Result<Experiment> {
    options.validate()?;
    geometry.validate(params.nt)?;
    stability::check(params.bounds, grid.dz, grid.dx, params.dt, params.band)?;

    let pml = PmlProfiles::build(&grid, &options.abs_trbl, params.bounds.vpmax, params.fpeak, params.dt);
    let pool = scheduler::build_pool(options.nworker)?;

    info!(
        "built experiment: grid {}x{} (npml={}), {} supersources, npw={}",
        grid.nz(),
        grid.nx(),
        grid.npml,
        geometry.supersources.len(),
        options.npw
    );

    Ok(Experiment {
        grid,
        medium,
        perturbation,
        pml,
        geometry,
        options,
        dt: params.dt,
        nt: params.nt,
        pool,
    })
}

impl Experiment {
    /// Runs every supersource, dispatched across the worker pool, and folds
    /// their gradient/illumination contributions together. Supersources are
    /// fully independent (spec.md §5): failure in one does not poison the
    /// results of the others that already completed, but the first error
    /// encountered is the one returned.
    pub fn run(&self) -> Result<ExperimentOutput> {
        let results: Result<Vec<SupersourceOutput>> = self
            .pool
            .install(|| self.geometry.supersources.par_iter().map(|ss| self.run_supersource(ss)).collect());
        let results = results?;

        // Records/snapshots stay indexed by supersource (order-preserving),
        // so they're collected directly; gradient/illumination only need
        // commutative addition across supersources, so they go through the
        // general-purpose reduction dispatcher.
        let gradient = scheduler::dispatch(&self.pool, &results, || None, |out| out.gradient.clone(), merge_gradient);
        let illumination =
            scheduler::dispatch(&self.pool, &results, || None, |out| out.illumination.clone(), merge_illumination);

        let mut records = Vec::with_capacity(results.len());
        let mut snapshots = Vec::with_capacity(results.len());
        for out in results {
            records.push(out.traces);
            snapshots.push(out.snapshots);
        }

        Ok(ExperimentOutput {
            records,
            snapshots,
            gradient,
            illumination,
        })
    }

    fn run_supersource(&self, ss: &Supersource) -> Result<SupersourceOutput> {
        let backprop_mode = BackpropMode::from_flag(self.options.backprop_flag);
        if ss.wants_gradient() && backprop_mode == BackpropMode::Disabled {
            bail!(ErrorKind::ConfigError(
                "supersource carries adjoint wavelets but backprop_flag disables the boundary store"
                    .to_string()
            ));
        }

        let source_weights = weights_for(&self.grid, ss.sources.iter().map(|p| (p.z, p.x)))?;
        let receiver_weights = weights_for(&self.grid, ss.receivers.iter().map(|p| (p.z, p.x)))?;

        let mut primary = WavefieldState::zeros(&self.grid);
        let mut secondary = if self.options.npw == 2 {
            Some(WavefieldState::zeros(&self.grid))
        } else {
            None
        };

        let mut boundary = BoundaryStore::new(&self.grid, self.nt, backprop_mode);
        let mut traces: Vec<Trace> = ss
            .record_fields
            .iter()
            .map(|&field| Trace {
                field,
                samples: Vec::with_capacity(self.nt),
            })
            .collect();
        let mut illumination = self.options.illum_flag.then(|| Illumination::zeros(self.grid.nz(), self.grid.nx()));
        let mut snapshots = Vec::new();

        for it in 0..self.nt {
            for (w, wavelet) in source_weights.iter().zip(ss.wavelets.iter()) {
                w.spray_into(&mut primary.fields.p, wavelet[it]);
            }

            if let (Some(secondary), Some(perturbation)) = (secondary.as_mut(), self.perturbation.as_ref()) {
                born::inject_secondary_source(&primary, secondary, perturbation, self.dt, self.options.gmodel_flag);
            }

            stepper::advance(self.options.attrib_mod, &mut primary, &self.medium, &self.pml, self.dt, self.grid.dz, self.grid.dx)?;
            if let Some(secondary) = secondary.as_mut() {
                stepper::advance(
                    self.options.attrib_mod,
                    secondary,
                    &self.medium,
                    &self.pml,
                    self.dt,
                    self.grid.dz,
                    self.grid.dx,
                )?;
            }

            boundary.save_step(&self.grid, &primary.fields.p, &primary.fields.vx, &primary.fields.vz, it);

            let recorded = if secondary.is_some() { secondary.as_ref().unwrap() } else { &primary };
            for (trace, w) in traces.iter_mut().zip(receiver_weights.iter()) {
                let field = match trace.field {
                    RecordField::Pressure => &recorded.fields.p,
                    RecordField::Vx => &recorded.fields.vx,
                    RecordField::Vz => &recorded.fields.vz,
                };
                trace.samples.push(w.interpolate(field));
            }

            if let Some(illum) = illumination.as_mut() {
                illum.accumulate(&primary.fields.p);
            }

            if self.options.snaps_flag && it % self.options.tsnaps == 0 {
                snapshots.push(Snapshot {
                    step: it,
                    p: primary.fields.p.clone(),
                });
            }
        }
        boundary.save_final(&primary.fields.p, &primary.fields.vx, &primary.fields.vz);

        let gradient = if ss.wants_gradient() {
            Some(self.run_adjoint(ss, &boundary, &receiver_weights)?)
        } else {
            None
        };

        Ok(SupersourceOutput {
            traces,
            gradient,
            illumination,
            snapshots,
        })
    }

    /// Reconstructs the forward wavefield backward from `boundary`'s final
    /// snapshot (correcting PML drift with the saved halo at every step)
    /// while stepping a receiver-driven adjoint wavefield forward through
    /// the same reversed time axis, correlating the two at each step
    /// (spec.md §4.6, §4.7).
    fn run_adjoint(&self, ss: &Supersource, boundary: &BoundaryStore, receiver_weights: &[BilinearWeights]) -> Result<GradientAccumulator> {
        let (p0, vx0, vz0) = boundary.final_snapshot();
        let mut reconstructed = WavefieldState::zeros(&self.grid);
        reconstructed.fields.p.assign(&p0);
        reconstructed.fields.vx.assign(&vx0);
        reconstructed.fields.vz.assign(&vz0);

        let mut adjoint = WavefieldState::zeros(&self.grid);
        let mut gradient = GradientAccumulator::zeros(self.grid.nz(), self.grid.nx());
        let cell_area = self.grid.dz * self.grid.dx;

        for it in (0..self.nt).rev() {
            for (w, wavelet) in receiver_weights.iter().zip(ss.adjoint_wavelets.iter()) {
                w.spray_into(&mut adjoint.fields.p, wavelet[it]);
            }
            stepper::advance(self.options.attrib_mod, &mut adjoint, &self.medium, &self.pml, self.dt, self.grid.dz, self.grid.dx)?;

            gradient.accumulate(
                &reconstructed.fields.p,
                &reconstructed.fields.vx,
                &reconstructed.fields.vz,
                &adjoint.fields.p,
                &adjoint.fields.vx,
                &adjoint.fields.vz,
                cell_area,
            );

            if it > 0 {
                stepper::reverse(
                    self.options.attrib_mod,
                    &mut reconstructed,
                    &self.medium,
                    &self.pml,
                    self.dt,
                    self.grid.dz,
                    self.grid.dx,
                )?;
                boundary.replay_step(
                    &self.grid,
                    &mut reconstructed.fields.p,
                    &mut reconstructed.fields.vx,
                    &mut reconstructed.fields.vz,
                    it - 1,
                );
            }
        }

        Ok(gradient)
    }
}

fn weights_for(grid: &Grid, points: impl Iterator<Item = (f64, f64)>) -> Result<Vec<BilinearWeights>> {
    points.map(|(z, x)| bilinear_weights(grid, z, x)).collect()
}

fn merge_gradient(a: Option<GradientAccumulator>, b: Option<GradientAccumulator>) -> Option<GradientAccumulator> {
    match (a, b) {
        (Some(mut x), Some(y)) => {
            x.add_assign(&y);
            Some(x)
        }
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn merge_illumination(a: Option<Illumination>, b: Option<Illumination>) -> Option<Illumination> {
    match (a, b) {
        (Some(mut x), Some(y)) => {
            x.add_assign(&y);
            Some(x)
        }
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Opaque, serializable snapshot of one worker's propagating state, meant
/// to be (de)serialized with whatever format the caller prefers (serde_json,
/// bincode, ...); this crate commits to the schema, not the wire format
/// (SPEC_FULL.md §4.13).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub grid: Grid,
    pub supersource_index: usize,
    pub step: usize,
    pub fields: PVelocity,
    pub memory: PmlMemory,
}

impl Checkpoint {
    pub fn capture(grid: &Grid, supersource_index: usize, step: usize, state: &WavefieldState) -> Checkpoint {
        Checkpoint {
            grid: *grid,
            supersource_index,
            step,
            fields: state.fields.clone(),
            memory: state.memory.clone(),
        }
    }

    /// Restores a worker's wavefield state from this checkpoint. The
    /// caller is responsible for resuming the time loop at `self.step`.
    pub fn restore_into(&self, state: &mut WavefieldState) {
        state.fields = self.fields.clone();
        state.memory = self.memory.clone();
    }
}
