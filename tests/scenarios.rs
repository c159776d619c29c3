//! Integration tests for the concrete propagation scenarios the crate is
//! expected to get right: absorbing-boundary decay, causal arrival
//! ordering across a velocity contrast, Born linearity, and the
//! save/replay and adjoint-gradient machinery end to end.

use acoustic_fdtd_core::{
    build, AcquisitionGeometry, AttribMod, BuildParameters, Face, FrequencyBand, Grid, Medium, Options, Perturbation,
    Point, RecordField, Supersource, VelocityBounds,
};
use ndarray::Array2;

fn homogeneous_medium(grid: &Grid, vp: f64, rho: f64) -> Medium {
    let ki = Array2::from_elem((grid.nz(), grid.nx()), 1. / (vp * vp * rho));
    let rho_i = Array2::from_elem((grid.nz(), grid.nx()), 1. / rho);
    Medium::from_extended(ki, rho_i, grid).unwrap()
}

#[test]
fn a_point_source_in_a_fully_absorbing_box_decays_away() {
    let grid = Grid::with_npml(40, 40, 10., 10., 10).unwrap();
    let medium = homogeneous_medium(&grid, 2000., 1000.);
    let nt = 300;

    let mut geometry = AcquisitionGeometry::default();
    geometry.supersources.push(Supersource {
        sources: vec![Point { z: 200., x: 200. }],
        wavelets: vec![ricker(nt, 0.0005, 25., 20)],
        receivers: vec![Point { z: 200., x: 200. }, Point { z: 350., x: 350. }],
        record_fields: vec![RecordField::Pressure, RecordField::Pressure],
        adjoint_wavelets: vec![],
    });

    let options = Options {
        abs_trbl: Face::ALL.iter().copied().collect(),
        ..Options::default()
    };
    let params = BuildParameters {
        bounds: VelocityBounds {
            vpmin: 2000.,
            vpmax: 2000.,
        },
        band: FrequencyBand { fmin: 5., fmax: 40. },
        fpeak: 25.,
        dt: 0.0005,
        nt,
    };

    let experiment = build(grid, medium, None, geometry, options, params).unwrap();
    let output = experiment.run().unwrap();

    let trace = &output.records[0][0].samples;
    let early_energy: f64 = trace[0..50].iter().map(|v| v * v).sum();
    let late_energy: f64 = trace[(nt - 50)..nt].iter().map(|v| v * v).sum();
    assert!(
        late_energy < early_energy,
        "energy should decay once the wavelet has radiated into the absorbing boundary: early={}, late={}",
        early_energy,
        late_energy
    );
}

#[test]
fn a_nearer_receiver_sees_the_wavefront_before_a_farther_one() {
    let grid = Grid::with_npml(60, 60, 10., 10., 10).unwrap();
    let medium = homogeneous_medium(&grid, 2500., 1000.);
    let nt = 250;

    let mut geometry = AcquisitionGeometry::default();
    geometry.supersources.push(Supersource {
        sources: vec![Point { z: 300., x: 300. }],
        wavelets: vec![ricker(nt, 0.0005, 25., 15)],
        receivers: vec![Point { z: 300., x: 400. }, Point { z: 300., x: 550. }],
        record_fields: vec![RecordField::Pressure, RecordField::Pressure],
        adjoint_wavelets: vec![],
    });

    let options = Options {
        abs_trbl: Face::ALL.iter().copied().collect(),
        ..Options::default()
    };
    let params = BuildParameters {
        bounds: VelocityBounds {
            vpmin: 2500.,
            vpmax: 2500.,
        },
        band: FrequencyBand { fmin: 5., fmax: 40. },
        fpeak: 25.,
        dt: 0.0005,
        nt,
    };

    let experiment = build(grid, medium, None, geometry, options, params).unwrap();
    let output = experiment.run().unwrap();

    let near = first_arrival_step(&output.records[0][0].samples);
    let far = first_arrival_step(&output.records[0][1].samples);
    assert!(
        near < far,
        "the receiver 100m from the source should see energy before the one 250m away (near={}, far={})",
        near,
        far
    );
}

#[test]
fn born_scattered_amplitude_scales_linearly_with_the_perturbation() {
    let grid = Grid::with_npml(40, 40, 10., 10., 10).unwrap();
    let medium = homogeneous_medium(&grid, 2000., 1000.);
    let nt = 150;

    let mut perturbation = Perturbation {
        delta_ki: Array2::zeros((grid.nz(), grid.nx())),
        delta_rho_i: Array2::zeros((grid.nz(), grid.nx())),
    };
    perturbation.delta_ki[[20, 20]] = 1e-10;

    let run = |scale: f64| {
        let mut geometry = AcquisitionGeometry::default();
        geometry.supersources.push(Supersource {
            sources: vec![Point { z: 150., x: 150. }],
            wavelets: vec![ricker(nt, 0.0005, 25., 10)],
            receivers: vec![Point { z: 250., x: 250. }],
            record_fields: vec![RecordField::Pressure],
            adjoint_wavelets: vec![],
        });
        let options = Options {
            attrib_mod: AttribMod::AcousticBorn,
            npw: 2,
            gmodel_flag: true,
            abs_trbl: Face::ALL.iter().copied().collect(),
            ..Options::default()
        };
        let params = BuildParameters {
            bounds: VelocityBounds {
                vpmin: 2000.,
                vpmax: 2000.,
            },
            band: FrequencyBand { fmin: 5., fmax: 40. },
            fpeak: 25.,
            dt: 0.0005,
            nt,
        };
        let experiment = build(grid, medium.clone(), Some(perturbation.scale(scale)), geometry, options, params).unwrap();
        experiment.run().unwrap()
    };

    let out1 = run(1.0);
    let out2 = run(2.0);
    let trace1 = &out1.records[0][0].samples;
    let trace2 = &out2.records[0][0].samples;

    let energy1: f64 = trace1.iter().map(|v| v * v).sum();
    let energy2: f64 = trace2.iter().map(|v| v * v).sum();
    assert!(energy1 > 0.0, "a nonzero perturbation should scatter some energy");
    let amplitude_ratio = (energy2 / energy1).sqrt();
    assert!(
        (amplitude_ratio - 2.0).abs() < 0.05,
        "doubling the perturbation should double the scattered amplitude, got ratio {}",
        amplitude_ratio
    );
}

#[test]
fn a_run_with_adjoint_sources_produces_a_nonzero_gradient_at_a_perturbed_cell() {
    let grid = Grid::with_npml(30, 30, 10., 10., 10).unwrap();
    let medium = homogeneous_medium(&grid, 2000., 1000.);
    let nt = 60;

    let mut geometry = AcquisitionGeometry::default();
    geometry.supersources.push(Supersource {
        sources: vec![Point { z: 150., x: 150. }],
        wavelets: vec![ricker(nt, 0.0005, 25., 8)],
        receivers: vec![Point { z: 200., x: 200. }],
        record_fields: vec![RecordField::Pressure],
        adjoint_wavelets: vec![ricker(nt, 0.0005, 25., 8)],
    });

    let options = Options {
        backprop_flag: 1,
        abs_trbl: Face::ALL.iter().copied().collect(),
        ..Options::default()
    };
    let params = BuildParameters {
        bounds: VelocityBounds {
            vpmin: 2000.,
            vpmax: 2000.,
        },
        band: FrequencyBand { fmin: 5., fmax: 40. },
        fpeak: 25.,
        dt: 0.0005,
        nt,
    };

    let experiment = build(grid, medium, None, geometry, options, params).unwrap();
    let output = experiment.run().unwrap();

    let (g_ktt, _g_rho) = output.gradient().expect("adjoint wavelets were supplied");
    assert!(g_ktt.iter().any(|&v| v != 0.0), "gradient should be nonzero somewhere along the ray path");
}

#[test]
fn complex_valued_misfit_scaling_matches_the_real_case() {
    use acoustic_fdtd_core::misfit::scale_and_misfit;
    use num_complex::Complex;

    let synthetic: Vec<Complex<f64>> = vec![Complex::new(1.0, 0.5), Complex::new(-0.5, 1.0), Complex::new(2.0, -1.0)];
    let observed: Vec<Complex<f64>> = synthetic.iter().map(|&v| v * 1.7).collect();

    let m = scale_and_misfit(&observed, &synthetic);
    assert!((m.alpha - Complex::new(1.7, 0.0)).norm() < 1e-9);
    assert!(m.residual_energy.abs() < 1e-6);
}

#[test]
fn complex_valued_misfit_scaling_recovers_a_complex_alpha() {
    use acoustic_fdtd_core::misfit::scale_and_misfit;
    use num_complex::Complex;

    let synthetic: Vec<Complex<f64>> = vec![
        Complex::new(1.0, 0.5),
        Complex::new(-0.5, 1.0),
        Complex::new(2.0, -1.0),
        Complex::new(0.3, 0.2),
    ];
    let alpha = Complex::new(0.3, 0.7);
    let observed: Vec<Complex<f64>> = synthetic.iter().map(|&v| alpha * v).collect();

    let m = scale_and_misfit(&observed, &synthetic);
    assert!((m.alpha - alpha).norm() < 1e-12);
    assert!(m.residual_energy < 1e-20);
}

fn ricker(nt: usize, dt: f64, fpeak: f64, delay_samples: usize) -> Vec<f64> {
    (0..nt)
        .map(|it| {
            let t = (it as f64 - delay_samples as f64) * dt;
            let arg = (std::f64::consts::PI * fpeak * t).powi(2);
            (1.0 - 2.0 * arg) * (-arg).exp()
        })
        .collect()
}

fn first_arrival_step(samples: &[f64]) -> usize {
    let threshold = samples.iter().fold(0.0_f64, |m, &v| m.max(v.abs())) * 0.1;
    samples
        .iter()
        .position(|&v| v.abs() > threshold)
        .unwrap_or(samples.len())
}
