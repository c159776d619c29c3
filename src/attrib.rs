//! The closed set of modeling variants the stepper can execute
//! (spec.md §6, §9 design note: a tagged sum type, dispatched once per
//! time step rather than per cell).

/// Which physics the FDTD stepper advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttribMod {
    /// Plain acoustic wave equation.
    Acoustic,
    /// Acoustic with a Born-linearized secondary wavefield (requires `npw == 2`).
    AcousticBorn,
    /// Viscoacoustic memory-variable mechanics.
    ///
    /// Stub: `wavefield` carries the storage a relaxation-mechanism update
    /// would need, but `stepper::advance` refuses to step it — the update
    /// equations are a separate specification pass (spec.md §9 Open
    /// Question).
    AcousticVisco,
}
