//! Error taxonomy for the FDTD core.
//!
//! Everything that can go wrong with a `build()` call (bad shapes, an
//! unstable scheme, an exhausted worker pool) is surfaced through the
//! `error_chain!`-generated `Error`/`ErrorKind`/`Result` types, the same way
//! the reference simulation driver reports configuration and I/O failures.

error_chain! {
    errors {
        /// Shape/size mismatch, out-of-domain coordinate, or an option
        /// combination that cannot be honored.
        ConfigError(msg: String) {
            description("invalid configuration")
            display("configuration error: {}", msg)
        }
        /// Courant or dispersion admissibility check failed.
        StabilityError(msg: String) {
            description("scheme is not stable for the given inputs")
            display("stability error: {}", msg)
        }
        /// A non-finite value was detected in wavefield state.
        NumericError(msg: String) {
            description("non-finite value in wavefield state")
            display("numeric error: {}", msg)
        }
        /// The worker pool could not be built or sized.
        ResourceError(msg: String) {
            description("worker pool unavailable")
            display("resource error: {}", msg)
        }
    }
}
