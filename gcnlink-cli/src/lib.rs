//! Support library for the `gcnlink` binary.
//!
//! Exposes the command pipeline and logging bootstrap so doctests and unit
//! tests can drive training without spawning a subprocess.

pub mod cli;
pub mod logging;
