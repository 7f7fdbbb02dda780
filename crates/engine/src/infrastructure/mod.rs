//! Infrastructure implementations.
//!
//! Contains port trait implementations for the in-memory host used by the
//! simulator and tests.

pub mod battlefield;
pub mod checks;
pub mod decision;
pub mod effects;
pub mod ports;
pub mod random;
pub mod settings;
pub mod usage;
